//! Line sources consumed by a [`Program`](super::Program).

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

/// A forward-only sequence of lines with a name.
pub trait InputSource {
    fn identifier(&self) -> &str;

    /// The next line without its line terminator, or `None` at end of input.
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// Read one line, dropping a trailing `\n` or `\r\n`. Invalid UTF-8 is
/// replaced rather than rejected.
fn read_line(reader: &mut impl BufRead, buf: &mut Vec<u8>) -> io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

/// Lines from any buffered reader: files, in-memory text, stdin.
pub struct ReaderInput<R: BufRead> {
    identifier: String,
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> ReaderInput<R> {
    pub fn new(identifier: impl Into<String>, reader: R) -> Self {
        Self {
            identifier: identifier.into(),
            reader,
            buf: Vec::new(),
        }
    }
}

impl ReaderInput<Cursor<Vec<u8>>> {
    pub fn from_text(identifier: impl Into<String>, text: &str) -> Self {
        Self::new(identifier, Cursor::new(text.as_bytes().to_vec()))
    }
}

impl ReaderInput<BufReader<File>> {
    /// Open a file; its path is the identifier.
    pub fn open_file(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }
}

impl<R: BufRead> InputSource for ReaderInput<R> {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        read_line(&mut self.reader, &mut self.buf)
    }
}

/// Program and arguments that run a command line through the system shell.
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

pub fn shell_command(command: &str) -> CommandSpec {
    CommandSpec {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), command.to_string()],
    }
}

/// Standard output of a shell command, read as it is produced. The command
/// line is the identifier.
pub struct ProcessInput {
    command: String,
    child: Child,
    stdout: BufReader<ChildStdout>,
    buf: Vec<u8>,
    reaped: bool,
}

impl ProcessInput {
    pub fn spawn(command: &str) -> io::Result<Self> {
        let spec = shell_command(command);
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
        debug!("spawned `{command}` (pid {})", child.id());
        Ok(Self {
            command: command.to_string(),
            child,
            stdout: BufReader::new(stdout),
            buf: Vec::new(),
            reaped: false,
        })
    }
}

impl InputSource for ProcessInput {
    fn identifier(&self) -> &str {
        &self.command
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        let line = read_line(&mut self.stdout, &mut self.buf)?;
        if line.is_none() && !self.reaped {
            let status = self.child.wait()?;
            self.reaped = true;
            if !status.success() {
                warn!("input command `{}` exited with {status}", self.command);
            }
        }
        Ok(line)
    }
}

impl Drop for ProcessInput {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut dyn InputSource) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn text_lines_lose_terminators() {
        let mut input = ReaderInput::from_text("mem", "a\r\nb\n\nc");
        assert_eq!(input.identifier(), "mem");
        assert_eq!(drain(&mut input), vec!["a", "b", "", "c"]);
        assert_eq!(input.next_line().unwrap(), None);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut input = ReaderInput::new("bytes", Cursor::new(b"ok\n\xffbad\n".to_vec()));
        assert_eq!(drain(&mut input), vec!["ok", "\u{fffd}bad"]);
    }

    #[test]
    fn file_input_uses_path_as_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.log");
        std::fs::write(&path, "one\ntwo\n").unwrap();
        let mut input = ReaderInput::open_file(&path).unwrap();
        assert_eq!(input.identifier(), path.display().to_string());
        assert_eq!(drain(&mut input), vec!["one", "two"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(ReaderInput::open_file(Path::new("/nonexistent/loggrok.log")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn process_input_reads_stdout() {
        let mut input = ProcessInput::spawn("printf 'hello world\\nbye\\n'").unwrap();
        assert_eq!(input.identifier(), "printf 'hello world\\nbye\\n'");
        assert_eq!(drain(&mut input), vec!["hello world", "bye"]);
    }

    #[cfg(unix)]
    #[test]
    fn dropping_a_running_process_kills_it() {
        let mut input = ProcessInput::spawn("echo first; sleep 30").unwrap();
        assert_eq!(input.next_line().unwrap().as_deref(), Some("first"));
        drop(input);
    }
}
