use std::io::{self, Read, Write};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

use super::shell::{self, SplitError};

/// How a rendered action is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Write the action text followed by a newline.
    #[default]
    Stdout,
    /// Execute the action as a command line. The string is the configured
    /// `shell` value, kept verbatim.
    Command(String),
}

impl DispatchMode {
    pub const STDOUT: &'static str = "stdout";

    pub fn from_shell(shell: &str) -> Self {
        if shell == Self::STDOUT {
            DispatchMode::Stdout
        } else {
            DispatchMode::Command(shell.to_string())
        }
    }

    pub fn as_shell(&self) -> &str {
        match self {
            DispatchMode::Stdout => Self::STDOUT,
            DispatchMode::Command(shell) => shell,
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("cannot split action `{action}`: {source}")]
    Split {
        action: String,
        #[source]
        source: SplitError,
    },

    #[error("action is an empty command")]
    EmptyCommand,

    #[error("failed to run `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while dispatching action")]
    Io(#[from] io::Error),
}

/// Receives rendered actions.
pub trait ActionSink {
    fn dispatch(&mut self, action: &str, mode: &DispatchMode) -> Result<(), DispatchError>;
}

/// Prints actions, and the combined output of executed ones, to a writer.
pub struct WriterSink<W: Write> {
    out: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ActionSink for WriterSink<W> {
    fn dispatch(&mut self, action: &str, mode: &DispatchMode) -> Result<(), DispatchError> {
        match mode {
            DispatchMode::Stdout => writeln!(self.out, "{action}")?,
            DispatchMode::Command(_) => {
                let output = run_command(action)?;
                self.out.write_all(&output)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Records actions without delivering them.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub actions: Vec<(String, DispatchMode)>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.actions.iter().map(|(text, _)| text.as_str()).collect()
    }
}

impl ActionSink for CollectingSink {
    fn dispatch(&mut self, action: &str, mode: &DispatchMode) -> Result<(), DispatchError> {
        self.actions.push((action.to_string(), mode.clone()));
        Ok(())
    }
}

/// Split `action` into argv, run it, and return stdout and stderr as they
/// were interleaved. Blocks until the command exits.
pub fn run_command(action: &str) -> Result<Vec<u8>, DispatchError> {
    let argv = shell::split(action).map_err(|source| DispatchError::Split {
        action: action.to_string(),
        source,
    })?;
    let Some((program, args)) = argv.split_first() else {
        return Err(DispatchError::EmptyCommand);
    };

    let (mut reader, writer) = io::pipe()?;
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(writer.try_clone()?)
        .stderr(writer);
    let mut child = command.spawn().map_err(|source| DispatchError::Spawn {
        program: program.clone(),
        source,
    })?;
    // The command still holds the write ends; reading would never see EOF.
    drop(command);

    let mut output = Vec::new();
    reader.read_to_end(&mut output)?;
    let status = child.wait()?;
    if status.success() {
        debug!("`{action}` finished");
    } else {
        warn!("`{action}` exited with {status}");
    }
    Ok(output)
}
