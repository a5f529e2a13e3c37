pub mod json;
pub mod quiet;
pub mod text;

use std::io::Write;

use crate::program::Program;

/// Prints a program's capture ledger once all inputs have run.
pub trait Formatter {
    fn format_to(&self, program: &Program, out: &mut dyn Write);

    fn print(&self, program: &Program) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.format_to(program, &mut lock);
    }
}

pub fn create_formatter(format: &str) -> Box<dyn Formatter> {
    match format {
        "json" => Box::new(json::JsonFormatter),
        "quiet" => Box::new(quiet::QuietFormatter),
        // "text" and any unknown value
        _ => Box::new(text::TextFormatter),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::action::CollectingSink;
    use crate::program::{MatchConfigRecord, ProgramRecord, ReaderInput};
    use crate::testutil;

    /// A program that has run two inputs, one of them without matches.
    pub(crate) fn sample_program() -> Program {
        let record = ProgramRecord {
            name: "jobs".to_string(),
            capture_format: "%{@PATTERNS}".to_string(),
            match_configs: vec![
                MatchConfigRecord::new(["%{COALITION_JOB_EXITCODE}"]).with_no_action(true),
            ],
        };
        let mut program = Program::from_record(&record, &testutil::library()).unwrap();
        let mut sink = CollectingSink::new();
        program
            .add_input(ReaderInput::from_text("a.log", "* EXIT : 0\n* EXIT : 2\n"), &mut sink)
            .unwrap();
        program
            .add_input(ReaderInput::from_text("b.log", "nothing\n"), &mut sink)
            .unwrap();
        program
    }

    pub(crate) fn render(formatter: &dyn Formatter, program: &Program) -> String {
        let mut buf = Vec::new();
        formatter.format_to(program, &mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn create_formatter_by_name() {
        let program = sample_program();
        assert!(render(create_formatter("json").as_ref(), &program).starts_with('{'));
        assert!(render(create_formatter("quiet").as_ref(), &program).is_empty());
        let text = render(create_formatter("text").as_ref(), &program);
        assert_eq!(text, render(create_formatter("anything").as_ref(), &program));
    }
}
