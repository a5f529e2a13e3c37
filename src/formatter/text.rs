use std::io::Write;

use crate::formatter::Formatter;
use crate::program::Program;

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_to(&self, program: &Program, out: &mut dyn Write) {
        for (pattern, captures) in program.captures() {
            let _ = writeln!(out, "{pattern}");
            for capture in captures {
                let _ = writeln!(out, "  {}: {}", capture.input, capture.record);
            }
        }

        let input_count = program.input_count();
        let match_count = program.match_count();
        let input_word = if input_count == 1 { "input" } else { "inputs" };
        let match_word = if match_count == 1 { "match" } else { "matches" };
        let _ = writeln!(
            out,
            "\n{input_count} {input_word} processed, {match_count} {match_word} captured",
        );
        let failures = program.dispatch_errors().len();
        if failures > 0 {
            let _ = writeln!(out, "{failures} action(s) failed");
        }
    }
}
