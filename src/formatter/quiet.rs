use std::io::Write;

use crate::formatter::Formatter;
use crate::program::Program;

/// Prints nothing but failed actions; the actions themselves are the output.
pub struct QuietFormatter;

impl Formatter for QuietFormatter {
    fn format_to(&self, program: &Program, out: &mut dyn Write) {
        for error in program.dispatch_errors() {
            let _ = writeln!(out, "action failed: {error}");
        }
    }
}
