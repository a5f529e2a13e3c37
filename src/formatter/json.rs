use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::formatter::Formatter;
use crate::program::{Capture, InputSummary, Program};

pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonOutput<'a> {
    metadata: Metadata<'a>,
    inputs: &'a [InputSummary],
    captures: &'a BTreeMap<String, Vec<Capture>>,
}

#[derive(Serialize)]
struct Metadata<'a> {
    program: &'a str,
    inputs_processed: usize,
    match_count: usize,
    failed_actions: usize,
}

impl Formatter for JsonFormatter {
    fn format_to(&self, program: &Program, out: &mut dyn Write) {
        let output = JsonOutput {
            metadata: Metadata {
                program: program.name(),
                inputs_processed: program.input_count(),
                match_count: program.match_count(),
                failed_actions: program.dispatch_errors().len(),
            },
            inputs: program.inputs(),
            captures: program.captures(),
        };
        let _ = serde_json::to_writer(&mut *out, &output);
        let _ = writeln!(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::tests::{render, sample_program};

    #[test]
    fn json_output_structure() {
        let out = render(&JsonFormatter, &sample_program());
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(parsed["metadata"]["program"], "jobs");
        assert_eq!(parsed["metadata"]["inputs_processed"], 2);
        assert_eq!(parsed["metadata"]["match_count"], 2);
        assert_eq!(parsed["metadata"]["failed_actions"], 0);

        assert_eq!(parsed["inputs"][0]["identifier"], "a.log");
        assert_eq!(parsed["inputs"][0]["matches"], 2);
        assert_eq!(parsed["inputs"][1]["matches"], 0);
        assert_eq!(parsed["inputs"][1]["state"], "Done");

        let captures = &parsed["captures"]["%{COALITION_JOB_EXITCODE}"];
        assert_eq!(captures.as_array().map(Vec::len), Some(2));
        assert_eq!(captures[1]["input"], "a.log");
        let record: serde_json::Value =
            serde_json::from_str(captures[1]["record"].as_str().unwrap()).unwrap();
        assert_eq!(record["exit_code"], "2");
    }

    #[test]
    fn empty_program_is_valid_json() {
        let program = Program::new("empty", Vec::new()).unwrap();
        let out = render(&JsonFormatter, &program);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["metadata"]["match_count"], 0);
        assert!(parsed["captures"].as_object().unwrap().is_empty());
    }
}
