use crate::grok::{CompiledPattern, Compiler, Library};

/// Site-specific definitions layered over the built-in library in tests.
pub const SITE_PATTERNS: &str = r#"
VERSION (?:\d+(?:\.\d+)+)
REZ_PACKAGE_NAME [a-z][a-z0-9_]*
REZ_PACKAGE %{REZ_PACKAGE_NAME:package_name}-%{VERSION:package_version}
REZ_PACKAGE_VERSION REZ_(?P<package_name>[A-Z0-9]+)_VERSION=%{VERSION:package_version}
COALITION_JOB_WORKER \* WORKER : %{WORD:worker}-%{INT:slot}
COALITION_JOB_DATETIME \* DATE : %{DATE_US:date} %{HOUR:hour}:%{MINUTE:min}
COALITION_JOB_EXITCODE \* EXIT : %{INT:exit_code}
PYTHON_TRACEBACK_ERROR File "%{PATH:traceback_file}", line %{INT:traceback_line}, in %{DATA:traceback_in}$
PYTHON_NAME_ERROR NameError: %{GREEDYDATA:python_error}
"#;

/// Built-in patterns plus [`SITE_PATTERNS`].
pub fn library() -> Library {
    let mut library = Library::builtin();
    library.load(SITE_PATTERNS);
    library
}

pub fn compile(pattern: &str) -> CompiledPattern {
    let library = library();
    Compiler::new(&library)
        .compile(pattern)
        .unwrap_or_else(|e| panic!("failed to compile {pattern:?}: {e}"))
}

/// A capture expected by a fixture annotation.
#[derive(Debug, Clone)]
pub struct ExpectedCapture {
    /// 1-indexed line in the clean fixture.
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// Parse an annotation line: optional indentation, a run of `^` under the
/// captured text, one space, then the capture label.
fn try_parse_annotation(line: &str) -> Option<(usize, usize, String)> {
    let trimmed = line.trim_start();
    let carets = trimmed.bytes().take_while(|&b| b == b'^').count();
    if carets == 0 {
        return None;
    }
    let label = trimmed[carets..].strip_prefix(' ')?.trim_end();
    let valid = label
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
        && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if !valid {
        return None;
    }
    let start = line.len() - trimmed.len();
    Some((start, start + carets, label.to_string()))
}

/// Split fixture text into log lines and the captures annotated under them.
///
/// Annotations follow the line they describe:
///
/// ```text
/// * EXIT : 17
///          ^^ exit_code
/// ```
pub fn parse_fixture(raw: &str) -> (Vec<&str>, Vec<ExpectedCapture>) {
    let mut lines = Vec::new();
    let mut expected = Vec::new();
    for (index, element) in raw.lines().enumerate() {
        match try_parse_annotation(element) {
            Some((start, end, label)) => {
                assert!(
                    !lines.is_empty(),
                    "annotation on fixture line {} precedes any log line",
                    index + 1
                );
                expected.push(ExpectedCapture {
                    line: lines.len(),
                    start,
                    end,
                    label,
                });
            }
            None => lines.push(element),
        }
    }
    (lines, expected)
}

/// Match every annotated line of `fixture` and check each annotated span.
pub fn assert_captures(pattern: &CompiledPattern, fixture: &str) {
    let (lines, expected) = parse_fixture(fixture);
    assert!(!expected.is_empty(), "fixture has no annotations");
    for exp in &expected {
        let line = lines[exp.line - 1];
        let Some(m) = pattern.find(line) else {
            panic!("`{}` did not match line {}: {line:?}", pattern.pattern(), exp.line);
        };
        let Some(capture) = m.capture(&exp.label) else {
            panic!(
                "line {}: no capture `{}`; got {:?}",
                exp.line,
                exp.label,
                m.to_map()
            );
        };
        assert_eq!(
            (capture.start, capture.end),
            (exp.start, exp.end),
            "line {}: `{}` captured {:?}, expected {:?}",
            exp.line,
            exp.label,
            capture.value,
            &line[exp.start..exp.end],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotation_requires_label() {
        assert!(try_parse_annotation("  ^^ exit_code").is_some());
        assert!(try_parse_annotation("  ^^").is_none());
        assert!(try_parse_annotation("^^ not a label").is_none());
        assert!(try_parse_annotation("x ^ y").is_none());
    }

    #[test]
    fn parse_fixture_strips_annotations() {
        let (lines, expected) = parse_fixture("a 12\n  ^^ n\nb\n");
        assert_eq!(lines, vec!["a 12", "b"]);
        assert_eq!(expected.len(), 1);
        assert_eq!(expected[0].line, 1);
        assert_eq!((expected[0].start, expected[0].end), (2, 4));
    }

    #[test]
    fn site_patterns() {
        assert_captures(
            &compile("%{COALITION_JOB_WORKER}"),
            "* WORKER : canwork140-1\n\
             \x20          ^^^^^^^^^^ worker\n\
             \x20                     ^ slot\n",
        );
        assert_captures(
            &compile("%{COALITION_JOB_DATETIME}"),
            "* DATE : 04/07/17 18:00\n\
             \x20        ^^^^^^^^ date\n\
             \x20                 ^^ hour\n\
             \x20                    ^^ min\n",
        );
        assert_captures(
            &compile("%{COALITION_JOB_EXITCODE}"),
            "* EXIT : 1\n\
             \x20        ^ exit_code\n",
        );
    }

    #[test]
    fn rez_patterns() {
        let m = compile("%{REZ_PACKAGE_VERSION}")
            .find("REZ_ONMAYAUTILS_VERSION=0.1.84")
            .unwrap();
        assert_eq!(m.get("package_name"), Some("ONMAYAUTILS"));
        assert_eq!(m.get("package_version"), Some("0.1.84"));

        let m = compile("%{REZ_PACKAGE}").find("onmayautils-0.1.84").unwrap();
        assert_eq!(m.get("package_name"), Some("onmayautils"));
        assert_eq!(m.get("package_version"), Some("0.1.84"));
    }

    #[test]
    fn python_patterns() {
        let m = compile("%{PYTHON_TRACEBACK_ERROR}")
            .find(r#"  File "/studio/code/packages/repoedit/0.0.19/bin/repotransfer", line 41, in <module>"#)
            .unwrap();
        assert_eq!(
            m.get("traceback_file"),
            Some("/studio/code/packages/repoedit/0.0.19/bin/repotransfer")
        );
        assert_eq!(m.get("traceback_line"), Some("41"));
        assert_eq!(m.get("traceback_in"), Some("<module>"));

        let m = compile("%{PYTHON_NAME_ERROR}")
            .find("NameError: global name 'value' is not defined")
            .unwrap();
        assert_eq!(m.get("python_error"), Some("global name 'value' is not defined"));
    }

    #[test]
    fn date_and_version() {
        let m = compile("DATE : %{MONTHNUM:month}[/-]%{MONTHDAY:day}[/-]%{YEAR:year}")
            .find("* DATE : 07/26/2017")
            .unwrap();
        assert_eq!(m.get("month"), Some("07"));
        assert_eq!(m.get("day"), Some("26"));
        assert_eq!(m.get("year"), Some("2017"));

        let m = compile("version=%{VERSION:version}").find("version=1.0.1").unwrap();
        assert_eq!(m.get("version"), Some("1.0.1"));
    }
}
