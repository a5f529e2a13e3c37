//! Action template rendering.
//!
//! Templates are free text containing `%{NAME}` or `%{NAME|filter|...}`
//! macros. A macro naming a capture of the current match takes that
//! capture's value; otherwise a reserved `@` keyword resolves to match
//! metadata. Anything else is left in the output untouched.

use serde_json::{Map, Value, json};
use tracing::warn;

use super::filter::Filter;
use crate::grok::{CompileError, CompiledPattern, Compiler, GrokMatch, Library};

/// Reserved macro keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Macro {
    Line,
    Match,
    Start,
    End,
    Length,
    Input,
    Patterns,
    Json,
    JsonComplex,
}

impl Macro {
    pub fn from_name(name: &str) -> Option<Macro> {
        match name {
            "@LINE" => Some(Macro::Line),
            "@MATCH" => Some(Macro::Match),
            "@START" => Some(Macro::Start),
            "@END" => Some(Macro::End),
            "@LENGTH" => Some(Macro::Length),
            "@INPUT" => Some(Macro::Input),
            "@PATTERNS" => Some(Macro::Patterns),
            "@JSON" => Some(Macro::Json),
            "@JSON_COMPLEX" => Some(Macro::JsonComplex),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Macro::Line => "@LINE",
            Macro::Match => "@MATCH",
            Macro::Start => "@START",
            Macro::End => "@END",
            Macro::Length => "@LENGTH",
            Macro::Input => "@INPUT",
            Macro::Patterns => "@PATTERNS",
            Macro::Json => "@JSON",
            Macro::JsonComplex => "@JSON_COMPLEX",
        }
    }

    /// Resolve against a match. Without one, only `@INPUT` has a value and
    /// everything else is empty.
    pub fn value(&self, input: &str, grok_match: Option<&GrokMatch>) -> String {
        if *self == Macro::Input {
            return input.to_string();
        }
        let Some(m) = grok_match else {
            return String::new();
        };
        match self {
            Macro::Line => m.line().to_string(),
            Macro::Match => m.as_str().to_string(),
            Macro::Start => m.start().to_string(),
            Macro::End => m.end().to_string(),
            Macro::Length => m.len().to_string(),
            Macro::Input => input.to_string(),
            Macro::Patterns => patterns_object(m).to_string(),
            Macro::Json => json_simple(m).to_string(),
            Macro::JsonComplex => json_complex(m).to_string(),
        }
    }
}

fn patterns_object(m: &GrokMatch) -> Value {
    let map: Map<String, Value> = m
        .to_map()
        .into_iter()
        .map(|(name, value)| (name, Value::String(value)))
        .collect();
    Value::Object(map)
}

/// `(name, start, end, value)` for each distinct label, leftmost first.
fn distinct_captures(m: &GrokMatch) -> Vec<(&str, usize, usize, &str)> {
    let mut seen = Vec::new();
    let mut entries = Vec::new();
    for capture in m.captures() {
        if seen.contains(&capture.name.as_str()) {
            continue;
        }
        seen.push(capture.name.as_str());
        entries.push((
            capture.name.as_str(),
            capture.start,
            capture.end,
            capture.value.as_str(),
        ));
    }
    entries
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn json_simple(m: &GrokMatch) -> Value {
    let mut entries = vec![json!({ "@LINE": m.line() }), json!({ "@MATCH": m.as_str() })];
    for (name, _, _, value) in distinct_captures(m) {
        entries.push(single(name, Value::String(value.to_string())));
    }
    Value::Array(entries)
}

fn json_complex(m: &GrokMatch) -> Value {
    let span = |start: usize, end: usize, value: &str| {
        json!({ "start": start, "end": end, "value": value })
    };
    let mut entries = vec![
        json!({ "@LINE": span(0, m.line().len(), m.line()) }),
        json!({ "@MATCH": span(m.start(), m.end(), m.as_str()) }),
    ];
    for (name, start, end, value) in distinct_captures(m) {
        entries.push(single(name, span(start, end, value)));
    }
    Value::Array(entries)
}

/// Renders action and capture-format templates.
#[derive(Debug, Clone)]
pub struct ActionRenderer {
    scanner: CompiledPattern,
}

impl ActionRenderer {
    /// Build the macro scanner. It is an ordinary compiled pattern over a
    /// private two-entry library.
    pub fn new() -> Result<Self, CompileError> {
        let mut library = Library::new();
        library.add("MACRO_NAME", "@?[A-Za-z0-9_]+");
        library.add("MACRO_FILTERS", r"(?:\|[A-Za-z0-9_]+)+");
        let scanner = Compiler::new(&library)
            .compile(r"%\{%{MACRO_NAME:name}%{MACRO_FILTERS:filters}?\}")?;
        Ok(Self { scanner })
    }

    /// Substitute every macro of `template` in one left-to-right pass.
    pub fn render(&self, template: &str, input: &str, grok_match: Option<&GrokMatch>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for token in self.scanner.find_iter(template) {
            out.push_str(&template[last..token.start()]);
            let name = token.get("name").unwrap_or_default();
            match resolve(name, token.get("filters"), input, grok_match) {
                Some(value) => out.push_str(&value),
                None => out.push_str(token.as_str()),
            }
            last = token.end();
        }
        out.push_str(&template[last..]);
        out
    }
}

fn resolve(
    name: &str,
    filters: Option<&str>,
    input: &str,
    grok_match: Option<&GrokMatch>,
) -> Option<String> {
    let mut value = match grok_match.and_then(|m| m.get(name)) {
        Some(captured) => captured.to_string(),
        None => Macro::from_name(name)?.value(input, grok_match),
    };
    for filter_name in filters.unwrap_or_default().split('|').filter(|f| !f.is_empty()) {
        let Some(filter) = Filter::from_name(filter_name) else {
            warn!("unknown action filter `{filter_name}` on %{{{name}}}");
            return None;
        };
        value = filter.apply(&value);
    }
    Some(value)
}
