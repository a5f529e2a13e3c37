//! Symbolic pattern compiler.
//!
//! Expands `%{NAME[:ALIAS] [PREDICATE]}` references recursively against a
//! [`Library`] and compiles the result with `fancy-regex`. Each expanded
//! reference becomes a capturing group with a compiler-assigned opaque name
//! (`__ref0`, `__ref1`, ...); a side table maps those groups to their capture
//! label and optional predicate, so predicate bookkeeping never depends on
//! how groups are named.

use tracing::{debug, warn};

use super::error::CompileError;
use super::lexer::{Piece, Reference, tokenize};
use super::library::Library;
use super::matcher::{CaptureSlot, CompiledPattern, DegradedPredicate};
use super::predicate::Predicate;

const GROUP_PREFIX: &str = "__ref";

/// Opaque group name for the `id`-th expanded reference.
fn group_name(id: usize) -> String {
    format!("{GROUP_PREFIX}{id}")
}

fn parse_group_name(name: &str) -> Option<usize> {
    name.strip_prefix(GROUP_PREFIX)?.parse().ok()
}

/// First author-written named group in `text` that uses the reserved prefix.
fn reserved_group_name(text: &str) -> Option<&str> {
    ["(?P<", "(?<"].iter().find_map(|open| {
        text.match_indices(open).find_map(|(at, _)| {
            let rest = &text[at + open.len()..];
            let name = &rest[..rest.find('>')?];
            name.starts_with(GROUP_PREFIX).then_some(name)
        })
    })
}

#[derive(Debug)]
struct GroupInfo {
    label: String,
    predicate: Option<Predicate>,
}

pub struct Compiler<'lib> {
    library: &'lib Library,
}

impl<'lib> Compiler<'lib> {
    pub fn new(library: &'lib Library) -> Self {
        Self { library }
    }

    pub fn compile(&self, pattern: &str) -> Result<CompiledPattern, CompileError> {
        let mut expansion = Expansion {
            library: self.library,
            pattern,
            groups: Vec::new(),
            active: Vec::new(),
            degraded: Vec::new(),
        };
        let mut expanded = String::with_capacity(pattern.len());
        expansion.expand(pattern, &mut expanded)?;

        let regex = fancy_regex::Regex::new(&expanded).map_err(|e| CompileError::Regex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let mut groups: Vec<Option<GroupInfo>> =
            expansion.groups.into_iter().map(Some).collect();
        let mut slots = Vec::new();
        let mut predicates = Vec::new();
        for (index, name) in regex.capture_names().enumerate() {
            let Some(name) = name else { continue };
            let info = parse_group_name(name).and_then(|id| groups.get_mut(id)?.take());
            let slot = match info {
                Some(GroupInfo { label, predicate }) => {
                    let predicate = predicate.map(|p| {
                        predicates.push(p);
                        predicates.len() - 1
                    });
                    CaptureSlot {
                        index,
                        label,
                        predicate,
                    }
                }
                // A named group written directly in the fragment text.
                None => CaptureSlot {
                    index,
                    label: name.to_string(),
                    predicate: None,
                },
            };
            slots.push(slot);
        }

        debug!(
            "compiled `{pattern}` into {} groups ({} predicates)",
            slots.len(),
            predicates.len()
        );
        Ok(CompiledPattern::new(
            pattern.to_string(),
            expanded,
            regex,
            slots,
            predicates,
            expansion.degraded,
        ))
    }
}

/// Per-compile expansion state.
struct Expansion<'a> {
    library: &'a Library,
    pattern: &'a str,
    groups: Vec<GroupInfo>,
    /// Names being expanded on the current resolution path.
    active: Vec<String>,
    degraded: Vec<DegradedPredicate>,
}

impl<'a> Expansion<'a> {
    fn expand(&mut self, text: &str, out: &mut String) -> Result<(), CompileError> {
        for piece in tokenize(text)? {
            match piece {
                Piece::Literal(literal) => {
                    if let Some(name) = reserved_group_name(literal) {
                        return Err(CompileError::GroupCollision {
                            pattern: self.pattern.to_string(),
                            name: name.to_string(),
                        });
                    }
                    out.push_str(literal);
                }
                Piece::Reference(reference) => self.expand_reference(&reference, out)?,
            }
        }
        Ok(())
    }

    fn expand_reference(
        &mut self,
        reference: &Reference<'_>,
        out: &mut String,
    ) -> Result<(), CompileError> {
        if self.active.iter().any(|name| name == reference.name) {
            let mut path = self.active.clone();
            path.push(reference.name.to_string());
            return Err(CompileError::Cycle {
                pattern: self.pattern.to_string(),
                path,
            });
        }

        let library = self.library;
        let fragment = library
            .lookup(reference.name)
            .map_err(|_| CompileError::UnknownPattern {
                name: reference.name.to_string(),
                pattern: self.pattern.to_string(),
            })?;

        let predicate = reference
            .predicate
            .and_then(|clause| match Predicate::parse(clause) {
                Ok(predicate) => Some(predicate),
                Err(reason) => {
                    warn!(
                        "ignoring predicate `{clause}` on %{{{}}} in `{}`: {reason}",
                        reference.name, self.pattern
                    );
                    self.degraded.push(DegradedPredicate {
                        reference: reference.name.to_string(),
                        clause: clause.to_string(),
                        reason,
                    });
                    None
                }
            });

        let id = self.groups.len();
        self.groups.push(GroupInfo {
            label: reference.label().to_string(),
            predicate,
        });

        out.push_str("(?P<");
        out.push_str(&group_name(id));
        out.push('>');
        self.active.push(reference.name.to_string());
        self.expand(fragment, out)?;
        self.active.pop();
        out.push(')');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grok::error::PredicateParseError;

    fn library() -> Library {
        let mut lib = Library::new();
        lib.load(
            "WORD \\b\\w+\\b\n\
             INT (?:[+-]?(?:[0-9]+))\n\
             PAIR %{WORD:key}=%{INT:value}\n\
             A %{B}\n\
             B %{C}\n\
             C %{A}\n\
             SELF x%{SELF}\n\
             BROKEN %{MISSING}\n",
        );
        lib
    }

    #[test]
    fn expansion_leaves_no_references() {
        let lib = library();
        let compiled = Compiler::new(&lib).compile("^%{PAIR}$").unwrap();
        assert!(!compiled.expanded().contains("%{"));
        assert_eq!(
            compiled.expanded(),
            r"^(?P<__ref0>(?P<__ref1>\b\w+\b)=(?P<__ref2>(?:[+-]?(?:[0-9]+))))$"
        );
    }

    #[test]
    fn labels_follow_aliases() {
        let lib = library();
        let compiled = Compiler::new(&lib).compile("%{PAIR:kv}").unwrap();
        assert_eq!(compiled.labels(), vec!["kv", "key", "value"]);
    }

    #[test]
    fn unknown_reference_fails() {
        let lib = library();
        let err = Compiler::new(&lib).compile("%{NOPE}").unwrap_err();
        assert!(matches!(err, CompileError::UnknownPattern { ref name, .. } if name == "NOPE"));
    }

    #[test]
    fn unknown_nested_reference_fails() {
        let lib = library();
        let err = Compiler::new(&lib).compile("%{BROKEN}").unwrap_err();
        assert!(matches!(err, CompileError::UnknownPattern { ref name, .. } if name == "MISSING"));
    }

    #[test]
    fn reference_resolves_once_defined() {
        let mut lib = library();
        assert!(Compiler::new(&lib).compile("%{BROKEN}").is_err());
        lib.add("MISSING", "m+");
        assert!(Compiler::new(&lib).compile("%{BROKEN}").is_ok());
    }

    #[test]
    fn indirect_cycle_is_detected() {
        let lib = library();
        let err = Compiler::new(&lib).compile("%{A}").unwrap_err();
        match err {
            CompileError::Cycle { path, .. } => assert_eq!(path, vec!["A", "B", "C", "A"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let lib = library();
        assert!(matches!(
            Compiler::new(&lib).compile("%{SELF}").unwrap_err(),
            CompileError::Cycle { .. }
        ));
    }

    #[test]
    fn repeated_siblings_are_not_cycles() {
        let lib = library();
        let compiled = Compiler::new(&lib).compile("%{WORD} %{WORD} %{PAIR}").unwrap();
        assert_eq!(compiled.labels(), vec!["WORD", "WORD", "PAIR", "key", "value"]);
    }

    #[test]
    fn invalid_regex_fails() {
        let lib = library();
        let err = Compiler::new(&lib).compile("%{WORD}(").unwrap_err();
        assert!(matches!(err, CompileError::Regex { .. }));
    }

    #[test]
    fn failed_compile_leaves_library_usable() {
        let lib = library();
        let compiler = Compiler::new(&lib);
        assert!(compiler.compile("%{A}").is_err());
        assert!(compiler.compile("%{WORD}").is_ok());
        assert_eq!(lib.lookup("A").unwrap(), "%{B}");
    }

    #[test]
    fn plain_regex_compiles_as_is() {
        let lib = library();
        let compiled = Compiler::new(&lib).compile(r"^\d{4}-\d{2}$").unwrap();
        assert_eq!(compiled.expanded(), r"^\d{4}-\d{2}$");
        assert!(compiled.labels().is_empty());
    }

    #[test]
    fn author_named_groups_keep_their_names() {
        let lib = library();
        let compiled = Compiler::new(&lib).compile(r"(?P<year>\d{4}) %{WORD}").unwrap();
        assert_eq!(compiled.labels(), vec!["year", "WORD"]);
    }

    #[test]
    fn malformed_predicate_degrades() {
        let lib = library();
        let compiled = Compiler::new(&lib).compile("^%{INT > ten}$").unwrap();
        assert_eq!(compiled.predicate_count(), 0);
        let degraded = compiled.degraded_predicates();
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0].reference, "INT");
        assert_eq!(
            degraded[0].reason,
            PredicateParseError::InvalidNumber("ten".to_string())
        );
        // Unconditional structural match.
        assert!(compiled.find("5").is_some());
    }

    #[test]
    fn predicates_are_recorded_per_reference() {
        let lib = library();
        let compiled = Compiler::new(&lib)
            .compile("%{WORD:a $== x} %{INT:b > 3} %{WORD:c}")
            .unwrap();
        assert_eq!(compiled.predicate_count(), 2);
        assert!(compiled.degraded_predicates().is_empty());
    }

    #[test]
    fn reserved_group_name_is_a_collision() {
        let lib = library();
        let compiler = Compiler::new(&lib);
        match compiler.compile(r"(?P<__ref0>\d+) %{INT:n > 5}") {
            Err(CompileError::GroupCollision { name, .. }) => assert_eq!(name, "__ref0"),
            other => panic!("expected a group collision, got {other:?}"),
        }
        assert!(matches!(
            compiler.compile(r"(?<__ref7>x)"),
            Err(CompileError::GroupCollision { .. })
        ));
        // Other author names are fine.
        assert!(compiler.compile(r"(?P<ref0>\d+) %{INT:n}").is_ok());
    }

    #[test]
    fn reserved_group_name_inside_fragment_is_a_collision() {
        let mut lib = library();
        lib.add("SNEAKY", r"(?P<__ref1>\w+)");
        assert!(matches!(
            Compiler::new(&lib).compile("%{INT} %{SNEAKY}"),
            Err(CompileError::GroupCollision { .. })
        ));
    }
}
