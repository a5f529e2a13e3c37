use std::collections::BTreeMap;

use tracing::warn;

use super::error::PredicateParseError;
use super::predicate::Predicate;

/// One named group of the compiled regex.
#[derive(Debug, Clone)]
pub(crate) struct CaptureSlot {
    /// Group index in the host regex.
    pub index: usize,
    pub label: String,
    /// Index into [`CompiledPattern::predicates`].
    pub predicate: Option<usize>,
}

/// A predicate clause that failed to parse and was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct DegradedPredicate {
    /// Name of the reference the clause was attached to.
    pub reference: String,
    pub clause: String,
    pub reason: PredicateParseError,
}

/// A symbolic pattern compiled into a single regex plus its predicate table.
///
/// Stateless between calls; compile once and match many lines.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: String,
    expanded: String,
    regex: fancy_regex::Regex,
    slots: Vec<CaptureSlot>,
    predicates: Vec<Predicate>,
    degraded: Vec<DegradedPredicate>,
}

impl CompiledPattern {
    pub(crate) fn new(
        pattern: String,
        expanded: String,
        regex: fancy_regex::Regex,
        slots: Vec<CaptureSlot>,
        predicates: Vec<Predicate>,
        degraded: Vec<DegradedPredicate>,
    ) -> Self {
        Self {
            pattern,
            expanded,
            regex,
            slots,
            predicates,
            degraded,
        }
    }

    /// The symbolic text this pattern was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The fully expanded regex text.
    pub fn expanded(&self) -> &str {
        &self.expanded
    }

    /// Capture labels in group order. Labels may repeat.
    pub fn labels(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.label.as_str()).collect()
    }

    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    pub fn degraded_predicates(&self) -> &[DegradedPredicate] {
        &self.degraded
    }

    /// Search `text` and apply predicates to the first structural match.
    ///
    /// Only the leftmost structural match is considered: when one of its
    /// predicates fails the result is `None`, even if a later position in
    /// `text` would have satisfied them.
    pub fn find(&self, text: &str) -> Option<GrokMatch> {
        let captures = match self.regex.captures(text) {
            Ok(captures) => captures?,
            Err(e) => {
                warn!("matching `{}` failed: {e}", self.pattern);
                return None;
            }
        };
        let accepted = self.slots.iter().all(|slot| {
            let Some(predicate) = slot.predicate else {
                return true;
            };
            // Groups that did not participate carry no value to test.
            let Some(group) = captures.get(slot.index) else {
                return true;
            };
            self.predicates
                .get(predicate)
                .is_some_and(|p| p.evaluate(group.as_str()))
        });
        accepted.then(|| self.build_match(text, &captures))
    }

    /// Every non-overlapping structural match, without applying predicates.
    ///
    /// Unlike [`find`](Self::find) this never consults the predicate table,
    /// so the two can disagree for predicate-bearing patterns.
    pub fn find_iter(&self, text: &str) -> impl Iterator<Item = GrokMatch> {
        self.regex
            .captures_iter(text)
            .map_while(Result::ok)
            .map(move |captures| self.build_match(text, &captures))
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.find(text).is_some()
    }

    fn build_match(&self, text: &str, captures: &fancy_regex::Captures<'_>) -> GrokMatch {
        let (start, end) = captures.get(0).map_or((0, 0), |m| (m.start(), m.end()));
        let captures = self
            .slots
            .iter()
            .filter_map(|slot| {
                let group = captures.get(slot.index)?;
                Some(NamedCapture {
                    name: slot.label.clone(),
                    start: group.start(),
                    end: group.end(),
                    value: group.as_str().to_string(),
                })
            })
            .collect();
        GrokMatch {
            line: text.to_string(),
            start,
            end,
            captures,
        }
    }
}

/// A captured group, with byte offsets into the matched line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCapture {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub value: String,
}

/// A successful match: the line it was found in, the match span, and the
/// named groups that participated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrokMatch {
    line: String,
    start: usize,
    end: usize,
    captures: Vec<NamedCapture>,
}

impl GrokMatch {
    pub fn line(&self) -> &str {
        &self.line
    }

    /// The matched substring.
    pub fn as_str(&self) -> &str {
        &self.line[self.start..self.end]
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Value captured under `name`; the leftmost participating group wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.capture(name).map(|c| c.value.as_str())
    }

    pub fn capture(&self, name: &str) -> Option<&NamedCapture> {
        self.captures.iter().find(|c| c.name == name)
    }

    /// Participating groups in pattern order.
    pub fn captures(&self) -> &[NamedCapture] {
        &self.captures
    }

    /// Label to value, one entry per distinct label.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for capture in &self.captures {
            map.entry(capture.name.clone())
                .or_insert_with(|| capture.value.clone());
        }
        map
    }
}
