use crate::action::DispatchMode;
use crate::grok::{CompileError, CompiledPattern, Compiler, Library};

use super::record::MatchConfigRecord;

/// An ordered group of compiled patterns sharing one action and one set of
/// flags. Immutable once compiled.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    record: MatchConfigRecord,
    patterns: Vec<CompiledPattern>,
    dispatch: DispatchMode,
}

impl MatchConfig {
    /// Compile every pattern of `record`. The first failure aborts.
    pub fn compile(record: MatchConfigRecord, library: &Library) -> Result<Self, CompileError> {
        let compiler = Compiler::new(library);
        let patterns = record
            .patterns
            .iter()
            .map(|pattern| compiler.compile(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        let dispatch = DispatchMode::from_shell(&record.shell);
        Ok(Self {
            record,
            patterns,
            dispatch,
        })
    }

    pub fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    pub fn action(&self) -> &str {
        &self.record.action
    }

    pub fn break_if_match(&self) -> bool {
        self.record.break_if_match
    }

    pub fn no_action(&self) -> bool {
        self.record.no_action
    }

    pub fn run_on_no_match(&self) -> bool {
        self.record.run_on_no_match
    }

    pub fn dispatch(&self) -> &DispatchMode {
        &self.dispatch
    }

    /// The source record this config was compiled from.
    pub fn record(&self) -> &MatchConfigRecord {
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn compiles_patterns_in_order() {
        let lib = testutil::library();
        let record = MatchConfigRecord::new(["%{COALITION_JOB_WORKER}", r"^plain \d+$"])
            .with_break_if_match(true)
            .with_shell("bash");
        let config = MatchConfig::compile(record, &lib).unwrap();
        let sources: Vec<&str> = config.patterns().iter().map(|p| p.pattern()).collect();
        assert_eq!(sources, vec!["%{COALITION_JOB_WORKER}", r"^plain \d+$"]);
        assert!(config.break_if_match());
        assert!(!config.no_action());
        assert_eq!(config.action(), "%{@LINE}");
        assert_eq!(config.dispatch(), &DispatchMode::Command("bash".to_string()));
    }

    #[test]
    fn any_bad_pattern_fails_the_config() {
        let lib = testutil::library();
        let record = MatchConfigRecord::new(["%{WORD}", "%{NOT_DEFINED}"]);
        assert!(matches!(
            MatchConfig::compile(record, &lib),
            Err(CompileError::UnknownPattern { .. })
        ));
    }
}
