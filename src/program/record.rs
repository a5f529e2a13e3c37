//! Persisted program records.
//!
//! Records hold the source text of every pattern, never compiled state;
//! loading one recompiles against the library at hand.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action::DispatchMode;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const DEFAULT_ACTION: &str = "%{@LINE}";
pub const DEFAULT_CAPTURE_FORMAT: &str = "%{@PATTERNS}";

fn default_action() -> String {
    DEFAULT_ACTION.to_string()
}

fn default_shell() -> String {
    DispatchMode::STDOUT.to_string()
}

fn default_capture_format() -> String {
    DEFAULT_CAPTURE_FORMAT.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfigRecord {
    pub patterns: Vec<String>,
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(rename = "nomatch", default)]
    pub run_on_no_match: bool,
    #[serde(rename = "breakifmatch", default)]
    pub break_if_match: bool,
    #[serde(rename = "noaction", default)]
    pub no_action: bool,
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl MatchConfigRecord {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            action: default_action(),
            run_on_no_match: false,
            break_if_match: false,
            no_action: false,
            shell: default_shell(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn with_break_if_match(mut self, value: bool) -> Self {
        self.break_if_match = value;
        self
    }

    pub fn with_no_action(mut self, value: bool) -> Self {
        self.no_action = value;
        self
    }

    pub fn with_run_on_no_match(mut self, value: bool) -> Self {
        self.run_on_no_match = value;
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRecord {
    #[serde(default)]
    pub name: String,
    #[serde(
        rename = "captureFormat",
        alias = "captureformat",
        default = "default_capture_format"
    )]
    pub capture_format: String,
    #[serde(rename = "matchConfigs", alias = "matchconfigs", default)]
    pub match_configs: Vec<MatchConfigRecord>,
}

/// On-disk encoding, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Json,
    Yaml,
}

impl RecordFormat {
    /// `.yml`/`.yaml` select YAML; anything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => {
                RecordFormat::Yaml
            }
            _ => RecordFormat::Json,
        }
    }

    pub fn encode(&self, record: &ProgramRecord) -> Result<String, BoxError> {
        Ok(match self {
            RecordFormat::Json => serde_json::to_string_pretty(record)? + "\n",
            RecordFormat::Yaml => serde_yml::to_string(record)?,
        })
    }

    pub fn decode(&self, text: &str) -> Result<ProgramRecord, BoxError> {
        Ok(match self {
            RecordFormat::Json => serde_json::from_str(text)?,
            RecordFormat::Yaml => serde_yml::from_str(text)?,
        })
    }
}
