use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_yml::Value;

use crate::action::DispatchMode;
use crate::grok::{DEFAULT_PATTERN_GLOB, LibraryConfig};
use crate::program::{DEFAULT_ACTION, DEFAULT_CAPTURE_FORMAT};

pub const DEFAULT_CONFIG_FILE: &str = ".loggrok.yml";

/// Settings from `.loggrok.yml`.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// File the settings were read from, if any.
    pub(crate) source: Option<PathBuf>,
    /// Pattern directories, resolved against the settings file's directory.
    pub patterns_dirs: Vec<PathBuf>,
    pub pattern_glob: String,
    pub builtin_patterns: bool,
    pub capture_format: String,
    pub default_action: String,
    pub default_shell: String,
    /// Globs excluded when walking log directories.
    pub exclude: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: None,
            patterns_dirs: Vec::new(),
            pattern_glob: DEFAULT_PATTERN_GLOB.to_string(),
            builtin_patterns: true,
            capture_format: DEFAULT_CAPTURE_FORMAT.to_string(),
            default_action: DEFAULT_ACTION.to_string(),
            default_shell: DispatchMode::STDOUT.to_string(),
            exclude: Vec::new(),
        }
    }
}

impl Settings {
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn library_config(&self) -> LibraryConfig {
        LibraryConfig {
            builtin: self.builtin_patterns,
            dirs: self.patterns_dirs.clone(),
            glob: self.pattern_glob.clone(),
        }
    }
}

/// Load settings from `path`, or from `.loggrok.yml` in the current
/// directory. A missing file yields the defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings_path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    if !settings_path.exists() {
        return Ok(Settings::default());
    }

    let contents = std::fs::read_to_string(settings_path)
        .with_context(|| format!("failed to read config {}", settings_path.display()))?;
    let raw: Value = serde_yml::from_str(&contents)
        .with_context(|| format!("failed to parse {}", settings_path.display()))?;
    let base = settings_path.parent().unwrap_or(Path::new(""));

    let mut settings = Settings {
        source: Some(settings_path.to_path_buf()),
        ..Settings::default()
    };

    let Value::Mapping(map) = &raw else {
        return Ok(settings);
    };
    for (key, value) in map {
        let Some(key) = key.as_str() else { continue };
        match key {
            "patterns_dirs" => {
                if let Some(dirs) = value_to_string_list(value) {
                    settings.patterns_dirs = dirs.iter().map(|d| base.join(d)).collect();
                }
            }
            "pattern_glob" => set_string(&mut settings.pattern_glob, value),
            "builtin_patterns" => {
                if let Some(b) = value.as_bool() {
                    settings.builtin_patterns = b;
                }
            }
            "capture_format" => set_string(&mut settings.capture_format, value),
            "default_action" => set_string(&mut settings.default_action, value),
            "default_shell" => set_string(&mut settings.default_shell, value),
            "exclude" => {
                if let Some(list) = value_to_string_list(value) {
                    settings.exclude = list;
                }
            }
            _ => {}
        }
    }

    Ok(settings)
}

fn set_string(target: &mut String, value: &Value) {
    if let Some(s) = value.as_str() {
        *target = s.to_string();
    }
}

fn value_to_string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        _ => value.as_sequence().map(|seq| {
            seq.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        }),
    }
}
