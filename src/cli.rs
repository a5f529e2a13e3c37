use std::path::PathBuf;

use clap::Parser;

use crate::config::Settings;
use crate::grok::LibraryConfig;
use crate::program::MatchConfigRecord;

#[derive(Parser, Debug)]
#[command(name = "loggrok", version, about = "Match log lines against named grok patterns")]
pub struct Args {
    /// Log files or directories to read; standard input when none are given
    pub paths: Vec<PathBuf>,

    /// Path to settings file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Load a saved program record (JSON or YAML)
    #[arg(short = 'P', long, value_name = "FILE")]
    pub program: Option<PathBuf>,

    /// Library pattern names to match, each used as `%{NAME}` (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub patterns: Vec<String>,

    /// Symbolic patterns to match, e.g. '%{WORD:user} logged in'
    #[arg(short, long = "match", value_name = "PATTERN")]
    pub matches: Vec<String>,

    /// Action template rendered for every match
    #[arg(short, long, value_name = "TEMPLATE")]
    pub action: Option<String>,

    /// `stdout` to print actions, anything else to execute them as commands
    #[arg(long, value_name = "SHELL")]
    pub shell: Option<String>,

    /// Stop matching a line after its first match
    #[arg(long)]
    pub break_if_match: bool,

    /// Record captures without running actions
    #[arg(long)]
    pub no_action: bool,

    /// Run the action once for every input that matched nothing
    #[arg(long)]
    pub on_no_match: bool,

    /// Also read the standard output of a shell command (repeatable)
    #[arg(long, value_name = "CMD")]
    pub command: Vec<String>,

    /// Additional directory of pattern definition files (repeatable)
    #[arg(long, value_name = "DIR")]
    pub patterns_dir: Vec<PathBuf>,

    /// File-name glob for pattern definition files
    #[arg(long, value_name = "GLOB")]
    pub glob: Option<String>,

    /// Do not load the built-in base patterns
    #[arg(long)]
    pub no_builtin: bool,

    /// Write the resulting program record to FILE
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,

    /// Capture ledger output format
    #[arg(short, long, default_value = "text", value_parser = ["text", "json", "quiet"])]
    pub format: String,

    /// List library pattern names, one per line, then exit
    #[arg(long)]
    pub list_patterns: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// Library sources: settings first, then command-line additions.
    pub fn library_config(&self, settings: &Settings) -> LibraryConfig {
        let mut config = settings.library_config();
        if self.no_builtin {
            config.builtin = false;
        }
        config.dirs.extend(self.patterns_dir.iter().cloned());
        if let Some(glob) = &self.glob {
            config.glob = glob.clone();
        }
        config
    }

    /// The match config described by `--patterns`/`--match`, if any.
    pub fn match_config_record(&self, settings: &Settings) -> Option<MatchConfigRecord> {
        let patterns: Vec<String> = self
            .patterns
            .iter()
            .map(|name| format!("%{{{name}}}"))
            .chain(self.matches.iter().cloned())
            .collect();
        if patterns.is_empty() {
            return None;
        }
        let action = self.action.as_ref().unwrap_or(&settings.default_action);
        let shell = self.shell.as_ref().unwrap_or(&settings.default_shell);
        Some(
            MatchConfigRecord::new(patterns)
                .with_action(action.as_str())
                .with_shell(shell.as_str())
                .with_break_if_match(self.break_if_match)
                .with_no_action(self.no_action)
                .with_run_on_no_match(self.on_no_match),
        )
    }
}
