pub mod action;
pub mod cli;
pub mod config;
pub mod formatter;
pub mod fs;
pub mod grok;
pub mod program;

#[cfg(test)]
pub mod testutil;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::debug;

use action::WriterSink;
use cli::Args;
use config::load_settings;
use formatter::create_formatter;
use fs::discover_files;
use grok::Library;
use program::{Program, ProgramRecord, ReaderInput};

/// Settings file used when `--config` is absent.
pub const CONFIG_ENV: &str = "LOGGROK_CONFIG";
/// Extra pattern directory appended after the configured ones.
pub const PATTERNS_DIR_ENV: &str = "LOGGROK_PATTERNS_DIR";

/// Run loggrok. Returns the exit code: 0 = something matched, 1 = nothing matched.
pub fn run(args: Args) -> Result<i32> {
    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    let settings = load_settings(config_path.as_deref())?;
    match settings.source() {
        Some(path) => debug!(path = %path.display(), "settings loaded"),
        None => debug!("no settings file found"),
    }

    let mut library_config = args.library_config(&settings);
    if let Some(dir) = std::env::var_os(PATTERNS_DIR_ENV) {
        library_config.dirs.push(PathBuf::from(dir));
    }
    let library = Library::from_config(&library_config).context("failed to load pattern library")?;
    debug!(patterns = library.len(), "pattern library ready");

    // --list-patterns: print all library names and exit
    if args.list_patterns {
        for name in library.names() {
            println!("{name}");
        }
        return Ok(0);
    }

    let mut program = build_program(&args, &settings, &library)?;

    if program.match_configs().is_empty() {
        bail!("nothing to match: pass --patterns, --match or --program");
    }

    if let Some(path) = &args.save {
        program
            .save(path)
            .with_context(|| format!("failed to save program to {}", path.display()))?;
        debug!(path = %path.display(), "program saved");
    }

    let files = discover_files(&args.paths, &settings)?;
    debug!(files = files.len(), commands = args.command.len(), "inputs discovered");

    let mut sink = WriterSink::stdout();
    for file in &files {
        program
            .add_input_file(file, &mut sink)
            .with_context(|| format!("failed to read {}", file.display()))?;
    }
    for command in &args.command {
        program
            .add_input_process(command, &mut sink)
            .with_context(|| format!("failed to run `{command}`"))?;
    }
    if args.paths.is_empty() && args.command.is_empty() {
        let stdin = std::io::stdin().lock();
        program.add_input(ReaderInput::new("-", stdin), &mut sink)?;
    }

    let formatter = create_formatter(&args.format);
    formatter.print(&program);

    Ok(if program.match_count() > 0 { 0 } else { 1 })
}

/// Program from `--program` (if any) followed by the config built from
/// `--patterns`/`--match`.
fn build_program(
    args: &Args,
    settings: &config::Settings,
    library: &Library,
) -> Result<Program> {
    let mut record = match &args.program {
        Some(path) => Program::read_record(path)?,
        None => ProgramRecord {
            name: "loggrok".to_string(),
            capture_format: settings.capture_format.clone(),
            match_configs: Vec::new(),
        },
    };
    if let Some(config) = args.match_config_record(settings) {
        record.match_configs.push(config);
    }
    Program::from_record(&record, library).context("failed to compile program")
}
