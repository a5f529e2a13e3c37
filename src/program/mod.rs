//! Line-driven match pipeline.
//!
//! A [`Program`] drains one input source at a time. Every line is offered to
//! each [`MatchConfig`] in order, and each config tries its patterns in
//! order. A match appends a [`Capture`] to the ledger and, unless the config
//! is `noaction`, renders and dispatches its action. `breakifmatch` ends all
//! matching for the current line. A source that produced no match at all
//! then triggers the actions of every `nomatch` config once.

pub mod input;
pub mod match_config;
pub mod record;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::action::{ActionRenderer, ActionSink, DispatchError, DispatchMode};
use crate::grok::{CompileError, Library};

pub use input::{InputSource, ProcessInput, ReaderInput};
pub use match_config::MatchConfig;
pub use record::{
    BoxError, DEFAULT_ACTION, DEFAULT_CAPTURE_FORMAT, MatchConfigRecord, ProgramRecord,
    RecordFormat,
};

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("failed to read input {identifier}")]
    Input {
        identifier: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to persist program record {}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

/// One recorded match: the source it came from and the capture format
/// rendered against the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capture {
    pub input: String,
    pub record: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceState {
    NotStarted,
    Running,
    Finished,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputSummary {
    pub identifier: String,
    pub matches: usize,
    pub state: SourceState,
}

#[derive(Debug)]
pub struct Program {
    name: String,
    capture_format: String,
    configs: Vec<MatchConfig>,
    renderer: ActionRenderer,
    captures: BTreeMap<String, Vec<Capture>>,
    inputs: Vec<InputSummary>,
    dispatch_errors: Vec<DispatchError>,
}

impl Program {
    pub fn new(name: impl Into<String>, configs: Vec<MatchConfig>) -> Result<Self, CompileError> {
        Ok(Self {
            name: name.into(),
            capture_format: DEFAULT_CAPTURE_FORMAT.to_string(),
            configs,
            renderer: ActionRenderer::new()?,
            captures: BTreeMap::new(),
            inputs: Vec::new(),
            dispatch_errors: Vec::new(),
        })
    }

    pub fn with_capture_format(mut self, format: impl Into<String>) -> Self {
        self.capture_format = format.into();
        self
    }

    /// Recompile a persisted record against `library`.
    pub fn from_record(record: &ProgramRecord, library: &Library) -> Result<Self, CompileError> {
        let configs = record
            .match_configs
            .iter()
            .map(|config| MatchConfig::compile(config.clone(), library))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(record.name.clone(), configs)?.with_capture_format(&record.capture_format))
    }

    pub fn record(&self) -> ProgramRecord {
        ProgramRecord {
            name: self.name.clone(),
            capture_format: self.capture_format.clone(),
            match_configs: self.configs.iter().map(|c| c.record().clone()).collect(),
        }
    }

    /// Write the program record; YAML for `.yml`/`.yaml`, JSON otherwise.
    pub fn save(&self, path: &Path) -> Result<(), ProgramError> {
        let persist = |source: BoxError| ProgramError::Persist {
            path: path.to_path_buf(),
            source,
        };
        let text = RecordFormat::from_path(path)
            .encode(&self.record())
            .map_err(persist)?;
        std::fs::write(path, text).map_err(|e| persist(e.into()))?;
        debug!("saved program `{}` to {}", self.name, path.display());
        Ok(())
    }

    /// Read a program record without compiling it.
    pub fn read_record(path: &Path) -> Result<ProgramRecord, ProgramError> {
        let persist = |source: BoxError| ProgramError::Persist {
            path: path.to_path_buf(),
            source,
        };
        let text = std::fs::read_to_string(path).map_err(|e| persist(e.into()))?;
        RecordFormat::from_path(path).decode(&text).map_err(persist)
    }

    pub fn load(path: &Path, library: &Library) -> Result<Self, ProgramError> {
        let record = Self::read_record(path)?;
        Ok(Self::from_record(&record, library)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capture_format(&self) -> &str {
        &self.capture_format
    }

    pub fn match_configs(&self) -> &[MatchConfig] {
        &self.configs
    }

    /// Open `path` and run it to completion.
    pub fn add_input_file(
        &mut self,
        path: &Path,
        sink: &mut dyn ActionSink,
    ) -> Result<usize, ProgramError> {
        let mut input = ReaderInput::open_file(path).map_err(|source| ProgramError::Input {
            identifier: path.display().to_string(),
            source,
        })?;
        self.run_input(&mut input, sink)
    }

    /// Run `command` through `sh -c` and match its standard output.
    pub fn add_input_process(
        &mut self,
        command: &str,
        sink: &mut dyn ActionSink,
    ) -> Result<usize, ProgramError> {
        let mut input = ProcessInput::spawn(command).map_err(|source| ProgramError::Input {
            identifier: command.to_string(),
            source,
        })?;
        self.run_input(&mut input, sink)
    }

    pub fn add_input(
        &mut self,
        mut source: impl InputSource,
        sink: &mut dyn ActionSink,
    ) -> Result<usize, ProgramError> {
        self.run_input(&mut source, sink)
    }

    /// Drain `source` through every config. Returns the number of matches it
    /// produced.
    pub fn run_input(
        &mut self,
        source: &mut dyn InputSource,
        sink: &mut dyn ActionSink,
    ) -> Result<usize, ProgramError> {
        let index = self.inputs.len();
        let identifier = source.identifier().to_string();
        self.inputs.push(InputSummary {
            identifier: identifier.clone(),
            matches: 0,
            state: SourceState::NotStarted,
        });

        self.inputs[index].state = SourceState::Running;
        debug!("running input {identifier}");
        loop {
            let line = match source.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    self.inputs[index].state = SourceState::Done;
                    return Err(ProgramError::Input { identifier, source: e });
                }
            };
            self.match_line(index, &identifier, &line, sink);
        }

        self.inputs[index].state = SourceState::Finished;
        let matches = self.inputs[index].matches;
        if matches == 0 {
            self.run_no_match(&identifier, sink);
        }
        self.inputs[index].state = SourceState::Done;
        debug!("input {identifier} done with {matches} matches");
        Ok(matches)
    }

    fn match_line(&mut self, index: usize, identifier: &str, line: &str, sink: &mut dyn ActionSink) {
        let Self {
            configs,
            renderer,
            captures,
            capture_format,
            inputs,
            dispatch_errors,
            ..
        } = self;

        'configs: for config in configs.iter() {
            for pattern in config.patterns() {
                let Some(m) = pattern.find(line) else {
                    continue;
                };
                captures
                    .entry(pattern.pattern().to_string())
                    .or_default()
                    .push(Capture {
                        input: identifier.to_string(),
                        record: renderer.render(capture_format, identifier, Some(&m)),
                    });
                inputs[index].matches += 1;

                if !config.no_action() {
                    let action = renderer.render(config.action(), identifier, Some(&m));
                    dispatch(sink, &action, config.dispatch(), dispatch_errors);
                }
                if config.break_if_match() {
                    break 'configs;
                }
            }
        }
    }

    fn run_no_match(&mut self, identifier: &str, sink: &mut dyn ActionSink) {
        for config in &self.configs {
            if !config.run_on_no_match() || config.no_action() {
                continue;
            }
            let action = self.renderer.render(config.action(), identifier, None);
            dispatch(sink, &action, config.dispatch(), &mut self.dispatch_errors);
        }
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn inputs(&self) -> &[InputSummary] {
        &self.inputs
    }

    /// The capture ledger, keyed by the symbolic pattern that matched.
    pub fn captures(&self) -> &BTreeMap<String, Vec<Capture>> {
        &self.captures
    }

    pub fn captures_for(&self, pattern: &str) -> &[Capture] {
        self.captures.get(pattern).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn match_count(&self) -> usize {
        self.inputs.iter().map(|input| input.matches).sum()
    }

    pub fn dispatch_errors(&self) -> &[DispatchError] {
        &self.dispatch_errors
    }
}

fn dispatch(
    sink: &mut dyn ActionSink,
    action: &str,
    mode: &DispatchMode,
    errors: &mut Vec<DispatchError>,
) {
    if let Err(e) = sink.dispatch(action, mode) {
        warn!("failed to execute action `{action}`: {e}");
        errors.push(e);
    }
}
