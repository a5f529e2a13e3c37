//! Named pattern definitions.
//!
//! Definition text is line oriented: `NAME<whitespace>FRAGMENT`. Blank lines
//! and lines starting with `#` are skipped. Loading a name that already
//! exists replaces it (last write wins).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use globset::Glob;
use tracing::debug;

use super::error::LibraryError;

/// Base patterns shipped with the crate.
pub const BUILTIN_PATTERNS: &str = include_str!("../../patterns/grok-patterns");

pub const DEFAULT_PATTERN_GLOB: &str = "*.patterns";

/// Where a [`Library`] gets its definitions from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Load [`BUILTIN_PATTERNS`] first.
    pub builtin: bool,
    /// Directories scanned in order; later definitions overwrite earlier ones.
    pub dirs: Vec<PathBuf>,
    /// File-name glob selecting definition files inside `dirs`.
    pub glob: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            builtin: false,
            dirs: Vec::new(),
            glob: DEFAULT_PATTERN_GLOB.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Library {
    patterns: HashMap<String, String>,
}

impl Library {
    /// An empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// A library holding only the built-in base patterns.
    pub fn builtin() -> Self {
        let mut library = Self::new();
        library.load(BUILTIN_PATTERNS);
        library
    }

    pub fn from_config(config: &LibraryConfig) -> Result<Self, LibraryError> {
        let mut library = if config.builtin {
            Self::builtin()
        } else {
            Self::new()
        };
        for dir in &config.dirs {
            library.load_dir(dir, &config.glob)?;
        }
        Ok(library)
    }

    /// Parse definition text. Returns the number of definitions loaded.
    pub fn load(&mut self, text: &str) -> usize {
        let mut count = 0;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((name, fragment)) = line.split_once(char::is_whitespace) else {
                debug!("skipping pattern definition without a fragment: {line}");
                continue;
            };
            self.add(name, fragment.trim());
            count += 1;
        }
        count
    }

    pub fn load_file(&mut self, path: &Path) -> Result<usize, LibraryError> {
        let text = std::fs::read_to_string(path).map_err(|source| LibraryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let count = self.load(&text);
        debug!("loaded {count} patterns from {}", path.display());
        Ok(count)
    }

    /// Load every file in `dir` whose name matches `glob`, in file-name order.
    pub fn load_dir(&mut self, dir: &Path, glob: &str) -> Result<usize, LibraryError> {
        let matcher = Glob::new(glob)
            .map_err(|e| LibraryError::Glob {
                glob: glob.to_string(),
                message: e.to_string(),
            })?
            .compile_matcher();

        let io_error = |source| LibraryError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            let selected = path.is_file()
                && path
                    .file_name()
                    .is_some_and(|name| matcher.is_match(Path::new(name)));
            if selected {
                files.push(path);
            }
        }
        files.sort();

        let mut count = 0;
        for file in &files {
            count += self.load_file(file)?;
        }
        Ok(count)
    }

    /// Insert or replace a definition.
    pub fn add(&mut self, name: &str, fragment: &str) {
        self.patterns.insert(name.to_string(), fragment.to_string());
    }

    pub fn lookup(&self, name: &str) -> Result<&str, LibraryError> {
        self.patterns
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| LibraryError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.patterns.contains_key(name)
    }

    /// Defined names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.patterns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
