use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;

use crate::config::Settings;

/// Expand the given paths into log files. Directories are walked
/// recursively, skipping hidden and git-ignored entries and anything
/// matching the configured `exclude` globs.
pub fn discover_files(paths: &[PathBuf], settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            // Explicit files are never excluded.
            files.push(path.clone());
        } else if path.is_dir() {
            files.extend(walk_directory(path, &settings.exclude)?);
        } else {
            anyhow::bail!("path does not exist: {}", path.display());
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn walk_directory(dir: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let mut builder = WalkBuilder::new(dir);
    builder.hidden(true).git_ignore(true).git_global(true);

    if !exclude.is_empty() {
        let mut overrides = OverrideBuilder::new(dir);
        for pattern in exclude {
            overrides
                .add(&format!("!{pattern}"))
                .with_context(|| format!("invalid exclude pattern: {pattern}"))?;
        }
        let overrides = overrides.build().context("failed to build overrides")?;
        builder.overrides(overrides);
    }

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry.context("error walking directory")?;
        if entry.path().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn discovers_files_sorted_and_nested() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("jobs");
        fs::create_dir_all(&sub).unwrap();
        fs::write(dir.path().join("z.log"), "").unwrap();
        fs::write(dir.path().join("a.log"), "").unwrap();
        fs::write(sub.join("m.txt"), "").unwrap();
        fs::write(dir.path().join(".hidden.log"), "").unwrap();

        let files = discover_files(&[dir.path().to_path_buf()], &Settings::default()).unwrap();
        assert_eq!(names(&files), vec!["a.log", "m.txt", "z.log"]);
    }

    #[test]
    fn exclude_globs_apply_to_walks_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.log"), "").unwrap();
        let archived = dir.path().join("old.log.gz");
        fs::write(&archived, "").unwrap();

        let settings = Settings {
            exclude: vec!["*.gz".to_string()],
            ..Settings::default()
        };
        let walked = discover_files(&[dir.path().to_path_buf()], &settings).unwrap();
        assert_eq!(names(&walked), vec!["keep.log"]);

        let direct = discover_files(&[archived.clone()], &settings).unwrap();
        assert_eq!(direct, vec![archived]);
    }

    #[test]
    fn duplicates_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("a.log");
        fs::write(&log, "").unwrap();
        let files = discover_files(&[log.clone(), dir.path().to_path_buf()], &Settings::default())
            .unwrap();
        assert_eq!(files, vec![log]);
    }

    #[test]
    fn nonexistent_path_errors() {
        let result = discover_files(&[PathBuf::from("/no/such/path")], &Settings::default());
        assert!(result.is_err());
    }
}
