use glob::Pattern;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("no file matching '{pattern}' in {directories:?}")]
    NotFound {
        pattern: String,
        directories: Vec<PathBuf>,
    },
}

/// Finds input files by name or glob pattern in a list of directories.
#[derive(Debug, Clone)]
pub struct FileFinder {
    directories: Vec<PathBuf>,
}

impl FileFinder {
    pub fn new(directories: Vec<PathBuf>) -> Self {
        Self { directories }
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// All files matching `pattern`, sorted by path. Each directory is first
    /// tried directly and then searched recursively.
    pub fn find_all(&self, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
        let name_pattern = Pattern::new(pattern).map_err(|source| DiscoveryError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let mut found = Vec::new();
        for dir in &self.directories {
            let direct = Self::search_directly(dir, pattern)?;
            if direct.is_empty() {
                found.extend(Self::search_recursively(dir, &name_pattern));
            } else {
                found.extend(direct);
            }
        }
        found.sort();
        found.dedup();

        if found.is_empty() {
            return Err(DiscoveryError::NotFound {
                pattern: pattern.to_string(),
                directories: self.directories.clone(),
            });
        }
        debug!(pattern, files = found.len(), "found input files");
        Ok(found)
    }

    /// First file matching `pattern`.
    pub fn find_one(&self, pattern: &str) -> Result<PathBuf, DiscoveryError> {
        let mut files = self.find_all(pattern)?;
        Ok(files.swap_remove(0))
    }

    fn search_directly(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
        let full = dir.join(pattern);
        let full = full.to_string_lossy();
        let paths = glob::glob(&full).map_err(|source| DiscoveryError::Pattern {
            pattern: full.to_string(),
            source,
        })?;
        Ok(paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect())
    }

    /// Search for files recursively within a directory, matching file names only.
    fn search_recursively(dir: &Path, pattern: &Pattern) -> Vec<PathBuf> {
        if !dir.exists() {
            return Vec::new();
        }

        WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| {
                entry.file_type().is_file() && pattern.matches(&entry.file_name().to_string_lossy())
            })
            .map(|entry| entry.into_path())
            .collect()
    }
}
