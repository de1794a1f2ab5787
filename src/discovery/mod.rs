//! Locating config files under a root directory.

use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use walkdir::WalkDir;

/// Matches file names with a recognised config extension.
pub const DEFAULT_FILE_PATTERN: &str = r"^.*\.(ini|toml)$";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiscoveryError {
    #[error("invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("config root '{path}' is not readable: {source}")]
    RootUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Compiles a file name pattern.
pub fn compile_pattern(pattern: &str) -> Result<Regex, DiscoveryError> {
    Regex::new(pattern).map_err(|e| DiscoveryError::InvalidPattern {
        pattern: pattern.to_string(),
        source: e,
    })
}

/// Produces the ordered list of config files under `root`.
///
/// The order of the result is the merge order: later files override earlier ones.
pub trait FileDiscovery: Send + Sync + std::fmt::Debug {
    fn search(&self, root: &Path, pattern: &Regex) -> Result<Vec<PathBuf>, DiscoveryError>;
}

/// Recursive scanner that keeps regular files whose name matches the pattern.
///
/// Returns absolute paths in lexicographic order. Unreadable subdirectories
/// are skipped; an unreadable root is an error.
#[derive(Debug, Clone, Default)]
pub struct RegexFileScanner {
    follow_links: bool,
}

impl RegexFileScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow symbolic links while walking.
    pub fn follow_links(mut self, yes: bool) -> Self {
        self.follow_links = yes;
        self
    }
}

impl FileDiscovery for RegexFileScanner {
    fn search(&self, root: &Path, pattern: &Regex) -> Result<Vec<PathBuf>, DiscoveryError> {
        let unavailable = |source| DiscoveryError::RootUnavailable {
            path: root.to_path_buf(),
            source,
        };
        let root = root.canonicalize().map_err(unavailable)?;
        std::fs::read_dir(&root).map_err(unavailable)?;

        let mut files: Vec<PathBuf> = WalkDir::new(&root)
            .follow_links(self.follow_links)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!("skipping unreadable entry during discovery: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| pattern.is_match(&entry.file_name().to_string_lossy()))
            .map(|entry| entry.into_path())
            .collect();
        files.sort();

        tracing::debug!(
            "discovered {} config file(s) under {}",
            files.len(),
            root.display()
        );
        Ok(files)
    }
}
