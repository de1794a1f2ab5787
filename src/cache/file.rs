//! Cache backend storing one JSON file per key.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;

use super::{CacheBackend, CacheError, CacheRecord};

pub const DEFAULT_FILE_NAME_PREFIX: &str = "dragon_cache";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Options accepted by [`FileBackend`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileBackendOptions {
    #[serde(default = "std::env::temp_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
}

fn default_prefix() -> String {
    DEFAULT_FILE_NAME_PREFIX.to_string()
}

impl Default for FileBackendOptions {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir(),
            file_name_prefix: default_prefix(),
        }
    }
}

/// Stores each entry at `<cache_dir>/<prefix>---<key>`.
///
/// Entries are written to a temporary file and renamed into place, so a
/// reader sees either the previous entry or the new one.
#[derive(Debug, Clone)]
pub struct FileBackend {
    cache_dir: PathBuf,
    file_name_prefix: String,
}

impl FileBackend {
    /// Opens a backend over an existing directory.
    pub fn new(options: FileBackendOptions) -> Result<Self, CacheError> {
        let invalid = |message: String| CacheError::InvalidOptions {
            backend: "file",
            message,
        };

        let cache_dir = options.cache_dir.canonicalize().map_err(|e| {
            invalid(format!(
                "cache_dir '{}' is not usable: {}",
                options.cache_dir.display(),
                e
            ))
        })?;
        if !cache_dir.is_dir() {
            return Err(invalid(format!(
                "cache_dir '{}' is not a directory",
                cache_dir.display()
            )));
        }
        if options.file_name_prefix.is_empty() || options.file_name_prefix.contains(['/', '\\']) {
            return Err(invalid(format!(
                "file_name_prefix '{}' must be a non-empty file name",
                options.file_name_prefix
            )));
        }

        Ok(Self {
            cache_dir,
            file_name_prefix: options.file_name_prefix,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}---{}", self.file_name_prefix, key))
    }

    fn io_error(path: &Path, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl CacheBackend for FileBackend {
    fn location(&self) -> String {
        format!("file:{}/{}", self.cache_dir.display(), self.file_name_prefix)
    }

    fn load(&self, key: &str) -> Result<Option<CacheRecord>, CacheError> {
        let path = self.entry_path(key);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| CacheError::Corrupt {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    fn save(&self, record: &CacheRecord) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(record).map_err(CacheError::Serialize)?;
        let path = self.entry_path(&record.key);
        let tmp = self.cache_dir.join(format!(
            ".{}---{}.{}-{}.tmp",
            self.file_name_prefix,
            record.key,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        fs::write(&tmp, bytes).map_err(|e| Self::io_error(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(Self::io_error(&path, e));
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }
}
