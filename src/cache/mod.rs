//! Storage for merged config snapshots.
//!
//! A [`CacheBackend`] persists raw [`CacheRecord`]s by key. [`ConfigCache`]
//! sits in front of a backend and decides whether a stored record is still
//! fresh: a record is dropped once any tracked source file (the "master
//! files") has a modification time newer than the record, or once its
//! optional lifetime has run out.
//!
//! Backends are picked by [`BackendKind`] and built by [`open_backend`]:
//!
//! | kind     | options                                  |
//! |----------|------------------------------------------|
//! | `file`   | `cache_dir`, `file_name_prefix`          |
//! | `memory` | none                                     |

mod error;
mod file;
mod frontend;
mod lock;
mod memory;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub use error::CacheError;
pub use file::{FileBackend, FileBackendOptions, DEFAULT_FILE_NAME_PREFIX};
pub use frontend::{CachePolicy, ConfigCache, MasterFilesMode};
pub(crate) use frontend::validate_key;
pub use lock::rebuild_lock;
pub use memory::MemoryBackend;

/// A stored snapshot. `written_at` is the freshness watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: String,
    pub written_at: SystemTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<SystemTime>,
    /// Files the snapshot was built from, in merge order.
    #[serde(default)]
    pub master_files: Vec<PathBuf>,
    /// The snapshot as a TOML document.
    pub data: String,
}

/// Key/value persistence for cache records.
pub trait CacheBackend: Send + Sync + std::fmt::Debug {
    /// Identifies the underlying storage; equal for handles sharing entries.
    fn location(&self) -> String;

    fn load(&self, key: &str) -> Result<Option<CacheRecord>, CacheError>;

    fn save(&self, record: &CacheRecord) -> Result<(), CacheError>;

    /// Returns whether an entry was removed.
    fn remove(&self, key: &str) -> Result<bool, CacheError>;
}

/// The available cache backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum BackendKind {
    #[default]
    File,
    Memory,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            _ => Err(CacheError::UnknownBackend(s.to_string())),
        }
    }
}

impl TryFrom<String> for BackendKind {
    type Error = CacheError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Builds the backend selected by `kind` from its options table.
pub fn open_backend(
    kind: BackendKind,
    options: &toml::Table,
) -> Result<Box<dyn CacheBackend>, CacheError> {
    match kind {
        BackendKind::File => {
            let options: FileBackendOptions = toml::Value::Table(options.clone())
                .try_into()
                .map_err(|e: toml::de::Error| CacheError::InvalidOptions {
                    backend: "file",
                    message: e.to_string(),
                })?;
            Ok(Box::new(FileBackend::new(options)?))
        }
        BackendKind::Memory => {
            if !options.is_empty() {
                tracing::warn!("memory cache backend ignores its options");
            }
            Ok(Box::new(MemoryBackend::new()))
        }
    }
}
