//! Freshness-checked cache of merged config tables.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::Deserialize;
use toml::Table;

use super::{CacheBackend, CacheError, CacheRecord};

/// How tracked file modifications invalidate an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasterFilesMode {
    /// Stale as soon as any tracked file changed.
    #[default]
    Or,
    /// Stale only once every tracked file changed.
    And,
}

/// Rules applied by [`ConfigCache`] on every read and write.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Files whose modification time invalidates an entry.
    pub master_files: Vec<PathBuf>,
    pub master_files_mode: MasterFilesMode,
    pub automatic_serialization: bool,
    /// `None` means entries never expire by age.
    pub lifetime: Option<Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            master_files: Vec::new(),
            master_files_mode: MasterFilesMode::Or,
            automatic_serialization: true,
            lifetime: None,
        }
    }
}

/// Stores merged config tables in a backend and treats entries as absent
/// once a tracked file is newer than the entry or its lifetime ran out.
#[derive(Debug)]
pub struct ConfigCache {
    backend: Box<dyn CacheBackend>,
    policy: CachePolicy,
}

impl ConfigCache {
    pub fn new(backend: Box<dyn CacheBackend>, policy: CachePolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn backend(&self) -> &dyn CacheBackend {
        self.backend.as_ref()
    }

    /// Returns the write time of a fresh entry without decoding it.
    pub fn test(&self, key: &str) -> Result<Option<SystemTime>, CacheError> {
        validate_key(key)?;
        Ok(self
            .backend
            .load(key)?
            .filter(|record| self.is_fresh(record))
            .map(|record| record.written_at))
    }

    /// Loads the table stored under `key`, or `None` if missing or stale.
    pub fn load(&self, key: &str) -> Result<Option<Table>, CacheError> {
        validate_key(key)?;
        if !self.policy.automatic_serialization {
            return Err(CacheError::SerializationDisabled);
        }

        let Some(record) = self.backend.load(key)? else {
            tracing::debug!("cache entry '{}' not found", key);
            return Ok(None);
        };
        if !self.is_fresh(&record) {
            tracing::debug!("cache entry '{}' is stale", key);
            return Ok(None);
        }

        toml::from_str(&record.data)
            .map(Some)
            .map_err(|e: toml::de::Error| CacheError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    /// Stores `table` under `key`, stamped with the current time.
    pub fn save(&self, key: &str, table: &Table) -> Result<(), CacheError> {
        self.save_as_of(key, table, SystemTime::now())
    }

    /// Stores `table` under `key`, stamped with `written_at`.
    ///
    /// Files modified after `written_at` invalidate the entry, so stamping with
    /// the time the sources were read catches edits made while merging.
    pub fn save_as_of(
        &self,
        key: &str,
        table: &Table,
        written_at: SystemTime,
    ) -> Result<(), CacheError> {
        validate_key(key)?;
        if !self.policy.automatic_serialization {
            return Err(CacheError::SerializationDisabled);
        }

        // TOML keeps non-finite floats and datetimes that JSON would lose.
        let data = toml::to_string(table).map_err(CacheError::Encode)?;
        let record = CacheRecord {
            key: key.to_string(),
            written_at,
            expires_at: self
                .policy
                .lifetime
                .and_then(|lifetime| written_at.checked_add(lifetime)),
            master_files: self.policy.master_files.clone(),
            data,
        };
        self.backend.save(&record)
    }

    pub fn remove(&self, key: &str) -> Result<bool, CacheError> {
        validate_key(key)?;
        self.backend.remove(key)
    }

    fn is_fresh(&self, record: &CacheRecord) -> bool {
        if let Some(expires_at) = record.expires_at {
            if SystemTime::now() >= expires_at {
                return false;
            }
        }

        // Built from a different file set (files added, removed or reordered).
        if record.master_files != self.policy.master_files {
            return false;
        }

        // Unreadable tracked files count as modified.
        let modified = |path: &PathBuf| match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime > record.written_at,
            Err(_) => true,
        };

        let files = &self.policy.master_files;
        if files.is_empty() {
            return true;
        }
        match self.policy.master_files_mode {
            MasterFilesMode::Or => !files.iter().any(modified),
            MasterFilesMode::And => !files.iter().all(modified),
        }
    }
}

/// Keys become file names in some backends.
pub(crate) fn validate_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}
