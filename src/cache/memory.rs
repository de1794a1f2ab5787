use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{CacheBackend, CacheError, CacheRecord};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// In-process cache backend. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    id: u64,
    entries: Arc<Mutex<HashMap<String, CacheRecord>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            entries: Arc::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheRecord>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for MemoryBackend {
    fn location(&self) -> String {
        format!("memory:{}", self.id)
    }

    fn load(&self, key: &str) -> Result<Option<CacheRecord>, CacheError> {
        Ok(self.entries().get(key).cloned())
    }

    fn save(&self, record: &CacheRecord) -> Result<(), CacheError> {
        self.entries().insert(record.key.clone(), record.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries().remove(key).is_some())
    }
}
