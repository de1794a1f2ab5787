//! In-process rebuild locks.
//!
//! One mutex per (backend location, cache key). Holding it while rebuilding a
//! stale entry means concurrent callers in this process rebuild once and the
//! rest pick up the fresh entry. Other processes are not coordinated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

type LockTable = Mutex<HashMap<String, Arc<Mutex<()>>>>;

static REBUILD_LOCKS: OnceLock<LockTable> = OnceLock::new();

/// Returns the shared rebuild lock for `key` in the store at `location`.
///
/// Locks no caller holds any more are dropped from the table on each call.
pub fn rebuild_lock(location: &str, key: &str) -> Arc<Mutex<()>> {
    let table = REBUILD_LOCKS.get_or_init(LockTable::default);
    let mut locks = table.lock().unwrap_or_else(PoisonError::into_inner);
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    locks
        .entry(format!("{location}::{key}"))
        .or_default()
        .clone()
}
