//! Storage for per-key timestamp logs.
//!
//! The limiter never touches its logs except through [`LogStore`], which owns
//! the critical section around each key. This keeps the container swappable:
//! the default [`ShardedLogStore`] locks per shard so unrelated keys proceed in
//! parallel, while [`GlobalLockLogStore`] serializes everything behind a single
//! mutex for small deployments.

use std::collections::HashMap;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::key::RequestKey;
use super::log::TimestampLog;

/// Trait for containers holding the limiter's timestamp logs.
pub trait LogStore: Send + Sync {
    /// Run `f` on the log for `key`, creating an empty log if absent.
    ///
    /// No other call for the same key may observe or mutate the log while `f`
    /// runs.
    fn with_log<R, F>(&self, key: &RequestKey, f: F) -> R
    where
        F: FnOnce(&mut TimestampLog) -> R;

    /// Current length of the log for `key`, without evicting anything.
    fn peek_len(&self, key: &RequestKey) -> Option<usize>;

    /// Keep only the entries for which `keep` returns `true`.
    ///
    /// Returns the number of entries removed.
    fn retain<F>(&self, keep: F) -> usize
    where
        F: FnMut(&RequestKey, &mut TimestampLog) -> bool;

    /// Number of keys currently tracked.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every key.
    fn clear(&self);
}

/// Sharded concurrent store backed by [`DashMap`].
#[derive(Debug, Default)]
pub struct ShardedLogStore {
    logs: DashMap<RequestKey, TimestampLog>,
}

impl ShardedLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogStore for ShardedLogStore {
    fn with_log<R, F>(&self, key: &RequestKey, f: F) -> R
    where
        F: FnOnce(&mut TimestampLog) -> R,
    {
        // Avoid cloning the key on the hot path when it already exists
        if let Some(mut log) = self.logs.get_mut(key) {
            return f(log.value_mut());
        }

        let mut log = self.logs.entry(key.clone()).or_default();
        f(log.value_mut())
    }

    fn peek_len(&self, key: &RequestKey) -> Option<usize> {
        self.logs.get(key).map(|log| log.len())
    }

    fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&RequestKey, &mut TimestampLog) -> bool,
    {
        let mut removed = 0;
        self.logs.retain(|key, log| {
            let kept = keep(key, log);
            if !kept {
                removed += 1;
            }
            kept
        });
        removed
    }

    fn len(&self) -> usize {
        self.logs.len()
    }

    fn clear(&self) {
        self.logs.clear();
    }
}

/// Store guarded by one process-wide mutex.
#[derive(Debug, Default)]
pub struct GlobalLockLogStore {
    logs: Mutex<HashMap<RequestKey, TimestampLog>>,
}

impl GlobalLockLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogStore for GlobalLockLogStore {
    fn with_log<R, F>(&self, key: &RequestKey, f: F) -> R
    where
        F: FnOnce(&mut TimestampLog) -> R,
    {
        let mut logs = self.logs.lock();
        if let Some(log) = logs.get_mut(key) {
            return f(log);
        }
        f(logs.entry(key.clone()).or_default())
    }

    fn peek_len(&self, key: &RequestKey) -> Option<usize> {
        self.logs.lock().get(key).map(|log| log.len())
    }

    fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&RequestKey, &mut TimestampLog) -> bool,
    {
        let mut logs = self.logs.lock();
        let before = logs.len();
        logs.retain(|key, log| keep(key, log));
        before - logs.len()
    }

    fn len(&self) -> usize {
        self.logs.lock().len()
    }

    fn clear(&self) {
        self.logs.lock().clear();
    }
}
