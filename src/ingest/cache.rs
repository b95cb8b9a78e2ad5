// src/ingest/cache.rs
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::ingest::types::Item;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub data: Vec<Item>,
    pub written_at_millis: i64,
    pub consecutive_failure_count: u32,
}

/// In-memory keyed store shared by callers and the refresh scheduler.
/// A single mutex guards the map; it is never held across an await.
#[derive(Debug, Default)]
pub struct CacheStore {
    inner: Mutex<HashMap<String, CacheEntry>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    pub fn read(&self, key: &str) -> Option<CacheEntry> {
        self.lock().get(key).cloned()
    }

    pub fn write(&self, key: &str, data: Vec<Item>, success: bool) {
        self.write_at(key, data, success, now_millis());
    }

    /// Success replaces data, stamps `now` and resets the failure count.
    /// Failure only bumps the count; data and timestamp stay as they were.
    pub fn write_at(&self, key: &str, data: Vec<Item>, success: bool, now: i64) {
        let mut map = self.lock();
        if success {
            map.insert(
                key.to_string(),
                CacheEntry {
                    data,
                    written_at_millis: now,
                    consecutive_failure_count: 0,
                },
            );
            return;
        }
        let entry = map.entry(key.to_string()).or_insert_with(|| CacheEntry {
            data: Vec::new(),
            written_at_millis: 0,
            consecutive_failure_count: 0,
        });
        entry.consecutive_failure_count = entry.consecutive_failure_count.saturating_add(1);
    }

    pub fn record_failure(&self, key: &str) {
        self.write(key, Vec::new(), false);
    }

    pub fn is_fresh(entry: &CacheEntry, ttl: Duration) -> bool {
        Self::is_fresh_at(entry, ttl, now_millis())
    }

    pub fn is_fresh_at(entry: &CacheEntry, ttl: Duration, now: i64) -> bool {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now.saturating_sub(entry.written_at_millis) < ttl_ms
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
