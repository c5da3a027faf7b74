//! TTL-bounded in-memory cache for derived views.
//!
//! Keyed by calendar-date strings so there is exactly one entry per day
//! regardless of intra-day call frequency. Entries are replaced wholesale
//! on refresh, never partially patched. `invalidate_all` is the only
//! stop-the-world mutation; any component that writes events invalidates
//! rather than reads.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::NaiveDate;

use crate::models::DailyStatusSnapshot;

struct CacheEntry<T> {
    captured_at: Instant,
    payload: T,
}

/// TTL cache over a cloneable payload.
///
/// The full-roster status view uses [`SnapshotCache`]; single-category
/// lookups use a second instance with a shorter TTL.
pub struct TtlCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

/// The daily status cache: one roster-wide payload per calendar date.
pub type SnapshotCache = TtlCache<Vec<DailyStatusSnapshot>>;

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Canonical cache key for a calendar date.
    pub fn date_key(date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Return the payload if a fresh entry exists.
    pub fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(key)?;
        if entry.captured_at.elapsed() < self.ttl {
            Some(entry.payload.clone())
        } else {
            None
        }
    }

    /// Replace the entry for `key` wholesale, stamping a new capture time.
    pub fn put(&self, key: &str, payload: T) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key.to_string(),
                CacheEntry {
                    captured_at: Instant::now(),
                    payload,
                },
            );
        }
    }

    /// Serve the cached payload when fresh and `force` is false;
    /// otherwise run `compute` and replace the entry.
    pub async fn refresh<F, Fut, E>(&self, key: &str, force: bool, compute: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !force {
            if let Some(payload) = self.get(key) {
                return Ok(payload);
            }
        }
        let payload = compute().await?;
        self.put(key, payload.clone());
        Ok(payload)
    }

    /// Drop every entry. Called after any successful write mutation so
    /// stale post-write state is never served past a best-effort refresh.
    pub fn invalidate_all(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
