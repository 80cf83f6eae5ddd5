//! Role → grant-list cache owned by the evaluator.
//! Entries are replaced wholesale and expire after a fixed timeout.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;

use crate::model::Grant;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub role: String,
    pub grants: Arc<Vec<Grant>>,
    pub fetched_at: Instant,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool { now < self.expires_at }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug)]
pub struct RoleCache {
    timeout: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RoleCache {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, entries: RwLock::new(HashMap::new()), hits: AtomicU64::new(0), misses: AtomicU64::new(0) }
    }

    pub fn timeout(&self) -> Duration { self.timeout }

    /// Fresh entry for `role`, if any. Expired entries count as misses and are dropped.
    pub fn get(&self, role: &str) -> Option<CacheEntry> {
        let now = Instant::now();
        let hit = self.entries.read().get(role).filter(|e| e.is_fresh(now)).cloned();
        match hit {
            Some(e) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(e)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let mut w = self.entries.write();
                if w.get(role).is_some_and(|e| !e.is_fresh(now)) { w.remove(role); }
                None
            }
        }
    }

    /// Store a freshly fetched grant list, replacing any previous entry.
    pub fn put(&self, role: &str, grants: Vec<Grant>) -> CacheEntry {
        let now = Instant::now();
        let entry = CacheEntry {
            role: role.to_string(),
            grants: Arc::new(grants),
            fetched_at: now,
            expires_at: now + self.timeout,
        };
        self.entries.write().insert(role.to_string(), entry.clone());
        entry
    }

    pub fn invalidate(&self, role: &str) -> bool { self.entries.write().remove(role).is_some() }

    pub fn invalidate_all(&self) -> usize {
        let mut w = self.entries.write();
        let n = w.len();
        w.clear();
        n
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().len(),
        }
    }
}
