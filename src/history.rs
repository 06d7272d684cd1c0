//! history.rs — bounded in-memory log of recent feed fetches, for diagnostics.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dashboard::Trigger;

#[derive(Debug, Clone, Serialize)]
pub struct FetchEntry {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub trigger: Trigger,
    pub source: &'static str,
    pub ok: bool,
    // rows kept after parsing; 0 on failure
    pub records: usize,
    pub dropped: usize,
    // false when a newer fetch had already been applied
    pub applied: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct FetchLog {
    inner: Mutex<Vec<FetchEntry>>,
    cap: usize,
}

impl FetchLog {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::with_capacity(cap.min(10_000))),
            cap: cap.clamp(1, 10_000),
        }
    }

    pub fn push(&self, entry: FetchEntry) {
        let mut v = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        v.push(entry);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    /// Oldest first.
    pub fn snapshot_last_n(&self, n: usize) -> Vec<FetchEntry> {
        let v = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }
}
