//! # Dashboard view-model
//! Owns the record store and the UI flags for one dashboard lifetime.
//!
//! Every fetch takes a ticket from a monotonically increasing sequence. A parsed
//! response only replaces the store when its ticket is newer than the one already
//! applied, so a slow timer fetch can never clobber a newer manual refresh.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;

use crate::chart::{project_chart, ChartPoint};
use crate::history::{FetchEntry, FetchLog};
use crate::ingest::parse_feed;
use crate::ingest::types::{FeedSource, Record};
use crate::views::{self, RecordPage, StatusSummary, Thresholds};

/// What started a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Initial,
    Timer,
    Manual,
}

/// Immutable view of the store at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Newest first.
    pub records: Arc<Vec<Record>>,
    pub last_update: Option<DateTime<Utc>>,
    /// Ticket of the fetch that produced this snapshot (0 = never filled).
    pub seq: u64,
}

/// Newest-first record list, replaced wholesale by the newest fetch to resolve.
#[derive(Debug, Default)]
pub struct RecordStore {
    next_seq: AtomicU64,
    inner: RwLock<Snapshot>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next fetch ticket (starts at 1).
    pub fn next_ticket(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the contents if `seq` is newer than what is held. Returns whether it was applied.
    pub fn apply(&self, seq: u64, records: Vec<Record>, at: DateTime<Utc>) -> bool {
        let mut guard = match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if seq <= guard.seq {
            return false;
        }
        *guard = Snapshot {
            records: Arc::new(records),
            last_update: Some(at),
            seq,
        };
        true
    }

    pub fn snapshot(&self) -> Snapshot {
        match self.inner.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Result of one refresh cycle, as reported to callers and the fetch log.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub seq: u64,
    pub trigger: Trigger,
    pub ok: bool,
    pub applied: bool,
    pub records: usize,
    pub error: Option<String>,
}

/// Display knobs shared by the derived views.
#[derive(Debug, Clone, Copy)]
pub struct ViewSettings {
    pub thresholds: Thresholds,
    pub page_size: usize,
    pub chart_window: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            page_size: views::PAGE_SIZE,
            chart_window: crate::chart::CHART_WINDOW,
        }
    }
}

#[derive(Debug, Default)]
struct ErrorState {
    message: Option<String>,
    seq: u64,
}

pub struct Dashboard {
    store: RecordStore,
    source: Arc<dyn FeedSource>,
    settings: ViewSettings,
    loading: AtomicBool,
    refreshing: AtomicUsize,
    error: Mutex<ErrorState>,
    log: FetchLog,
}

/// Decrements the in-flight manual refresh count even if the refresh future is dropped.
struct RefreshingGuard<'a>(&'a AtomicUsize);

impl Drop for RefreshingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Dashboard {
    pub fn new(source: Arc<dyn FeedSource>, settings: ViewSettings) -> Self {
        Self {
            store: RecordStore::new(),
            source,
            settings,
            loading: AtomicBool::new(true),
            refreshing: AtomicUsize::new(0),
            error: Mutex::new(ErrorState::default()),
            log: FetchLog::with_capacity(200),
        }
    }

    /// Fetch, parse, and (if still the newest) apply. Failures leave the store untouched.
    pub async fn refresh(&self, trigger: Trigger) -> RefreshOutcome {
        let seq = self.store.next_ticket();
        let _refreshing = (trigger == Trigger::Manual).then(|| {
            self.refreshing.fetch_add(1, Ordering::SeqCst);
            RefreshingGuard(&self.refreshing)
        });

        let outcome = match self.source.fetch_csv().await {
            Ok(body) => {
                let report = parse_feed(&body);
                let kept = report.records.len();
                let dropped = report.dropped;
                let now = Utc::now();
                let applied = self.store.apply(seq, report.records, now);
                if applied {
                    self.set_error(seq, None);
                    gauge!("store_records").set(kept as f64);
                    gauge!("store_last_update_ts").set(now.timestamp() as f64);
                    tracing::info!(
                        target: "dashboard",
                        seq,
                        ?trigger,
                        records = kept,
                        dropped,
                        "store replaced"
                    );
                } else {
                    counter!("store_stale_responses_total").increment(1);
                    tracing::debug!(target: "dashboard", seq, ?trigger, "stale response discarded");
                }
                self.log.push(FetchEntry {
                    seq,
                    at: now,
                    trigger,
                    source: self.source.name(),
                    ok: true,
                    records: kept,
                    dropped,
                    applied,
                    error: None,
                });
                RefreshOutcome {
                    seq,
                    trigger,
                    ok: true,
                    applied,
                    records: kept,
                    error: None,
                }
            }
            Err(e) => {
                let msg = e.to_string();
                tracing::warn!(target: "dashboard", seq, ?trigger, error = ?e, "refresh failed");
                self.set_error(seq, Some(msg.clone()));
                self.log.push(FetchEntry {
                    seq,
                    at: Utc::now(),
                    trigger,
                    source: self.source.name(),
                    ok: false,
                    records: 0,
                    dropped: 0,
                    applied: false,
                    error: Some(msg.clone()),
                });
                RefreshOutcome {
                    seq,
                    trigger,
                    ok: false,
                    applied: false,
                    records: 0,
                    error: Some(msg),
                }
            }
        };

        self.loading.store(false, Ordering::SeqCst);
        outcome
    }

    // Only the newest settled fetch may set or clear the banner.
    fn set_error(&self, seq: u64, message: Option<String>) {
        let mut st = match self.error.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if seq > st.seq {
            st.seq = seq;
            st.message = message;
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst) > 0
    }

    pub fn error(&self) -> Option<String> {
        match self.error.lock() {
            Ok(g) => g.message.clone(),
            Err(poisoned) => poisoned.into_inner().message.clone(),
        }
    }

    pub fn fetch_log(&self) -> &FetchLog {
        &self.log
    }

    pub fn summary(&self) -> StatusSummary {
        let snap = self.snapshot();
        views::summarize(
            &snap.records,
            snap.last_update,
            &self.settings.thresholds,
            self.is_loading(),
            self.is_refreshing(),
            self.error(),
        )
    }

    pub fn chart(&self) -> Vec<ChartPoint> {
        project_chart(&self.snapshot().records, self.settings.chart_window)
    }

    pub fn table(&self, query: &str, page: usize) -> RecordPage {
        let snap = self.snapshot();
        views::record_page(
            &snap.records,
            query,
            page,
            self.settings.page_size,
            &self.settings.thresholds,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::providers::sheet_csv::SheetCsvProvider;
    use crate::views::RadiationStatus;

    fn rec(ts: &str) -> Record {
        Record {
            timestamp: ts.to_string(),
            seconds: 0,
            cpm: 0,
            avg_cpm: 0.0,
            avg_usv: 0.0,
            total_events: 0,
        }
    }

    #[test]
    fn tickets_are_monotonic() {
        let s = RecordStore::new();
        assert_eq!(s.next_ticket(), 1);
        assert_eq!(s.next_ticket(), 2);
        assert_eq!(s.snapshot().seq, 0);
        assert!(s.snapshot().last_update.is_none());
    }

    #[test]
    fn older_ticket_never_overwrites_newer() {
        let s = RecordStore::new();
        let t1 = s.next_ticket();
        let t2 = s.next_ticket();
        assert!(s.apply(t2, vec![rec("new")], Utc::now()));
        assert!(!s.apply(t1, vec![rec("old"), rec("older")], Utc::now()));
        let snap = s.snapshot();
        assert_eq!(snap.records.len(), 1);
        assert_eq!(snap.records[0].timestamp, "new");
        assert_eq!(snap.seq, t2);
    }

    #[test]
    fn apply_replaces_wholesale() {
        let s = RecordStore::new();
        let t1 = s.next_ticket();
        assert!(s.apply(t1, vec![rec("a"), rec("b")], Utc::now()));
        let t2 = s.next_ticket();
        assert!(s.apply(t2, vec![], Utc::now()));
        assert!(s.snapshot().records.is_empty());
    }

    #[tokio::test]
    async fn fresh_dashboard_is_loading_and_unknown() {
        let src = Arc::new(SheetCsvProvider::from_fixture(""));
        let d = Dashboard::new(src, ViewSettings::default());
        assert!(d.is_loading());
        assert!(!d.is_refreshing());
        assert_eq!(d.summary().status, RadiationStatus::Unknown);

        let out = d.refresh(Trigger::Initial).await;
        assert!(out.ok && out.applied);
        assert!(!d.is_loading());
        assert_eq!(d.fetch_log().snapshot_last_n(5).len(), 1);
    }
}
