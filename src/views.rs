//! Derived views over the record store: status classification, search, pagination.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::ingest::types::Record;

/// Rows per table page.
pub const PAGE_SIZE: usize = 20;

/// Dose-rate thresholds in μSv/h (strictly greater than).
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, Serialize)]
#[serde(default)]
pub struct Thresholds {
    pub elevated: f64,
    pub high: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            elevated: 0.5,
            high: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RadiationStatus {
    Unknown,
    Normal,
    Elevated,
    High,
}

impl RadiationStatus {
    /// Classify the newest record; `None` means the store is empty.
    pub fn classify(latest: Option<&Record>, t: &Thresholds) -> Self {
        match latest {
            None => Self::Unknown,
            Some(r) => Self::from_usv(r.avg_usv, t),
        }
    }

    pub fn from_usv(usv: f64, t: &Thresholds) -> Self {
        if usv > t.high {
            Self::High
        } else if usv > t.elevated {
            Self::Elevated
        } else {
            Self::Normal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Normal => "normal",
            Self::Elevated => "elevated",
            Self::High => "high",
        }
    }

    /// Badge colour name for the header status badge.
    pub fn color(self) -> &'static str {
        match self {
            Self::Unknown => "secondary",
            Self::Normal => "success",
            Self::Elevated => "warning",
            Self::High => "destructive",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub status: RadiationStatus,
    pub color: &'static str,
    pub current_cpm: Option<u64>,
    pub avg_cpm: Option<String>,
    pub avg_usv: Option<String>,
    pub latest_timestamp: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    /// Local wall-clock time of the last update, `HH:MM:SS`.
    pub last_update_time: Option<String>,
    pub record_count: usize,
    pub loading: bool,
    pub refreshing: bool,
    pub error: Option<String>,
}

pub fn summarize(
    records: &[Record],
    last_update: Option<DateTime<Utc>>,
    t: &Thresholds,
    loading: bool,
    refreshing: bool,
    error: Option<String>,
) -> StatusSummary {
    let latest = records.first();
    let status = RadiationStatus::classify(latest, t);
    StatusSummary {
        status,
        color: status.color(),
        current_cpm: latest.map(|r| r.cpm),
        avg_cpm: latest.map(Record::avg_cpm_display),
        avg_usv: latest.map(Record::avg_usv_display),
        latest_timestamp: latest.map(|r| r.timestamp.clone()),
        last_update,
        last_update_time: last_update
            .map(|at| at.with_timezone(&Local).format("%H:%M:%S").to_string()),
        record_count: records.len(),
        loading,
        refreshing,
        error,
    }
}

/// Case-insensitive substring match on the timestamp. Empty query keeps everything.
pub fn filter_records<'a>(records: &'a [Record], query: &str) -> Vec<&'a Record> {
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|r| r.timestamp.to_lowercase().contains(&needle))
        .collect()
}

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, after clamping.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

pub fn total_pages(n: usize, page_size: usize) -> usize {
    n.div_ceil(page_size.max(1))
}

/// Slice out a 1-based page; the index is clamped into `1..=max(total_pages, 1)`.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let size = page_size.max(1);
    let pages = total_pages(items.len(), size);
    let page = page.clamp(1, pages.max(1));
    let start = ((page - 1) * size).min(items.len());
    let end = (start + size).min(items.len());
    Page {
        items: items[start..end].to_vec(),
        page,
        total_pages: pages,
        total_items: items.len(),
    }
}

/// Table row with the display formatting applied.
#[derive(Debug, Clone, Serialize)]
pub struct RecordRow {
    pub timestamp: String,
    pub seconds: u64,
    pub cpm: u64,
    pub avg_cpm: String,
    pub avg_usv: String,
    pub total_events: u64,
    pub status: RadiationStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordPage {
    pub query: String,
    #[serde(flatten)]
    pub page: Page<RecordRow>,
    /// Set when the page has no rows.
    pub empty_message: Option<&'static str>,
}

pub fn record_page(
    records: &[Record],
    query: &str,
    page: usize,
    page_size: usize,
    t: &Thresholds,
) -> RecordPage {
    let filtered = filter_records(records, query);
    let Page {
        items,
        page,
        total_pages,
        total_items,
    } = paginate(&filtered, page, page_size);

    let rows: Vec<RecordRow> = items
        .into_iter()
        .map(|r| RecordRow {
            timestamp: r.timestamp.clone(),
            seconds: r.seconds,
            cpm: r.cpm,
            avg_cpm: r.avg_cpm_display(),
            avg_usv: r.avg_usv_display(),
            total_events: r.total_events,
            status: RadiationStatus::from_usv(r.avg_usv, t),
        })
        .collect();

    let empty_message = match (rows.is_empty(), query.is_empty()) {
        (false, _) => None,
        (true, false) => Some("No matching records found"),
        (true, true) => Some("No data available"),
    };

    RecordPage {
        query: query.to_string(),
        page: Page {
            items: rows,
            page,
            total_pages,
            total_items,
        },
        empty_message,
    }
}
