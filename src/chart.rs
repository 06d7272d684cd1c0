//! Chart series: the newest records in plotting order with axis-friendly labels.

use chrono::NaiveDate;
use serde::Serialize;

use crate::ingest::types::Record;

/// Points plotted on the chart.
pub const CHART_WINDOW: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Axis label, `HH:MM`.
    pub time: String,
    pub timestamp: String,
    pub cpm: u64,
    pub avg_cpm: f64,
    pub avg_usv: f64,
}

/// Take the `window` newest records (store is newest-first) and return them oldest-to-newest.
pub fn project_chart(records: &[Record], window: usize) -> Vec<ChartPoint> {
    records
        .iter()
        .take(window)
        .rev()
        .map(|r| ChartPoint {
            time: format_axis_time(&r.timestamp),
            timestamp: r.timestamp.clone(),
            cpm: r.cpm,
            avg_cpm: r.avg_cpm,
            avg_usv: r.avg_usv,
        })
        .collect()
}

/// `DD/MM/YYYY HH:mm:ss` -> `HH:MM`.
///
/// The day-first date is split by hand; generic parsers guess month-first on slashes.
/// Falls back to the first five characters of the time part, then to the raw text.
pub fn format_axis_time(timestamp: &str) -> String {
    match decompose(timestamp) {
        Some(dt) => dt.format("%H:%M").to_string(),
        None => fallback_time(timestamp),
    }
}

fn decompose(timestamp: &str) -> Option<chrono::NaiveDateTime> {
    let (date_part, time_part) = timestamp.trim().split_once(' ')?;

    let mut d = date_part.split('/');
    let day: u32 = d.next()?.trim().parse().ok()?;
    let month: u32 = d.next()?.trim().parse().ok()?;
    let year: i32 = d.next()?.trim().parse().ok()?;

    let mut t = time_part.trim().split(':');
    let hour: u32 = t.next()?.parse().ok()?;
    let minute: u32 = t.next()?.parse().ok()?;
    let second: u32 = t.next()?.parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

fn fallback_time(timestamp: &str) -> String {
    match timestamp.split(' ').nth(1) {
        Some(time) if !time.is_empty() => time.chars().take(5).collect(),
        _ => timestamp.to_string(),
    }
}
