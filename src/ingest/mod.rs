// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::ingest::types::Record;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_fetch_total", "Feed fetch attempts.");
        describe_counter!("feed_fetch_errors_total", "Feed fetch/HTTP failures.");
        describe_histogram!("feed_fetch_ms", "Feed fetch time in milliseconds.");
        describe_counter!("ingest_rows_parsed_total", "Data rows kept after parsing.");
        describe_counter!(
            "ingest_rows_dropped_total",
            "Data rows dropped for an empty timestamp."
        );
        describe_counter!(
            "store_stale_responses_total",
            "Fetch responses discarded because a newer one was already applied."
        );
        describe_gauge!("store_records", "Records currently held by the store.");
        describe_gauge!("store_last_update_ts", "Unix ts of the last applied fetch.");
        describe_counter!("refresh_ticks_total", "Refresh scheduler ticks.");
        describe_gauge!(
            "dashboard_refresh_interval_secs",
            "Configured refresh interval in seconds."
        );
        describe_counter!("relay_requests_total", "Requests served by the relay endpoint.");
    });
}

/// Outcome of parsing one feed body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    /// Newest first.
    pub records: Vec<Record>,
    /// Data lines seen after the header.
    pub attempted: usize,
    /// Lines dropped because the timestamp was empty.
    pub dropped: usize,
}

/// Parse one feed line. Never fails: bad or missing numeric fields become 0.
pub fn parse_row(line: &str) -> Record {
    let mut fields = line.split(',');
    let mut next = || fields.next().unwrap_or_default();

    let timestamp = next().trim().to_string();
    let seconds = lenient_uint(next());
    let cpm = lenient_uint(next());
    let avg_cpm = lenient_float(next());
    let avg_usv = lenient_float(next());
    let total_events = lenient_uint(next());

    Record {
        timestamp,
        seconds,
        cpm,
        avg_cpm,
        avg_usv,
        total_events,
    }
}

/// Parse a whole feed body: header skipped unconditionally, empty-timestamp rows
/// dropped, result reversed so the newest row comes first.
pub fn parse_feed(text: &str) -> ParseReport {
    ensure_metrics_described();

    let mut records = Vec::new();
    let mut attempted = 0usize;
    let mut dropped = 0usize;

    for line in text.trim().lines().skip(1) {
        attempted += 1;
        let rec = parse_row(line);
        if rec.timestamp.is_empty() {
            dropped += 1;
            continue;
        }
        records.push(rec);
    }
    records.reverse();

    counter!("ingest_rows_parsed_total").increment(records.len() as u64);
    counter!("ingest_rows_dropped_total").increment(dropped as u64);

    ParseReport {
        records,
        attempted,
        dropped,
    }
}

/// Leading-digits integer parse; anything without a digit prefix (or negative) is 0.
fn lenient_uint(raw: &str) -> u64 {
    let s = raw.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let digits: &str = &s[..s.bytes().take_while(u8::is_ascii_digit).count()];
    digits.parse().unwrap_or(0)
}

/// Longest numeric prefix float parse (`[digits][.digits][e[+-]digits]`).
fn lenient_float(raw: &str) -> f64 {
    let s = raw.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let b = s.as_bytes();

    let mut end = b.iter().take_while(|c| c.is_ascii_digit()).count();
    let mut mantissa_digits = end;
    if b.get(end) == Some(&b'.') {
        let frac = b[end + 1..].iter().take_while(|c| c.is_ascii_digit()).count();
        if frac > 0 || mantissa_digits > 0 {
            end += 1 + frac;
            mantissa_digits += frac;
        }
    }
    if mantissa_digits == 0 {
        return 0.0;
    }
    if matches!(b.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(b.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = b[exp_end.min(b.len())..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    let v: f64 = s[..end].parse().unwrap_or(0.0);
    if negative || !v.is_finite() {
        0.0
    } else {
        v
    }
}
