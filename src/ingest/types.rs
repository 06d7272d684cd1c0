// src/ingest/types.rs
use anyhow::Result;

/// One sensor observation row from the feed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Record {
    pub timestamp: String,      // "DD/MM/YYYY HH:mm:ss", never empty
    pub seconds: u64,           // elapsed seconds since an external reference
    pub cpm: u64,               // instantaneous counts per minute
    pub avg_cpm: f64,           // smoothed counts per minute
    pub avg_usv: f64,           // smoothed dose rate, μSv/h
    pub total_events: u64,      // cumulative count since sensor start
}

impl Record {
    /// Avg CPM as shown in the table (2 decimals).
    pub fn avg_cpm_display(&self) -> String {
        to_fixed(self.avg_cpm, 2)
    }

    /// Dose rate as shown in the table (3 decimals).
    pub fn avg_usv_display(&self) -> String {
        to_fixed(self.avg_usv, 3)
    }
}

// Enough fraction digits to print any finite f64 exactly.
const EXACT_DIGITS: usize = 1100;

/// Fixed-point formatting that rounds exact halfway values up (away from zero),
/// the way browser `toFixed` does. `format!` would round those ties to even.
pub fn to_fixed(v: f64, digits: usize) -> String {
    if v < 0.0 {
        return format!("-{}", to_fixed(-v, digits));
    }
    let exact = format!("{:.*}", EXACT_DIGITS.max(digits + 1), v);
    let Some((int_part, frac)) = exact.split_once('.') else {
        return format!("{:.*}", digits, v);
    };
    let (kept, rest) = frac.split_at(digits);
    let tie = rest.starts_with('5') && rest[1..].bytes().all(|b| b == b'0');
    if !tie {
        return format!("{:.*}", digits, v);
    }

    let mut buf: Vec<u8> = int_part.bytes().chain(kept.bytes()).collect();
    let mut i = buf.len();
    loop {
        if i == 0 {
            buf.insert(0, b'1');
            break;
        }
        i -= 1;
        if buf[i] == b'9' {
            buf[i] = b'0';
        } else {
            buf[i] += 1;
            break;
        }
    }
    let text: String = buf.iter().map(|&b| b as char).collect();
    if digits == 0 {
        return text;
    }
    let (whole, fraction) = text.split_at(text.len() - digits);
    format!("{whole}.{fraction}")
}

/// Anything that can hand back the raw CSV text of the feed.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_csv(&self) -> Result<String>;
    fn name(&self) -> &'static str;
}
