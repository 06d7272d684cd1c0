// src/config/monitor.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::views::Thresholds;

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const ENV_FEED_URL: &str = "FEED_URL";
pub const ENV_FEED_USER_AGENT: &str = "FEED_USER_AGENT";
pub const ENV_REFRESH_INTERVAL_SECS: &str = "REFRESH_INTERVAL_SECS";

pub const DEFAULT_FEED_URL: &str =
    "https://docs.google.com/spreadsheets/d/139PrOyrT4Nuwv_pLWpRdXvaS-J5BIRywC__49I8KCxE/export?format=csv";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_interval_secs() -> u64 {
    30
}
fn default_relay_url() -> String {
    "http://127.0.0.1:8000/api/radiation-data".to_string()
}
fn default_page_size() -> usize {
    crate::views::PAGE_SIZE
}
fn default_chart_window() -> usize {
    crate::chart::CHART_WINDOW
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Public CSV export of the spreadsheet.
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout; `None` leaves the transport default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

/// Where the dashboard pulls its CSV from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DashboardSource {
    /// Call the upstream feed directly (in-process relay).
    #[default]
    Upstream,
    /// Go through a relay endpoint over HTTP.
    Relay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub source: DashboardSource,
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    #[serde(default = "default_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_chart_window")]
    pub chart_window: usize,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: DashboardSource::default(),
            relay_url: default_relay_url(),
            refresh_interval_secs: default_interval_secs(),
            page_size: default_page_size(),
            chart_window: default_chart_window(),
            thresholds: Thresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl MonitorConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: MonitorConfig = if ext == "json" {
            serde_json::from_str(&content).context("parsing monitor config json")?
        } else {
            toml::from_str(&content).context("parsing monitor config toml")?
        };
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $MONITOR_CONFIG_PATH
    /// 2) config/monitor.toml
    /// 3) config/monitor.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new("config/monitor.toml").exists() {
            Self::load_from_file("config/monitor.toml")?
        } else if Path::new("config/monitor.json").exists() {
            Self::load_from_file("config/monitor.json")?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides().sanitized())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(url) = non_empty_env(ENV_FEED_URL) {
            self.feed.url = url;
        }
        if let Some(ua) = non_empty_env(ENV_FEED_USER_AGENT) {
            self.feed.user_agent = ua;
        }
        if let Some(secs) = non_empty_env(ENV_REFRESH_INTERVAL_SECS).and_then(|v| v.parse().ok()) {
            self.dashboard.refresh_interval_secs = secs;
        }
        self
    }

    fn sanitized(mut self) -> Self {
        let d = &mut self.dashboard;
        d.refresh_interval_secs = d.refresh_interval_secs.max(1);
        d.page_size = d.page_size.max(1);
        d.chart_window = d.chart_window.max(1);
        let t = &mut d.thresholds;
        if !(t.elevated.is_finite() && t.high.is_finite()) {
            *t = Thresholds::default();
        }
        if t.elevated > t.high {
            // swap to keep a valid ordering
            std::mem::swap(&mut t.elevated, &mut t.high);
        }
        if self.feed.timeout_secs == Some(0) {
            self.feed.timeout_secs = None;
        }
        self
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard.refresh_interval_secs)
    }

    pub fn feed_timeout(&self) -> Option<Duration> {
        self.feed.timeout_secs.map(Duration::from_secs)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
