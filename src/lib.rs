// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod history;
pub mod ingest;
pub mod metrics;
pub mod views;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::MonitorConfig;
pub use crate::dashboard::{Dashboard, Trigger};
pub use crate::ingest::types::{FeedSource, Record};

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::monitor::DashboardSource;
use crate::dashboard::ViewSettings;
use crate::ingest::providers::sheet_csv::SheetCsvProvider;
use crate::ingest::scheduler::spawn_refresh_scheduler;

/// Install a tracing subscriber unless one is already set (Shuttle installs its own).
/// MONITOR_LOG_JSON=1 switches to JSON lines; RUST_LOG overrides the filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("radiation_monitor=info,warn"));
    let json = std::env::var("MONITOR_LOG_JSON").ok().as_deref() == Some("1");

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Build providers and the dashboard from config, start the refresh loop, and return the router.
/// Must be called inside a Tokio runtime.
pub fn build_app(cfg: &MonitorConfig) -> Result<Router> {
    let upstream: Arc<dyn FeedSource> = Arc::new(SheetCsvProvider::upstream(
        cfg.feed.url.clone(),
        cfg.feed.user_agent.clone(),
        cfg.feed_timeout(),
    )?);

    let dashboard_source: Arc<dyn FeedSource> = match cfg.dashboard.source {
        DashboardSource::Upstream => upstream.clone(),
        DashboardSource::Relay => Arc::new(SheetCsvProvider::relay(
            cfg.dashboard.relay_url.clone(),
            cfg.feed_timeout(),
        )?),
    };

    let settings = ViewSettings {
        thresholds: cfg.dashboard.thresholds,
        page_size: cfg.dashboard.page_size,
        chart_window: cfg.dashboard.chart_window,
    };
    // Recorder first, so the initial refresh is already counted.
    let metrics = if api::debug_routes_enabled() {
        Some(crate::metrics::Metrics::init(
            cfg.dashboard.refresh_interval_secs,
        )?)
    } else {
        None
    };

    let dashboard = Arc::new(Dashboard::new(dashboard_source, settings));
    let scheduler = spawn_refresh_scheduler(dashboard.clone(), cfg.refresh_interval());

    info!(
        source = ?cfg.dashboard.source,
        interval_secs = cfg.dashboard.refresh_interval_secs,
        "dashboard started"
    );

    let state = AppState::new(dashboard, upstream).with_scheduler(scheduler);
    let mut router = api::create_router(state);

    if let Some(m) = metrics {
        router = router.merge(m.router());
    }
    Ok(router)
}

/// Load config (file + env overrides) and build the full app.
pub async fn app() -> Result<Router> {
    let cfg = MonitorConfig::load_default()?;
    build_app(&cfg)
}
