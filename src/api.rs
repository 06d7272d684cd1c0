use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA},
        StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::chart::ChartPoint;
use crate::dashboard::{Dashboard, Trigger};
use crate::history::FetchEntry;
use crate::ingest::scheduler::SchedulerHandle;
use crate::ingest::types::FeedSource;
use crate::views::{RecordPage, StatusSummary};

pub const RELAY_PATH: &str = "/api/radiation-data";
pub const RELAY_ERROR: &str = "Failed to fetch radiation data";

const NO_CACHE: [(axum::http::HeaderName, &str); 3] = [
    (CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (PRAGMA, "no-cache"),
    (EXPIRES, "0"),
];

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    /// Feed the relay endpoint forwards.
    pub upstream: Arc<dyn FeedSource>,
    // Dropped together with the last router clone, which stops the refresh loop.
    scheduler: Option<Arc<SchedulerHandle>>,
}

impl AppState {
    pub fn new(dashboard: Arc<Dashboard>, upstream: Arc<dyn FeedSource>) -> Self {
        Self {
            dashboard,
            upstream,
            scheduler: None,
        }
    }

    pub fn with_scheduler(mut self, handle: SchedulerHandle) -> Self {
        self.scheduler = Some(Arc::new(handle));
        self
    }
}

/// `/debug/*` routes are only mounted with DEBUG_ROUTES=1.
pub fn debug_routes_enabled() -> bool {
    std::env::var("DEBUG_ROUTES").ok().as_deref() == Some("1")
}

pub fn create_router(state: AppState) -> Router {
    let mut r = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(RELAY_PATH, get(relay))
        .route("/api/status", get(status))
        .route("/api/chart", get(chart))
        .route("/api/records", get(records))
        .route("/api/refresh", post(refresh));

    if debug_routes_enabled() {
        r = r.route("/debug/fetches", get(debug_fetches));
    }

    r.layer(CorsLayer::very_permissive()).with_state(state)
}

async fn relay(State(state): State<AppState>) -> Response {
    counter!("relay_requests_total").increment(1);
    match state.upstream.fetch_csv().await {
        Ok(csv) => (StatusCode::OK, [(CONTENT_TYPE, "text/csv")], NO_CACHE, csv).into_response(),
        Err(e) => {
            tracing::error!(target: "relay", error = ?e, "Error fetching radiation data");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                NO_CACHE,
                Json(serde_json::json!({ "error": RELAY_ERROR })),
            )
                .into_response()
        }
    }
}

async fn status(State(state): State<AppState>) -> Json<StatusSummary> {
    Json(state.dashboard.summary())
}

async fn chart(State(state): State<AppState>) -> Json<Vec<ChartPoint>> {
    Json(state.dashboard.chart())
}

fn first_page() -> usize {
    1
}

#[derive(Deserialize)]
struct RecordsQuery {
    #[serde(default)]
    q: String,
    #[serde(default = "first_page")]
    page: usize,
}

async fn records(
    State(state): State<AppState>,
    Query(q): Query<RecordsQuery>,
) -> Json<RecordPage> {
    Json(state.dashboard.table(&q.q, q.page))
}

async fn refresh(State(state): State<AppState>) -> Response {
    let out = state.dashboard.refresh(Trigger::Manual).await;
    let code = if out.ok {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (code, Json(out)).into_response()
}

#[derive(Deserialize)]
struct FetchLogQuery {
    limit: Option<usize>,
}

async fn debug_fetches(
    State(state): State<AppState>,
    Query(q): Query<FetchLogQuery>,
) -> Json<Vec<FetchEntry>> {
    let limit = q.limit.unwrap_or(50);
    Json(state.dashboard.fetch_log().snapshot_last_n(limit))
}
