// tests/relay_upstream.rs
//
// Real sockets: a local Axum server stands in for the spreadsheet export, our router
// relays it, and a dashboard reads through the relay over HTTP.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Router,
};
use common::FEED;
use radiation_monitor::dashboard::{Dashboard, ViewSettings};
use radiation_monitor::ingest::providers::sheet_csv::SheetCsvProvider;
use radiation_monitor::{AppState, FeedSource, Trigger};

type Seen = Arc<Mutex<Vec<(Option<String>, Option<String>)>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Fake spreadsheet: `/export` serves the fixture, `/down` fails.
async fn spawn_sheet(seen: Seen) -> String {
    let app = Router::new()
        .route(
            "/export",
            get(move |headers: HeaderMap| {
                let seen = seen.clone();
                async move {
                    let ua = headers
                        .get(header::USER_AGENT)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let cc = headers
                        .get(header::CACHE_CONTROL)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    seen.lock().unwrap().push((ua, cc));
                    FEED
                }
            }),
        )
        .route("/down", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    serve(app).await
}

fn upstream(url: String) -> Arc<dyn FeedSource> {
    Arc::new(
        SheetCsvProvider::upstream(url, "TestAgent/1.0", Some(Duration::from_secs(5))).unwrap(),
    )
}

#[tokio::test]
async fn upstream_gets_user_agent_and_no_cache() {
    let seen: Seen = Arc::default();
    let base = spawn_sheet(seen.clone()).await;

    let body = upstream(format!("{base}/export")).fetch_csv().await.unwrap();
    assert_eq!(body, FEED);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0.as_deref(), Some("TestAgent/1.0"));
    assert_eq!(seen[0].1.as_deref(), Some("no-cache"));
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let base = spawn_sheet(Arc::default()).await;
    let err = upstream(format!("{base}/down")).fetch_csv().await.unwrap_err();
    assert!(err.to_string().contains("503"), "got: {err}");
}

#[tokio::test]
async fn dashboard_reads_through_relay() {
    let base = spawn_sheet(Arc::default()).await;
    let up = upstream(format!("{base}/export"));

    // relay service: dashboard state is irrelevant here, only the relay route is used
    let idle = Arc::new(Dashboard::new(up.clone(), ViewSettings::default()));
    let relay_base = serve(radiation_monitor::api::create_router(AppState::new(idle, up))).await;

    let via_relay: Arc<dyn FeedSource> = Arc::new(
        SheetCsvProvider::relay(
            format!("{relay_base}/api/radiation-data"),
            Some(Duration::from_secs(5)),
        )
        .unwrap(),
    );
    let d = Dashboard::new(via_relay, ViewSettings::default());
    let out = d.refresh(Trigger::Initial).await;
    assert!(out.ok && out.applied, "{out:?}");
    assert_eq!(d.snapshot().records[0].cpm, 22);
}

#[tokio::test]
async fn relay_failure_surfaces_in_dashboard_error() {
    let base = spawn_sheet(Arc::default()).await;
    let up = upstream(format!("{base}/down"));
    let idle = Arc::new(Dashboard::new(up.clone(), ViewSettings::default()));
    let relay_base = serve(radiation_monitor::api::create_router(AppState::new(idle, up))).await;

    let via_relay: Arc<dyn FeedSource> = Arc::new(
        SheetCsvProvider::relay(format!("{relay_base}/api/radiation-data"), None).unwrap(),
    );
    let d = Dashboard::new(via_relay, ViewSettings::default());
    let out = d.refresh(Trigger::Manual).await;
    assert!(!out.ok);
    assert!(d.error().unwrap().contains("500"));
    assert!(d.snapshot().records.is_empty());
    assert!(!d.is_refreshing());
}
