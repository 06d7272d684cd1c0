// tests/e2e_smoke.rs
//
// Two-row feed through refresh -> store -> status/table/chart.

mod common;

use axum::http::StatusCode;
use common::{body_json, fixture_router, get, post, FEED};

#[tokio::test]
async fn two_row_feed_yields_elevated_newest_first() {
    let (app, _dashboard) = fixture_router(FEED);

    let resp = post(&app, "/api/refresh").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let out = body_json(resp).await;
    assert_eq!(out["ok"], true);
    assert_eq!(out["applied"], true);
    assert_eq!(out["records"], 2);
    assert_eq!(out["trigger"], "manual");

    let status = body_json(get(&app, "/api/status").await).await;
    assert_eq!(status["status"], "elevated");
    assert_eq!(status["color"], "warning");
    assert_eq!(status["current_cpm"], 22);
    assert_eq!(status["avg_cpm"], "19.00");
    assert_eq!(status["avg_usv"], "0.550");
    assert_eq!(status["latest_timestamp"], "01/06/2024 10:01:00");
    assert_eq!(status["loading"], false);
    assert!(status["error"].is_null());
    assert!(status["last_update"].is_string());

    let table = body_json(get(&app, "/api/records").await).await;
    let rows = table["items"].as_array().expect("items array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["timestamp"], "01/06/2024 10:01:00");
    assert_eq!(rows[0]["cpm"], 22);
    assert_eq!(rows[0]["avg_usv"], "0.550");
    assert_eq!(rows[1]["timestamp"], "01/06/2024 10:00:00");
    assert_eq!(rows[1]["cpm"], 20);
    assert_eq!(rows[1]["avg_usv"], "0.120");
    assert_eq!(rows[1]["status"], "normal");

    let chart = body_json(get(&app, "/api/chart").await).await;
    let pts = chart.as_array().expect("chart array");
    assert_eq!(pts[0]["time"], "10:00");
    assert_eq!(pts[1]["time"], "10:01");
}
