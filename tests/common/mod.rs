// tests/common/mod.rs
// Shared helpers for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use axum::{body::Body, http::Request, Router};
use tokio::sync::oneshot;
use tower::ServiceExt as _;

use radiation_monitor::dashboard::{Dashboard, ViewSettings};
use radiation_monitor::ingest::providers::sheet_csv::SheetCsvProvider;
use radiation_monitor::{AppState, FeedSource};

pub const BODY_LIMIT: usize = 1024 * 1024;

pub const FEED: &str = include_str!("../fixtures/feed.csv");

/// Build `n` data rows, oldest first, minutes counting up from 10:00.
pub fn feed_with_rows(n: usize) -> String {
    let mut s = String::from("timestamp,seconds,cpm,avg_cpm,avg_uSv,total_events\n");
    for i in 0..n {
        s.push_str(&format!(
            "01/06/2024 {:02}:{:02}:00,60,{},18.5,0.12,{}\n",
            10 + i / 60,
            i % 60,
            i,
            1000 + i
        ));
    }
    s
}

/// Feed whose responses are released by the test, one channel per fetch, in call order.
pub struct ScriptedSource {
    queue: Mutex<VecDeque<oneshot::Receiver<Result<String>>>>,
}

impl ScriptedSource {
    pub fn new(n: usize) -> (Arc<Self>, Vec<oneshot::Sender<Result<String>>>) {
        let mut senders = Vec::with_capacity(n);
        let mut queue = VecDeque::with_capacity(n);
        for _ in 0..n {
            let (tx, rx) = oneshot::channel();
            senders.push(tx);
            queue.push_back(rx);
        }
        (
            Arc::new(Self {
                queue: Mutex::new(queue),
            }),
            senders,
        )
    }
}

#[async_trait::async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch_csv(&self) -> Result<String> {
        let rx = self.queue.lock().unwrap().pop_front();
        match rx {
            Some(rx) => rx.await.unwrap_or_else(|_| Err(anyhow!("script sender dropped"))),
            None => Err(anyhow!("script exhausted")),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Feed that always fails, like an unreachable spreadsheet.
pub struct DownSource;

#[async_trait::async_trait]
impl FeedSource for DownSource {
    async fn fetch_csv(&self) -> Result<String> {
        Err(anyhow!("Failed to fetch data: 503 Service Unavailable"))
    }

    fn name(&self) -> &'static str {
        "down"
    }
}

/// Router over a fixture feed, no background refresh loop.
pub fn fixture_router(body: &str) -> (Router, Arc<Dashboard>) {
    let src: Arc<dyn FeedSource> = Arc::new(SheetCsvProvider::from_fixture(body));
    router_over(src)
}

pub fn router_over(src: Arc<dyn FeedSource>) -> (Router, Arc<Dashboard>) {
    let dashboard = Arc::new(Dashboard::new(src.clone(), ViewSettings::default()));
    let app = radiation_monitor::api::create_router(AppState::new(dashboard.clone(), src));
    (app, dashboard)
}

pub async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::get(uri).body(Body::empty()).expect("build GET"))
        .await
        .expect("oneshot GET")
}

pub async fn post(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::post(uri).body(Body::empty()).expect("build POST"))
        .await
        .expect("oneshot POST")
}

pub async fn body_string(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

pub async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    serde_json::from_str(&body_string(resp).await).expect("parse json")
}
