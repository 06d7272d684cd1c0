use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::header::{CACHE_CONTROL, PRAGMA, USER_AGENT};

use crate::ingest::types::FeedSource;

/// CSV feed reachable over HTTP (spreadsheet export or the relay), or a fixed body.
pub struct SheetCsvProvider {
    name: &'static str,
    mode: Mode,
}

enum Mode {
    // Owned copy so tests can build bodies at runtime.
    Fixture(String),
    Http {
        url: String,
        user_agent: Option<String>,
        client: reqwest::Client,
    },
}

impl SheetCsvProvider {
    pub fn from_fixture(body: impl Into<String>) -> Self {
        Self {
            name: "fixture",
            mode: Mode::Fixture(body.into()),
        }
    }

    /// Upstream spreadsheet export, fetched with a browser-like `User-Agent`.
    pub fn upstream(
        url: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        Ok(Self {
            name: "upstream",
            mode: Mode::Http {
                url: url.into(),
                user_agent: Some(user_agent.into()),
                client: build_client(timeout)?,
            },
        })
    }

    /// Same-origin relay endpoint (`/api/radiation-data`).
    pub fn relay(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            name: "relay",
            mode: Mode::Http {
                url: url.into(),
                user_agent: None,
                client: build_client(timeout)?,
            },
        })
    }
}

fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut b = reqwest::Client::builder();
    if let Some(t) = timeout {
        b = b.timeout(t);
    }
    b.build().context("building feed http client")
}

#[async_trait]
impl FeedSource for SheetCsvProvider {
    async fn fetch_csv(&self) -> Result<String> {
        crate::ingest::ensure_metrics_described();
        counter!("feed_fetch_total", "source" => self.name).increment(1);

        match &self.mode {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http {
                url,
                user_agent,
                client,
            } => {
                let t0 = std::time::Instant::now();
                let mut req = client
                    .get(url.as_str())
                    .header(CACHE_CONTROL, "no-cache")
                    .header(PRAGMA, "no-cache");
                if let Some(ua) = user_agent {
                    req = req.header(USER_AGENT, ua.as_str());
                }

                let res = fetch_body(req).await;
                histogram!("feed_fetch_ms", "source" => self.name)
                    .record(t0.elapsed().as_secs_f64() * 1_000.0);

                if let Err(e) = &res {
                    tracing::warn!(target: "ingest", error = ?e, source = self.name, "feed http error");
                    counter!("feed_fetch_errors_total", "source" => self.name).increment(1);
                }
                res
            }
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

async fn fetch_body(req: reqwest::RequestBuilder) -> Result<String> {
    let resp = req.send().await.context("Failed to fetch data")?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("Failed to fetch data: {status}");
    }
    resp.text().await.context("Failed to read feed body")
}
