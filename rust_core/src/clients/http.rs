//! Shared HTTP JSON client
//!
//! One GET per call, fixed timeout, a User-Agent drawn at random from a pool
//! of real browser strings on every request. Failures never escape: they are
//! classified, logged and turned into `None`.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.6422.141 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 12_6_3) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 11.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edg/126.0.0.0 Safari/537.36",
];

/// Why a fetch produced no data
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("invalid JSON body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Source of decoded JSON documents.
///
/// Adapters depend on this rather than on reqwest so their parsing can be
/// exercised against canned payloads.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    /// GET `url` and decode the body. `None` on any failure.
    async fn get_json(&self, url: &str, headers: Option<HeaderMap>) -> Option<Value>;
}

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Caller headers plus a random User-Agent unless one was supplied
pub fn with_default_headers(headers: Option<HeaderMap>) -> HeaderMap {
    let mut headers = headers.unwrap_or_default();
    if !headers.contains_key(USER_AGENT) {
        headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
    }
    headers
}

/// reqwest-backed [`JsonFetcher`]
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Fetch and decode, keeping the failure reason
    pub async fn try_get_json(
        &self,
        url: &str,
        headers: Option<HeaderMap>,
    ) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .headers(with_default_headers(headers))
            .send()
            .await
            .map_err(FetchError::Transport)?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status()));
        }

        response.json::<Value>().await.map_err(FetchError::Decode)
    }
}

#[async_trait]
impl JsonFetcher for HttpClient {
    async fn get_json(&self, url: &str, headers: Option<HeaderMap>) -> Option<Value> {
        match self.try_get_json(url, headers).await {
            Ok(value) => Some(value),
            Err(FetchError::Status(status)) => {
                warn!("{} -> HTTP {}", url, status.as_u16());
                None
            }
            Err(e) => {
                error!("Fetch failed for {}: {}", url, e);
                None
            }
        }
    }
}
