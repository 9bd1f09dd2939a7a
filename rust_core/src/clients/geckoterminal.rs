//! GeckoTerminal API Client
//!
//! Secondary market data source. The token endpoint is already scoped to one
//! network, so no pair selection is needed.
//!
//! Rate limits: ~30 requests/minute, no API key.

use super::http::JsonFetcher;
use super::market_source::{network_id, MarketDataSource};
use crate::models::{MarketSnapshot, PriceChange};
use crate::utils::values::{as_f64, as_millis, as_price_string, h24_txn_total, path};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;
use std::sync::Arc;

const BASE_URL: &str = "https://api.geckoterminal.com/api/v2";
/// Pins the response schema version
const ACCEPT_VERSIONED: &str = "application/json;version=20230302";

/// Only these periods are kept from gecko-family providers
pub const NARROW_PERIODS: &[&str] = &["h6", "h24"];

pub struct GeckoTerminalClient {
    fetcher: Arc<dyn JsonFetcher>,
    base_url: String,
}

impl GeckoTerminalClient {
    pub fn new(fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self::with_base_url(fetcher, BASE_URL)
    }

    pub fn with_base_url(fetcher: Arc<dyn JsonFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    pub fn token_url(&self, contract: &str, chain: &str) -> String {
        format!(
            "{}/networks/{}/tokens/{}",
            self.base_url,
            network_id(chain),
            contract
        )
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VERSIONED));
        headers
    }
}

#[async_trait]
impl MarketDataSource for GeckoTerminalClient {
    fn source_name(&self) -> &str {
        "GeckoTerminal"
    }

    async fn fetch(&self, contract: &str, chain: &str) -> Option<MarketSnapshot> {
        let body = self
            .fetcher
            .get_json(&self.token_url(contract, chain), Some(Self::headers()))
            .await?;
        parse_token(&body)
    }
}

/// Normalize a `/networks/{network}/tokens/{address}` response
pub fn parse_token(body: &Value) -> Option<MarketSnapshot> {
    let attr = path(body, &["data", "attributes"])?;

    Some(MarketSnapshot {
        price_usd: attr.get("price_usd").and_then(as_price_string),
        price_change: narrow_periods(attr.get("price_change_percentage")),
        liquidity_usd: attr
            .get("liquidity_usd")
            .and_then(as_f64)
            .or_else(|| attr.get("total_reserve_in_usd").and_then(as_f64)),
        fdv: attr.get("fdv_usd").and_then(as_f64),
        market_cap: attr.get("market_cap_usd").and_then(as_f64),
        pair_created_at: attr.get("pool_created_at").and_then(as_millis),
        txns: h24_txn_total(attr.get("transactions")),
    })
}

/// `h6` and `h24` only; other periods are dropped
pub(crate) fn narrow_periods(value: Option<&Value>) -> PriceChange {
    let Some(value) = value else {
        return PriceChange::new();
    };
    NARROW_PERIODS
        .iter()
        .filter_map(|period| {
            value
                .get(*period)
                .and_then(as_f64)
                .map(|pct| (period.to_string(), pct))
        })
        .collect()
}
