//! DexScreener API Client
//!
//! Primary market data source. `/latest/dex/tokens/{address}` returns every
//! trading pair for the token across all chains; we keep the pairs on the
//! requested chain and take the deepest one.
//!
//! No API key required.

use super::http::JsonFetcher;
use super::market_source::MarketDataSource;
use crate::models::{MarketSnapshot, PriceChange};
use crate::utils::values::{as_f64, as_millis, as_price_string, h24_txn_total, path};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const BASE_URL: &str = "https://api.dexscreener.com/latest/dex";

pub struct DexScreenerClient {
    fetcher: Arc<dyn JsonFetcher>,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self::with_base_url(fetcher, BASE_URL)
    }

    pub fn with_base_url(fetcher: Arc<dyn JsonFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    pub fn token_url(&self, contract: &str) -> String {
        format!("{}/tokens/{}", self.base_url, contract)
    }
}

#[async_trait]
impl MarketDataSource for DexScreenerClient {
    fn source_name(&self) -> &str {
        "DexScreener"
    }

    async fn fetch(&self, contract: &str, chain: &str) -> Option<MarketSnapshot> {
        let body = self.fetcher.get_json(&self.token_url(contract), None).await?;
        let snapshot = parse_token_pairs(&body, chain);
        if snapshot.is_none() {
            debug!("DexScreener has no {} pair for {}", chain, contract);
        }
        snapshot
    }
}

/// Pick the deepest pair on `chain` and normalize it.
///
/// Missing liquidity counts as zero; on equal liquidity the earlier pair wins.
pub fn parse_token_pairs(body: &Value, chain: &str) -> Option<MarketSnapshot> {
    let pairs = body.get("pairs")?.as_array()?;

    let mut best: Option<(&Value, f64)> = None;
    for pair in pairs.iter().filter(|p| on_chain(p, chain)) {
        let liquidity = pair_liquidity(pair).unwrap_or(0.0);
        if best.map_or(true, |(_, best_liquidity)| liquidity > best_liquidity) {
            best = Some((pair, liquidity));
        }
    }

    let (pair, _) = best?;
    Some(normalize_pair(pair))
}

fn on_chain(pair: &Value, chain: &str) -> bool {
    pair.get("chainId")
        .and_then(Value::as_str)
        .map_or(false, |id| id.eq_ignore_ascii_case(chain))
}

fn pair_liquidity(pair: &Value) -> Option<f64> {
    path(pair, &["liquidity", "usd"]).and_then(as_f64)
}

fn normalize_pair(pair: &Value) -> MarketSnapshot {
    MarketSnapshot {
        price_usd: pair.get("priceUsd").and_then(as_price_string),
        price_change: all_periods(pair.get("priceChange")),
        liquidity_usd: pair_liquidity(pair),
        fdv: pair.get("fdv").and_then(as_f64),
        market_cap: pair.get("marketCap").and_then(as_f64),
        pair_created_at: pair.get("pairCreatedAt").and_then(as_millis),
        txns: h24_txn_total(pair.get("txns")),
    }
}

/// Every period DexScreener reports, as given
fn all_periods(value: Option<&Value>) -> PriceChange {
    value
        .and_then(Value::as_object)
        .map(|periods| {
            periods
                .iter()
                .filter_map(|(period, pct)| as_f64(pct).map(|pct| (period.clone(), pct)))
                .collect()
        })
        .unwrap_or_default()
}
