//! CoinGecko On-Chain API Client
//!
//! Tertiary market data source: the on-chain pools listing for a token.
//! Unlike DexScreener there is no liquidity-based selection, the first pool
//! in the listing is used as-is.

use super::geckoterminal::narrow_periods;
use super::http::JsonFetcher;
use super::market_source::{network_id, MarketDataSource};
use crate::models::MarketSnapshot;
use crate::utils::values::{as_f64, as_millis, as_price_string, h24_txn_total, path};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const BASE_URL: &str = "https://api.coingecko.com/api/v3/onchain";

pub struct CoinGeckoClient {
    fetcher: Arc<dyn JsonFetcher>,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self::with_base_url(fetcher, BASE_URL)
    }

    pub fn with_base_url(fetcher: Arc<dyn JsonFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    pub fn pools_url(&self, contract: &str, chain: &str) -> String {
        format!(
            "{}/networks/{}/tokens/{}/pools",
            self.base_url,
            network_id(chain),
            contract
        )
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    fn source_name(&self) -> &str {
        "CoinGecko"
    }

    async fn fetch(&self, contract: &str, chain: &str) -> Option<MarketSnapshot> {
        let body = self
            .fetcher
            .get_json(&self.pools_url(contract, chain), None)
            .await?;
        parse_pools(&body)
    }
}

/// Normalize the first pool of a `/tokens/{address}/pools` response
pub fn parse_pools(body: &Value) -> Option<MarketSnapshot> {
    let first = body.get("data")?.as_array()?.first()?;
    let pool = path(first, &["attributes"])?;

    Some(MarketSnapshot {
        price_usd: pool.get("base_token_price_usd").and_then(as_price_string),
        price_change: narrow_periods(pool.get("price_change_percentage")),
        liquidity_usd: pool.get("reserve_in_usd").and_then(as_f64),
        fdv: pool.get("fdv_usd").and_then(as_f64),
        market_cap: pool.get("market_cap_usd").and_then(as_f64),
        pair_created_at: pool.get("pool_created_at").and_then(as_millis),
        txns: h24_txn_total(pool.get("transactions")),
    })
}
