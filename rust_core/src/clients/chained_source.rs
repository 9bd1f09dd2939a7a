//! Chained Market Source
//!
//! Implements a fallback chain of market data sources.
//! Default chain: DexScreener → GeckoTerminal → CoinGecko
//!
//! Sources are tried strictly in order and the first non-empty snapshot wins.
//! A source that fails is not retried within the same resolution.

use super::coingecko::CoinGeckoClient;
use super::dexscreener::DexScreenerClient;
use super::geckoterminal::GeckoTerminalClient;
use super::http::JsonFetcher;
use super::market_source::MarketDataSource;
use crate::models::{short_contract, MarketSnapshot};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// A market data source that chains several sources with fallback logic
pub struct ChainedMarketSource {
    /// Ordered list of sources to try
    sources: Vec<Arc<dyn MarketDataSource>>,
    /// Source name for logging
    name: String,
}

impl ChainedMarketSource {
    /// Create a new chained source with the given list of sources
    pub fn new(sources: Vec<Arc<dyn MarketDataSource>>) -> Self {
        let names: Vec<&str> = sources.iter().map(|s| s.source_name()).collect();
        let name = format!("ChainedSource({})", names.join(" → "));

        Self { sources, name }
    }

    /// Create the default chain: DexScreener → GeckoTerminal → CoinGecko
    ///
    /// DexScreener covers the most chains and reports every pool; the gecko
    /// family fills in tokens DexScreener has not indexed yet.
    pub fn new_default(fetcher: Arc<dyn JsonFetcher>) -> Self {
        let sources: Vec<Arc<dyn MarketDataSource>> = vec![
            Arc::new(DexScreenerClient::new(fetcher.clone())),
            Arc::new(GeckoTerminalClient::new(fetcher.clone())),
            Arc::new(CoinGeckoClient::new(fetcher)),
        ];

        Self::new(sources)
    }

    /// Resolve a token, also reporting which source answered
    pub async fn resolve(&self, contract: &str, chain: &str) -> Option<(MarketSnapshot, &str)> {
        for source in &self.sources {
            match source.fetch(contract, chain).await {
                Some(snapshot) if !snapshot.is_empty() => {
                    info!(
                        "Source {} → {}:{}",
                        source.source_name(),
                        chain,
                        short_contract(contract)
                    );
                    return Some((snapshot, source.source_name()));
                }
                _ => {
                    debug!(
                        "{} had no data for {}:{}",
                        source.source_name(),
                        chain,
                        short_contract(contract)
                    );
                    // Continue to next source
                }
            }
        }

        None
    }
}

#[async_trait]
impl MarketDataSource for ChainedMarketSource {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, contract: &str, chain: &str) -> Option<MarketSnapshot> {
        self.resolve(contract, chain)
            .await
            .map(|(snapshot, _)| snapshot)
    }
}
