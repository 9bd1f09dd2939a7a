//! Market Data Source Trait
//!
//! Common interface for per-token market data providers.
//! Implementations include DexScreener, GeckoTerminal and CoinGecko on-chain.

use crate::models::MarketSnapshot;
use async_trait::async_trait;

/// A provider that can describe a token's current market state.
///
/// Implementations must never fail loudly: any network, status or parsing
/// problem is reported as `None` so callers can move on to the next provider.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Display name used in log lines (e.g. "DexScreener")
    fn source_name(&self) -> &str;

    /// Current market data for `contract` on `chain`, or `None` when the
    /// provider has nothing usable.
    async fn fetch(&self, contract: &str, chain: &str) -> Option<MarketSnapshot>;
}

/// Map a DexScreener-style chain id onto the network ids used by
/// GeckoTerminal and CoinGecko's on-chain API.
pub fn network_id(chain: &str) -> &str {
    match chain.to_lowercase().as_str() {
        "ethereum" | "eth" => "eth",
        "bsc" | "binance" | "bnb" => "bsc",
        "polygon" | "polygon_pos" | "matic" => "polygon_pos",
        "avalanche" | "avax" => "avax",
        "arbitrum" => "arbitrum",
        "optimism" => "optimism",
        "base" => "base",
        "solana" => "solana",
        "fantom" | "ftm" => "ftm",
        "cronos" => "cro",
        "pulsechain" => "pulsechain",
        "sui" => "sui-network",
        "ton" => "ton",
        "tron" => "tron",
        _ => chain, // Assume it's already a network id
    }
}
