pub mod chained_source;
pub mod coingecko;
pub mod dexscreener;
pub mod geckoterminal;
pub mod http;
pub mod market_source;

// Re-export commonly used types
pub use chained_source::ChainedMarketSource;
pub use coingecko::CoinGeckoClient;
pub use dexscreener::DexScreenerClient;
pub use geckoterminal::GeckoTerminalClient;
pub use http::{FetchError, HttpClient, JsonFetcher};
pub use market_source::{network_id, MarketDataSource};
