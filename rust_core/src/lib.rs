//! Token Refresh Core - multi-source token market data.
//!
//! This crate provides:
//! - A shared HTTP JSON client with User-Agent rotation
//! - DexScreener, GeckoTerminal and CoinGecko on-chain adapters
//! - A fallback chain over those adapters
//! - The stored token record and its field-level merge rules
//! - A token store abstraction with Redis and in-memory backends

pub mod clients;
pub mod models;
pub mod persist;
pub mod store;
pub mod utils;

pub use clients::{ChainedMarketSource, HttpClient, JsonFetcher, MarketDataSource};
pub use models::{MarketSnapshot, StoredToken, TrackedToken};
pub use persist::{merge_record, PersistOutcome, TokenPersister};
pub use store::{MemoryTokenStore, RedisStoreConfig, RedisTokenStore, TokenStore};
