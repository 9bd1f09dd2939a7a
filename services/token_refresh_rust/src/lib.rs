//! token_refresh_rust - keeps tracked token market data fresh in the token store

pub mod config;
pub mod refresher;
pub mod stats;

pub use config::RefreshConfig;
pub use refresher::{CycleOutcome, CycleReport, TokenRefresher};
pub use stats::{RefreshStats, RefreshStatsSnapshot};
