// Shared models for the token refresh services
pub mod token;

pub use token::{
    short_contract, store_field, MarketSnapshot, PriceChange, StoredToken, TrackedToken,
};
