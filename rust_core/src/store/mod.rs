//! Token store abstraction.
//!
//! The refresher only needs three hash operations on a single service-wide
//! hash: read every field, read one field, write one field. Production uses
//! Redis; tests use the in-memory store.

pub mod memory;
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub use self::memory::MemoryTokenStore;
pub use self::redis::{RedisStoreConfig, RedisTokenStore};

/// Default hash holding every tracked token record
pub const DEFAULT_HASH_KEY: &str = "bmcnewtokens";

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Every field of the hash: `chain:contract` -> serialized record
    async fn load_all(&self) -> Result<HashMap<String, String>>;

    /// A single serialized record, `None` when the field does not exist
    async fn load(&self, field: &str) -> Result<Option<String>>;

    /// Overwrite a single field
    async fn save(&self, field: &str, value: &str) -> Result<()>;
}
