use super::{TokenStore, DEFAULT_HASH_KEY};
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, IntoConnectionInfo};
use std::collections::HashMap;
use tracing::info;

/// Connection settings for the Redis-backed token store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// `redis://host:port` or `rediss://host:port` for TLS endpoints
    pub url: String,
    /// Access token, sent as the connection password
    pub token: String,
    pub hash_key: String,
}

impl RedisStoreConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            hash_key: DEFAULT_HASH_KEY.to_string(),
        }
    }

    pub fn with_hash_key(mut self, hash_key: impl Into<String>) -> Self {
        self.hash_key = hash_key.into();
        self
    }
}

/// Token store over a single Redis hash.
///
/// `ConnectionManager` reconnects on its own and is cheap to clone, so every
/// operation works on its own handle and no lock is held across commands.
#[derive(Clone)]
pub struct RedisTokenStore {
    connection: ConnectionManager,
    hash_key: String,
}

impl RedisTokenStore {
    pub async fn connect(config: &RedisStoreConfig) -> Result<Self> {
        let mut info = config
            .url
            .as_str()
            .into_connection_info()
            .context("Invalid REDIS_URL")?;
        if !config.token.is_empty() {
            info.redis.password = Some(config.token.clone());
        }

        let client = Client::open(info).context("Failed to create Redis client")?;
        let connection = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis (hash: {})", config.hash_key);

        Ok(Self {
            connection,
            hash_key: config.hash_key.clone(),
        })
    }

    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn load_all(&self) -> Result<HashMap<String, String>> {
        let mut conn = self.connection.clone();
        conn.hgetall(&self.hash_key)
            .await
            .with_context(|| format!("HGETALL {} failed", self.hash_key))
    }

    async fn load(&self, field: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        conn.hget(&self.hash_key, field)
            .await
            .with_context(|| format!("HGET {} {} failed", self.hash_key, field))
    }

    async fn save(&self, field: &str, value: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.hset::<_, _, _, ()>(&self.hash_key, field, value)
            .await
            .with_context(|| format!("HSET {} {} failed", self.hash_key, field))
    }
}
