//! Configuration for token_refresh_rust

use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;
use token_refresh_core::clients::http::DEFAULT_TIMEOUT_SECS;
use token_refresh_core::store::{RedisStoreConfig, DEFAULT_HASH_KEY};

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    // Store
    pub redis_url: String,
    pub redis_token: String,
    pub hash_key: String,

    // Scheduling
    pub max_concurrency: usize,
    pub cycle_interval_secs: u64,
    pub idle_delay_secs: u64,
    pub token_pause_ms: u64,

    // Upstream
    pub http_timeout_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            redis_url: String::new(),
            redis_token: String::new(),
            hash_key: DEFAULT_HASH_KEY.to_string(),
            max_concurrency: 5,
            cycle_interval_secs: 10,
            idle_delay_secs: 10,
            token_pause_ms: 1,
            http_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RefreshConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let redis_url = required(&lookup, "REDIS_URL")?;
        let redis_token = required(&lookup, "REDIS_TOKEN")?;

        let max_concurrency =
            parse_or(&lookup, "REFRESH_MAX_CONCURRENCY", defaults.max_concurrency)?;
        let http_timeout_secs =
            parse_or(&lookup, "HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?;

        if max_concurrency == 0 {
            return Err(anyhow!("REFRESH_MAX_CONCURRENCY must be > 0"));
        }
        if http_timeout_secs == 0 {
            return Err(anyhow!("HTTP_TIMEOUT_SECS must be > 0"));
        }

        Ok(Self {
            redis_url,
            redis_token,
            hash_key: lookup("TOKENS_HASH_KEY")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.hash_key),
            max_concurrency,
            cycle_interval_secs: parse_or(
                &lookup,
                "REFRESH_INTERVAL_SECS",
                defaults.cycle_interval_secs,
            )?,
            idle_delay_secs: parse_or(&lookup, "REFRESH_IDLE_DELAY_SECS", defaults.idle_delay_secs)?,
            token_pause_ms: parse_or(&lookup, "REFRESH_TOKEN_PAUSE_MS", defaults.token_pause_ms)?,
            http_timeout_secs,
        })
    }

    pub fn store_config(&self) -> RedisStoreConfig {
        RedisStoreConfig::new(&self.redis_url, &self.redis_token).with_hash_key(&self.hash_key)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_secs(self.idle_delay_secs)
    }

    pub fn token_pause(&self) -> Duration {
        Duration::from_millis(self.token_pause_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn required<F>(lookup: &F, var_name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var_name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{} must be set", var_name))
}

/// Parse a variable with default fallback
fn parse_or<F, T>(lookup: &F, var_name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var_name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|_| anyhow!("{} must be a valid number", var_name)),
        None => Ok(default),
    }
}
