//! Merge freshly fetched market data over the stored record and write it back.
//!
//! Fresh values win field by field; anything the provider left out keeps its
//! previously stored value. A total fetch failure never touches the store.

use crate::models::{MarketSnapshot, StoredToken, TrackedToken};
use crate::store::TokenStore;
use crate::utils::age_since;
use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use std::sync::Arc;
use tracing::{info, warn};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// What happened to one token's record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Merged record differed and was written
    Updated,
    /// Merged record matched what was stored; nothing written
    Unchanged,
    /// No fresh data; stored record left untouched
    PreservedStale,
}

impl PersistOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Unchanged => "no_change",
            Self::PreservedStale => "preserved_stale",
        }
    }
}

/// Build the record to store from identity, fresh data and the prior record.
///
/// `prior` is `None` when nothing was stored (or it could not be decoded).
pub fn merge_record(
    token: &TrackedToken,
    fresh: &MarketSnapshot,
    prior: Option<&StoredToken>,
    now: DateTime<Utc>,
) -> StoredToken {
    let empty = StoredToken::default();
    let prior = prior.unwrap_or(&empty);

    let age = age_since(fresh.pair_created_at, now).or_else(|| prior.age.clone());

    let price_change = if fresh.price_change.is_empty() {
        prior.price_change.clone()
    } else {
        fresh.price_change.clone()
    };

    StoredToken {
        name: token.name.clone(),
        chain: token.chain.clone(),
        contract: token.contract.clone(),
        price_usd: fresh.price_usd.clone().or_else(|| prior.price_usd.clone()),
        price_change,
        liquidity_usd: fresh.liquidity_usd.or(prior.liquidity_usd),
        fdv: fresh.fdv.or(prior.fdv),
        market_cap: fresh.market_cap.or(prior.market_cap),
        pair_created_at: fresh.pair_created_at.or(prior.pair_created_at),
        age,
        txns: fresh.txns.unwrap_or(prior.txns),
        timestamp: Some(now.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()),
        extra: prior.extra.clone(),
    }
}

/// Loads, merges and conditionally writes token records
#[derive(Clone)]
pub struct TokenPersister {
    store: Arc<dyn TokenStore>,
}

impl TokenPersister {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Persist the outcome of one resolution attempt.
    ///
    /// Store failures propagate; the caller decides whether they are fatal.
    pub async fn persist(
        &self,
        token: &TrackedToken,
        fresh: Option<&MarketSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<PersistOutcome> {
        let field = token.store_field();

        let Some(fresh) = fresh.filter(|f| !f.is_empty()) else {
            warn!(
                "Skip {} ({}): no data from any source, preserved stale data",
                token.name, token.chain
            );
            return Ok(PersistOutcome::PreservedStale);
        };

        let prior = self.load_prior(&field).await?;
        let merged = merge_record(token, fresh, prior.as_ref(), now);

        if prior
            .as_ref()
            .map_or(false, |prior| prior.same_market_state(&merged))
        {
            info!("No change {} ({})", token.name, token.chain);
            return Ok(PersistOutcome::Unchanged);
        }

        let payload = serde_json::to_string(&merged)
            .with_context(|| format!("Failed to serialize record for {}", field))?;
        self.store.save(&field, &payload).await?;

        info!("Updated {} ({})", token.name, token.chain);
        Ok(PersistOutcome::Updated)
    }

    async fn load_prior(&self, field: &str) -> Result<Option<StoredToken>> {
        let Some(raw) = self.store.load(field).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<StoredToken>(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Stored record for {} is unreadable, replacing: {}", field, e);
                Ok(None)
            }
        }
    }
}
