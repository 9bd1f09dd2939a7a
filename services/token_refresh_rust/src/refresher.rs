//! TokenRefresher: periodic fetch-merge-persist over every tracked token
//!
//! Each cycle:
//! - loads every record from the token store
//! - resolves fresh market data through the source chain
//! - merges and writes back changed records
//!
//! At most `max_concurrency` tokens are in flight at once. A failure inside
//! one token's unit of work is logged and never aborts the cycle.

use crate::config::RefreshConfig;
use crate::stats::{RefreshStats, RefreshStatsSnapshot};
use anyhow::{Context, Result};
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use token_refresh_core::{MarketDataSource, TokenPersister, TokenStore, TrackedToken};
use tracing::{debug, error, info, warn};

/// Result of a single scheduler cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Store had no entries; nothing dispatched
    Idle,
    Completed(CycleReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub dispatched: usize,
    pub skipped: usize,
    pub duration: Duration,
}

pub struct TokenRefresher {
    store: Arc<dyn TokenStore>,
    source: Arc<dyn MarketDataSource>,
    persister: TokenPersister,
    gate: Semaphore,
    config: RefreshConfig,
    stats: Arc<RefreshStats>,
}

impl TokenRefresher {
    pub fn new(
        store: Arc<dyn TokenStore>,
        source: Arc<dyn MarketDataSource>,
        config: RefreshConfig,
    ) -> Self {
        info!(
            "Initializing TokenRefresher via {} (max {} in flight)",
            source.source_name(),
            config.max_concurrency
        );

        Self {
            persister: TokenPersister::new(store.clone()),
            store,
            source,
            gate: Semaphore::new(config.max_concurrency.max(1)),
            config,
            stats: Arc::new(RefreshStats::new()),
        }
    }

    pub fn stats(&self) -> Arc<RefreshStats> {
        self.stats.clone()
    }

    /// Run one cycle over every tracked token.
    ///
    /// Only a failure to list the tracked tokens is returned as an error.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let started = Instant::now();
        self.stats.cycles.fetch_add(1, Ordering::Relaxed);

        let entries = self
            .store
            .load_all()
            .await
            .context("Failed to load tracked tokens")?;

        if entries.is_empty() {
            warn!("Token store is empty, awaiting seed data");
            self.stats.idle_cycles.fetch_add(1, Ordering::Relaxed);
            return Ok(CycleOutcome::Idle);
        }

        let (tokens, skipped) = parse_entries(entries);
        self.stats
            .skipped_entries
            .fetch_add(skipped as u64, Ordering::Relaxed);

        let dispatched = tokens.len();
        join_all(tokens.into_iter().map(|token| self.process_token(token))).await;

        let report = CycleReport {
            dispatched,
            skipped,
            duration: started.elapsed(),
        };
        info!(
            "Cycle complete ({:.2}s): {} tokens, {} skipped → restarting",
            report.duration.as_secs_f64(),
            report.dispatched,
            report.skipped
        );
        log_stats(&self.stats.snapshot());

        Ok(CycleOutcome::Completed(report))
    }

    /// Resolve then persist a single token, holding an admission permit
    async fn process_token(&self, token: TrackedToken) {
        let _permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Admission gate closed, dropping {}: {}", token.name, e);
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let fresh = self.source.fetch(&token.contract, &token.chain).await;

        match self.persister.persist(&token, fresh.as_ref(), Utc::now()).await {
            Ok(outcome) => self.stats.record_outcome(outcome),
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Failed to persist {} ({}:{}): {:#}",
                    token.name,
                    token.chain,
                    token.short_contract(),
                    e
                );
            }
        }

        let pause = self.config.token_pause();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    /// How long to wait before the next cycle
    pub fn delay_after(&self, outcome: &CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Idle => self.config.idle_delay(),
            CycleOutcome::Completed(_) => self.config.cycle_interval(),
        }
    }

    /// Cycle until `shutdown` flips to true (or its sender goes away).
    ///
    /// A running cycle is always allowed to finish; shutdown is observed
    /// between cycles and during the wait.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            "TokenRefresher running (interval: {}s, idle delay: {}s)",
            self.config.cycle_interval_secs, self.config.idle_delay_secs
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.run_cycle().await?;
            let delay = self.delay_after(&outcome);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    debug!("Shutdown observed while waiting");
                    break;
                }
            }
        }

        info!("TokenRefresher stopped");
        Ok(())
    }
}

/// Decode store entries into tracked tokens, in key order.
///
/// Returns the tokens and the number of entries that could not be decoded.
pub fn parse_entries(entries: HashMap<String, String>) -> (Vec<TrackedToken>, usize) {
    let mut entries: Vec<(String, String)> = entries.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut tokens = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for (field, raw) in entries {
        match serde_json::from_str::<TrackedToken>(&raw) {
            Ok(token) => tokens.push(token),
            Err(e) => {
                error!("Token parse error for {}: {}", field, e);
                skipped += 1;
            }
        }
    }
    (tokens, skipped)
}

fn log_stats(stats: &RefreshStatsSnapshot) {
    info!(
        "Stats: cycles={} idle={} updated={} unchanged={} preserved={} failed={} skipped={}",
        stats.cycles,
        stats.idle_cycles,
        stats.updated,
        stats.unchanged,
        stats.preserved,
        stats.failed,
        stats.skipped_entries
    );
}
