//! Refresh Cycle Tests
//!
//! Drive single scheduler cycles against the in-memory store with scripted
//! market sources. No network or Redis required.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use token_refresh_core::{
    ChainedMarketSource, MarketDataSource, MarketSnapshot, MemoryTokenStore, StoredToken,
    TokenStore,
};
use token_refresh_rust::{CycleOutcome, RefreshConfig, TokenRefresher};
use tokio::sync::watch;
use tokio_test::assert_ok;
use tracing_subscriber::EnvFilter;

/// Source returning a fixed answer, counting calls and concurrent fetches
struct ScriptedSource {
    name: &'static str,
    result: Option<MarketSnapshot>,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    fn new(name: &'static str, result: Option<MarketSnapshot>) -> Arc<Self> {
        Self::with_latency(name, result, Duration::ZERO)
    }

    fn with_latency(
        name: &'static str,
        result: Option<MarketSnapshot>,
        latency: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            result,
            latency,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    fn source_name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, _contract: &str, _chain: &str) -> Option<MarketSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Store whose writes fail for one field
struct FlakyStore {
    inner: MemoryTokenStore,
    failing_field: String,
}

#[async_trait]
impl TokenStore for FlakyStore {
    async fn load_all(&self) -> Result<HashMap<String, String>> {
        self.inner.load_all().await
    }

    async fn load(&self, field: &str) -> Result<Option<String>> {
        self.inner.load(field).await
    }

    async fn save(&self, field: &str, value: &str) -> Result<()> {
        if field == self.failing_field {
            return Err(anyhow!("connection reset"));
        }
        self.inner.save(field, value).await
    }
}

fn test_config() -> RefreshConfig {
    RefreshConfig {
        redis_url: "redis://localhost:6379".to_string(),
        redis_token: "test".to_string(),
        token_pause_ms: 0,
        ..Default::default()
    }
}

fn seed_token(store: &MemoryTokenStore, name: &str, chain: &str, contract: &str) -> String {
    let field = format!("{}:{}", chain, contract.to_lowercase());
    store.seed(
        field.clone(),
        serde_json::json!({"name": name, "chain": chain, "contract": contract}).to_string(),
    );
    field
}

fn priced(price: &str) -> Option<MarketSnapshot> {
    Some(MarketSnapshot {
        price_usd: Some(price.to_string()),
        liquidity_usd: Some(12_345.0),
        txns: Some(17),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_empty_store_is_idle() {
    let store = Arc::new(MemoryTokenStore::new());
    let source = ScriptedSource::new("A", priced("1.0"));
    let config = RefreshConfig {
        idle_delay_secs: 10,
        cycle_interval_secs: 30,
        ..test_config()
    };
    let refresher = TokenRefresher::new(store.clone(), source.clone(), config);

    let outcome = assert_ok!(refresher.run_cycle().await);
    assert_eq!(outcome, CycleOutcome::Idle);
    assert_eq!(refresher.delay_after(&outcome), Duration::from_secs(10));
    assert_eq!(source.calls(), 0);
    assert_eq!(store.write_count(), 0);
    assert_eq!(refresher.stats().snapshot().idle_cycles, 1);
}

#[tokio::test]
async fn test_cycle_updates_every_token() {
    let store = Arc::new(MemoryTokenStore::new());
    let field = seed_token(&store, "Pepe", "ethereum", "0xABCDEF");
    seed_token(&store, "Bonk", "solana", "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263");
    let source = ScriptedSource::new("A", priced("0.0042"));
    let refresher = TokenRefresher::new(store.clone(), source.clone(), test_config());

    let outcome = assert_ok!(refresher.run_cycle().await);
    match &outcome {
        CycleOutcome::Completed(report) => {
            assert_eq!(report.dispatched, 2);
            assert_eq!(report.skipped, 0);
        }
        CycleOutcome::Idle => panic!("expected a completed cycle"),
    }
    assert_eq!(refresher.delay_after(&outcome), Duration::from_secs(10));
    assert_eq!(source.calls(), 2);
    assert_eq!(store.write_count(), 2);

    let stored: StoredToken = serde_json::from_str(&store.get(&field).unwrap()).unwrap();
    assert_eq!(stored.name, "Pepe");
    assert_eq!(stored.contract, "0xABCDEF");
    assert_eq!(stored.price_usd.as_deref(), Some("0.0042"));
    assert_eq!(stored.txns, 17);
    assert!(stored.timestamp.is_some());

    // Same data again: nothing rewritten
    assert_ok!(refresher.run_cycle().await);
    assert_eq!(store.write_count(), 2);
    assert_eq!(refresher.stats().snapshot().unchanged, 2);
}

#[tokio::test]
async fn test_concurrency_cap() {
    let store = Arc::new(MemoryTokenStore::new());
    for i in 0..20 {
        seed_token(&store, &format!("T{}", i), "bsc", &format!("0x{:040x}", i));
    }
    let source = ScriptedSource::with_latency("A", priced("1"), Duration::from_millis(20));
    let config = RefreshConfig {
        max_concurrency: 5,
        ..test_config()
    };
    let refresher = TokenRefresher::new(store.clone(), source.clone(), config);

    assert_ok!(refresher.run_cycle().await);
    assert_eq!(source.calls(), 20);
    let peak = source.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 5, "observed {} concurrent fetches", peak);
    assert!(peak > 1, "fetches never overlapped");
    assert_eq!(refresher.stats().snapshot().updated, 20);
}

#[tokio::test]
async fn test_malformed_entry_is_skipped() {
    let store = Arc::new(MemoryTokenStore::new());
    seed_token(&store, "Good", "base", "0x1111");
    store.seed("base:0xbroken", "{\"name\": ");
    store.seed("base:0xnochain", r#"{"name":"NoChain","contract":"0x2"}"#);
    let source = ScriptedSource::new("A", priced("2"));
    let refresher = TokenRefresher::new(store.clone(), source.clone(), test_config());

    let outcome = assert_ok!(refresher.run_cycle().await);
    match outcome {
        CycleOutcome::Completed(report) => {
            assert_eq!(report.dispatched, 1);
            assert_eq!(report.skipped, 2);
        }
        CycleOutcome::Idle => panic!("expected a completed cycle"),
    }
    assert_eq!(source.calls(), 1);
    assert_eq!(store.get("base:0xbroken").as_deref(), Some("{\"name\": "));
}

#[tokio::test]
async fn test_total_fetch_failure_preserves_records() {
    let store = Arc::new(MemoryTokenStore::new());
    let field = "ethereum:0xfeed".to_string();
    let original = serde_json::json!({
        "name": "Stale",
        "chain": "ethereum",
        "contract": "0xFEED",
        "priceUsd": "3.14",
        "txns": 99,
        "timestamp": "2025-01-01T00:00:00"
    })
    .to_string();
    store.seed(field.clone(), original.clone());

    let a = ScriptedSource::new("A", None);
    let b = ScriptedSource::new("B", None);
    let c = ScriptedSource::new("C", Some(MarketSnapshot::default()));
    let chain = Arc::new(ChainedMarketSource::new(vec![
        a.clone() as Arc<dyn MarketDataSource>,
        b.clone() as Arc<dyn MarketDataSource>,
        c.clone() as Arc<dyn MarketDataSource>,
    ]));
    let refresher = TokenRefresher::new(store.clone(), chain, test_config());

    assert_ok!(refresher.run_cycle().await);
    assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 1));
    assert_eq!(store.get(&field).unwrap(), original);
    assert_eq!(store.write_count(), 0);
    assert_eq!(refresher.stats().snapshot().preserved, 1);
}

#[tokio::test]
async fn test_primary_source_short_circuits_chain() {
    let store = Arc::new(MemoryTokenStore::new());
    seed_token(&store, "Pepe", "ethereum", "0xabc");
    let a = ScriptedSource::new("A", priced("1.0"));
    let b = ScriptedSource::new("B", priced("2.0"));
    let c = ScriptedSource::new("C", priced("3.0"));
    let chain = Arc::new(ChainedMarketSource::new(vec![
        a.clone() as Arc<dyn MarketDataSource>,
        b.clone() as Arc<dyn MarketDataSource>,
        c.clone() as Arc<dyn MarketDataSource>,
    ]));
    let refresher = TokenRefresher::new(store.clone(), chain, test_config());

    assert_ok!(refresher.run_cycle().await);
    assert_eq!((a.calls(), b.calls(), c.calls()), (1, 0, 0));
    let stored: StoredToken =
        serde_json::from_str(&store.get("ethereum:0xabc").unwrap()).unwrap();
    assert_eq!(stored.price_usd.as_deref(), Some("1.0"));
}

#[tokio::test]
async fn test_store_failure_is_isolated_to_one_token() {
    let inner = MemoryTokenStore::new();
    seed_token(&inner, "Ok", "bsc", "0xaaa");
    let failing = seed_token(&inner, "Broken", "bsc", "0xbbb");
    let store = Arc::new(FlakyStore {
        inner,
        failing_field: failing,
    });
    let source = ScriptedSource::new("A", priced("5"));
    let refresher = TokenRefresher::new(store.clone(), source.clone(), test_config());

    assert_ok!(refresher.run_cycle().await);
    let stats = refresher.stats().snapshot();
    assert_eq!(stats.updated, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(store.inner.write_count(), 1);
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let store = Arc::new(MemoryTokenStore::new());
    seed_token(&store, "Pepe", "ethereum", "0xabc");
    let source = ScriptedSource::new("A", priced("1.0"));
    let config = RefreshConfig {
        cycle_interval_secs: 3_600,
        ..test_config()
    };
    let refresher = TokenRefresher::new(store.clone(), source.clone(), config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let stopper = async {
        while source.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown_tx.send(true).unwrap();
    };

    let (result, _) = tokio::time::timeout(
        Duration::from_secs(5),
        async { tokio::join!(refresher.run(shutdown_rx), stopper) },
    )
    .await
    .expect("refresher did not stop");

    assert_ok!(result);
    assert_eq!(source.calls(), 1);
    assert_eq!(refresher.stats().snapshot().cycles, 1);
}

/// Shared in-memory log sink
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_stats_logged_at_default_level() {
    let logs = LogBuffer::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .with_writer(move || sink.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let store = Arc::new(MemoryTokenStore::new());
    seed_token(&store, "Pepe", "ethereum", "0xabc");
    let source = ScriptedSource::new("A", priced("1.0"));
    let refresher = TokenRefresher::new(store, source, test_config());
    assert_ok!(refresher.run_cycle().await);

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("Stats: cycles=1"), "missing stats line in:\n{}", output);
    assert!(output.contains("updated=1"));
}
