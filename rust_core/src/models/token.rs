//! Token identity, normalized market snapshots and the stored record.

use crate::utils::values::{de_count, de_opt_f64, de_opt_millis, de_opt_price};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Percent change keyed by period label (`m5`, `h1`, `h6`, `h24`).
pub type PriceChange = BTreeMap<String, f64>;

/// A token the refresher is asked to keep up to date.
///
/// Seeded externally into the store; only these three fields are read when
/// deciding what to poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedToken {
    pub name: String,
    pub chain: String,
    pub contract: String,
}

impl TrackedToken {
    pub fn new(name: impl Into<String>, chain: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: chain.into(),
            contract: contract.into(),
        }
    }

    /// Store field for this token: `chain:contract`, contract lower-cased.
    pub fn store_field(&self) -> String {
        store_field(&self.chain, &self.contract)
    }

    /// First six characters of the contract, for log lines.
    pub fn short_contract(&self) -> String {
        short_contract(&self.contract)
    }
}

pub fn store_field(chain: &str, contract: &str) -> String {
    format!("{}:{}", chain, contract.to_lowercase())
}

pub fn short_contract(contract: &str) -> String {
    let short: String = contract.chars().take(6).collect();
    format!("{}...", short)
}

/// Provider-independent market data for one token.
///
/// Every field may be missing; a missing field is different from zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub price_usd: Option<String>,
    #[serde(default)]
    pub price_change: PriceChange,
    pub liquidity_usd: Option<f64>,
    pub fdv: Option<f64>,
    pub market_cap: Option<f64>,
    /// Pool creation time, epoch milliseconds
    pub pair_created_at: Option<i64>,
    /// 24h buys + sells
    pub txns: Option<u64>,
}

impl MarketSnapshot {
    /// True when the provider gave us nothing usable at all.
    pub fn is_empty(&self) -> bool {
        self.price_usd.is_none()
            && self.price_change.is_empty()
            && self.liquidity_usd.is_none()
            && self.fdv.is_none()
            && self.market_cap.is_none()
            && self.pair_created_at.is_none()
            && self.txns.is_none()
    }
}

/// The record persisted per token in the store hash.
///
/// Decoding is lenient: numbers written as strings and RFC 3339 creation
/// times are accepted, and unknown fields are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredToken {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub chain: String,
    #[serde(default)]
    pub contract: String,

    #[serde(default, deserialize_with = "de_opt_price")]
    pub price_usd: Option<String>,
    #[serde(default, deserialize_with = "de_price_change")]
    pub price_change: PriceChange,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub liquidity_usd: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub fdv: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub market_cap: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_millis")]
    pub pair_created_at: Option<i64>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default, deserialize_with = "de_count")]
    pub txns: u64,
    /// Local wall-clock time of the last write, `%Y-%m-%dT%H:%M:%S`
    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl StoredToken {
    /// Equality over everything except the write timestamp.
    pub fn same_market_state(&self, other: &StoredToken) -> bool {
        self.name == other.name
            && self.chain == other.chain
            && self.contract == other.contract
            && self.price_usd == other.price_usd
            && self.price_change == other.price_change
            && self.liquidity_usd == other.liquidity_usd
            && self.fdv == other.fdv
            && self.market_cap == other.market_cap
            && self.pair_created_at == other.pair_created_at
            && self.age == other.age
            && self.txns == other.txns
            && self.extra == other.extra
    }
}

fn de_price_change<'de, D>(d: D) -> Result<PriceChange, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(d)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|(period, value)| {
            crate::utils::values::as_f64(&value).map(|pct| (period, pct))
        })
        .collect())
}
