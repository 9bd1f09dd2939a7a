//! Lenient accessors over untyped JSON values.
//!
//! Upstream price APIs disagree on how they encode numbers: DexScreener sends
//! JSON numbers for liquidity and fdv, while GeckoTerminal and CoinGecko send
//! decimal strings. Creation times arrive as epoch milliseconds, epoch seconds
//! or RFC 3339 strings. Everything here returns `None` on absence or garbage.

use chrono::DateTime;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Anything at or above this is treated as epoch milliseconds, below as seconds.
const MILLIS_THRESHOLD: u64 = 100_000_000_000;

/// Float timestamps beyond this magnitude (roughly year 9999 in ms) are garbage.
const MAX_EPOCH_FLOAT: f64 = 253_402_300_800_000.0;

/// Walk a nested object path, e.g. `path(v, &["txns", "h24", "buys"])`.
pub fn path<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(value, |current, key| match current.get(key) {
        Some(Value::Null) | None => None,
        Some(next) => Some(next),
    })
}

/// Number or numeric string as f64. Non-finite values are rejected.
pub fn as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Non-negative count, accepting integer, float or string encodings.
pub fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && *f < u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Price as a decimal string. Strings pass through so sub-cent prices keep
/// the precision the provider gave us.
pub fn as_price_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Creation timestamp normalized to epoch milliseconds.
pub fn as_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.abs() <= MAX_EPOCH_FLOAT)
                    .map(|f| f as i64)
            })
            .map(normalize_epoch),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(raw) = s.parse::<i64>() {
                return Some(normalize_epoch(raw));
            }
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.timestamp_millis())
        }
        _ => None,
    }
}

fn normalize_epoch(raw: i64) -> i64 {
    if raw.unsigned_abs() >= MILLIS_THRESHOLD {
        raw
    } else {
        raw * 1000
    }
}

/// Sum of `h24.buys` and `h24.sells` under `container`.
///
/// One missing side counts as zero; `None` when neither side is reported.
pub fn h24_txn_total(container: Option<&Value>) -> Option<u64> {
    let container = container?;
    let buys = path(container, &["h24", "buys"]).and_then(as_count);
    let sells = path(container, &["h24", "sells"]).and_then(as_count);
    match (buys, sells) {
        (None, None) => None,
        (buys, sells) => Some(buys.unwrap_or(0).saturating_add(sells.unwrap_or(0))),
    }
}

// serde adapters for records we wrote ourselves (or an older writer did)

pub fn de_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(as_f64))
}

pub fn de_opt_price<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .as_ref()
        .and_then(as_price_string))
}

pub fn de_opt_millis<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(as_millis))
}

pub fn de_count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .as_ref()
        .and_then(as_count)
        .unwrap_or(0))
}
