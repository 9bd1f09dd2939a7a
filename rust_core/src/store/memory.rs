use super::TokenStore;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// In-process token store used by tests and dry runs.
///
/// Counts writes so callers can assert that unchanged records are not
/// rewritten.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    fields: RwLock<HashMap<String, String>>,
    writes: AtomicU64,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a field without counting it as a write
    pub fn seed(&self, field: impl Into<String>, value: impl Into<String>) {
        self.fields
            .write()
            .unwrap()
            .insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<String> {
        self.fields.read().unwrap().get(field).cloned()
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load_all(&self) -> Result<HashMap<String, String>> {
        Ok(self.fields.read().unwrap().clone())
    }

    async fn load(&self, field: &str) -> Result<Option<String>> {
        Ok(self.get(field))
    }

    async fn save(&self, field: &str, value: &str) -> Result<()> {
        self.fields
            .write()
            .unwrap()
            .insert(field.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
