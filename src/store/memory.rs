//! In-memory verdict store.

use crate::core::StoreError;
use crate::store::traits::{StoredVerdict, VerdictStore};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Keeps verdicts in a map keyed by document id.
///
/// Storing the same id again replaces the entry, matching the upsert
/// semantics of the document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredVerdict>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the verdict stored under `id`.
    pub fn get(&self, id: &str) -> Option<StoredVerdict> {
        self.entries.read().ok()?.get(id).cloned()
    }

    /// Returns the number of stored verdicts.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VerdictStore for MemoryStore {
    async fn store(&self, verdict: &StoredVerdict) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Configuration {
            message: "memory store lock poisoned".to_string(),
        })?;
        entries.insert(verdict.id.clone(), verdict.clone());
        tracing::debug!(id = %verdict.id, "Verdict stored in memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EngineMetadata, Verdict};

    #[tokio::test]
    async fn test_store_and_replace() {
        let store = MemoryStore::new();
        store.init().await.unwrap();
        assert!(store.is_empty());

        let clean = Verdict::clean(EngineMetadata::default());
        store
            .store(&StoredVerdict::new("abc", "mcafee", "av", &clean))
            .await
            .unwrap();

        let infected = Verdict::infected("EICAR", EngineMetadata::default()).unwrap();
        store
            .store(&StoredVerdict::new("abc", "mcafee", "av", &infected))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let stored = store.get("abc").unwrap();
        assert!(stored.data.infected);
        assert_eq!(stored.data.result, "EICAR");
    }

    #[tokio::test]
    async fn test_markdown_is_kept() {
        let store = MemoryStore::new();
        let verdict = Verdict::clean(EngineMetadata::default()).with_rendered_table("#### McAfee");
        store
            .store(&StoredVerdict::new("id", "mcafee", "av", &verdict))
            .await
            .unwrap();

        assert_eq!(store.get("id").unwrap().data.markdown.as_deref(), Some("#### McAfee"));
    }
}
