//! Verdict store trait definition.

use crate::core::{StoreError, Verdict};
use crate::render::VerdictDocument;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A verdict addressed for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredVerdict {
    /// Document id: the external scan id or the file's SHA-256.
    pub id: String,
    /// Plugin name, the key under the category.
    pub name: String,
    /// Plugin category.
    pub category: String,
    /// Verdict fields, including `markdown` when a table was rendered.
    pub data: VerdictDocument,
}

impl StoredVerdict {
    /// Builds a stored verdict.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        verdict: &Verdict,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            data: VerdictDocument::with_markdown(verdict),
        }
    }
}

/// Trait for verdict storage implementations.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use avbridge::store::{StoredVerdict, VerdictStore};
/// use avbridge::core::StoreError;
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct RedisStore {
///     // connection pool
/// }
///
/// #[async_trait]
/// impl VerdictStore for RedisStore {
///     async fn store(&self, verdict: &StoredVerdict) -> Result<(), StoreError> {
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait VerdictStore: Send + Sync + Debug {
    /// Prepares the backing store (creates indexes, tables).
    async fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Upserts a verdict under its id.
    async fn store(&self, verdict: &StoredVerdict) -> Result<(), StoreError>;
}
