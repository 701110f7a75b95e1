//! Verdict persistence.
//!
//! Verdicts can be handed to a document store after a scan. The store is
//! an external collaborator reached through the [`VerdictStore`] trait.

mod elasticsearch;
mod memory;
mod traits;

pub use elasticsearch::{upsert_body, ElasticsearchConfig, ElasticsearchStore, DEFAULT_INDEX};
pub use memory::MemoryStore;
pub use traits::{StoredVerdict, VerdictStore};
