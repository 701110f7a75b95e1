//! Elasticsearch verdict store.
//!
//! Verdicts are upserted into a shared `malice` index, one document per
//! scanned file, nested under `plugins.<category>.<name>` so several
//! engines can contribute to the same document.

use crate::core::StoreError;
use crate::store::traits::{StoredVerdict, VerdictStore};

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Default index name.
pub const DEFAULT_INDEX: &str = "malice";

/// Elasticsearch store configuration.
#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    /// Base URL, e.g. `http://elasticsearch:9200`.
    pub url: String,

    /// Index name.
    pub index: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl ElasticsearchConfig {
    /// Creates a configuration for the given base URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            index: DEFAULT_INDEX.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the index name.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), self.index)
    }

    fn update_url(&self, id: &str) -> String {
        format!("{}/_update/{}", self.index_url(), id)
    }
}

/// Stores verdicts in Elasticsearch over its REST API.
#[derive(Debug)]
pub struct ElasticsearchStore {
    config: ElasticsearchConfig,
    client: reqwest::Client,
}

impl ElasticsearchStore {
    /// Creates a new store.
    pub fn new(config: ElasticsearchConfig) -> Result<Self, StoreError> {
        if config.url.trim().is_empty() {
            return Err(StoreError::Configuration {
                message: "elasticsearch URL must be specified".to_string(),
            });
        }

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    async fn check(response: reqwest::Response) -> Result<(), StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            url,
            status: status.as_u16(),
            body,
        })
    }
}

/// Builds the partial-update body for a verdict.
pub fn upsert_body(verdict: &StoredVerdict) -> Value {
    json!({
        "doc": {
            "plugins": {
                verdict.category.as_str(): {
                    verdict.name.as_str(): verdict.data,
                }
            }
        },
        "doc_as_upsert": true,
    })
}

#[async_trait]
impl VerdictStore for ElasticsearchStore {
    async fn init(&self) -> Result<(), StoreError> {
        let url = self.config.index_url();
        let response = self.client.head(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::info!(index = %self.config.index, "Creating elasticsearch index");
            let response = self.client.put(&url).send().await?;
            return Self::check(response).await;
        }

        Self::check(response).await
    }

    async fn store(&self, verdict: &StoredVerdict) -> Result<(), StoreError> {
        let url = self.config.update_url(&verdict.id);
        let response = self
            .client
            .post(&url)
            .json(&upsert_body(verdict))
            .send()
            .await?;
        Self::check(response).await?;

        tracing::debug!(
            id = %verdict.id,
            index = %self.config.index,
            plugin = %verdict.name,
            "Verdict stored"
        );
        Ok(())
    }
}
