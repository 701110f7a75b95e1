//! JSON rendering.

use crate::core::{ScanError, Verdict};
use crate::render::Renderer;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire form of a verdict.
///
/// Field names are fixed by downstream consumers. `markdown` is only
/// carried in stored documents, never in rendered JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictDocument {
    /// Whether a threat was found.
    pub infected: bool,
    /// Threat name, empty when clean.
    pub result: String,
    /// Engine version.
    pub engine: String,
    /// Definitions version.
    pub database: String,
    /// Definitions date, `YYYYMMDD`.
    pub updated: String,
    /// Rendered Markdown table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
}

impl VerdictDocument {
    /// Builds the document without the table.
    pub fn from_verdict(verdict: &Verdict) -> Self {
        Self {
            infected: verdict.is_infected(),
            result: verdict.threat_name().to_string(),
            engine: verdict.engine_version().to_string(),
            database: verdict.definition_version().to_string(),
            updated: verdict.definition_date().to_string(),
            markdown: None,
        }
    }

    /// Builds the document including the rendered table, if attached.
    pub fn with_markdown(verdict: &Verdict) -> Self {
        Self {
            markdown: verdict.rendered_table().map(str::to_string),
            ..Self::from_verdict(verdict)
        }
    }
}

/// Renders `{"<engine>": {...}}`.
#[derive(Debug, Clone)]
pub struct JsonRenderer {
    engine: String,
}

impl JsonRenderer {
    /// Creates a renderer keyed by the given engine name.
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
        }
    }

    /// Builds the JSON value without serializing it.
    pub fn to_value(&self, verdict: &Verdict) -> Result<serde_json::Value, ScanError> {
        serde_json::to_value(self.document(verdict)).map_err(|e| ScanError::render(e.to_string()))
    }

    fn document<'a>(&'a self, verdict: &Verdict) -> BTreeMap<&'a str, VerdictDocument> {
        BTreeMap::from([(self.engine.as_str(), VerdictDocument::from_verdict(verdict))])
    }
}

impl Renderer for JsonRenderer {
    fn render(&self, verdict: &Verdict) -> Result<String, ScanError> {
        serde_json::to_string(&self.document(verdict)).map_err(|e| ScanError::render(e.to_string()))
    }
}
