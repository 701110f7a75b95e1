//! Verdict rendering.
//!
//! A verdict is presented either as a JSON document keyed by engine name
//! or as a Markdown table for human consumption. Both go through the
//! [`Renderer`] trait so transport adapters can pick one at runtime.

mod json;
mod table;

pub use json::{JsonRenderer, VerdictDocument};
pub use table::TableRenderer;

use crate::backends::EngineConfig;
use crate::core::{ScanError, Verdict};

use std::fmt::Debug;
use std::str::FromStr;

/// Turns a verdict into text.
///
/// Rendering never mutates the verdict; a failure leaves it usable.
pub trait Renderer: Send + Sync + Debug {
    /// Renders the verdict.
    fn render(&self, verdict: &Verdict) -> Result<String, ScanError>;
}

/// The output format selected by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON document keyed by engine name.
    #[default]
    Json,
    /// Markdown table.
    Table,
}

impl OutputFormat {
    /// Returns the renderer for this format, labelled for `engine`.
    pub fn renderer(self, engine: &EngineConfig) -> Box<dyn Renderer> {
        match self {
            Self::Json => Box::new(JsonRenderer::new(&engine.name)),
            Self::Table => Box::new(TableRenderer::new(&engine.title)),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "table" | "markdown" => Ok(Self::Table),
            other => Err(ScanError::configuration(format!("unknown output format '{}'", other))),
        }
    }
}
