//! # avbridge
//!
//! Normalized verdicts from a command-line antivirus engine.
//!
//! ## Overview
//!
//! avbridge wraps a scan engine that ships as a daemon plus a command-line
//! scanner (McAfee VirusScan for Linux out of the box) and turns its
//! unstructured output into a structured verdict:
//!
//! - Run the engine as a bounded-time subprocess, killing it on timeout
//! - Parse its output into clean / infected / unparseable, retrying once
//! - Stamp the verdict with engine and definition versions
//! - Render the verdict as JSON or as a Markdown table
//! - Store verdicts in Elasticsearch or post them to a webhook
//! - Serve the whole pipeline over a CLI and an HTTP endpoint
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use avbridge::backends::{EngineConfig, EngineInvoker, ProcessRunner};
//! use avbridge::render::{JsonRenderer, Renderer};
//! use avbridge::ScanManager;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let invoker = EngineInvoker::new(EngineConfig::new(), Arc::new(ProcessRunner::new()))?;
//!     let manager = ScanManager::builder().with_invoker(invoker).build()?;
//!
//!     let verdict = manager.scan_path("/malware/sample.exe").await?;
//!     println!("{}", JsonRenderer::new("mcafee").render(&verdict)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Core**: Verdict, request and error types, the `CommandRunner` seam
//! - **Backends**: Process runner, engine commands, output parser
//! - **Manager**: Scan orchestration with a single retry on bad output
//! - **Render**: JSON and Markdown table encodings
//! - **Definitions**: License expiry and the `UPDATED` marker
//! - **Store** / **Webhook**: Where verdicts go after a scan
//! - **Audit**: Structured scan lifecycle events
//! - **Server** / **CLI**: Transport adapters

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod cli;
pub mod commands;
pub mod core;
pub mod definitions;
pub mod manager;
pub mod render;
pub mod server;
pub mod store;
pub mod webhook;

// Re-export commonly used types at the crate root
pub use crate::core::{
    CommandRunner, CommandSpec, EngineMetadata, ErrorCategory, FileHasher, FileInput,
    ProcessOutcome, ScanError, ScanRequest, Verdict,
};

pub use crate::backends::{EngineConfig, EngineInvoker, ProcessRunner};
pub use crate::manager::{RetryConfig, ScanManager, ScanManagerConfig};
pub use crate::render::{OutputFormat, Renderer};
pub use crate::store::{StoredVerdict, VerdictStore};

/// Prelude module for convenient imports.
///
/// ```rust
/// use avbridge::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backends::{EngineConfig, EngineInvoker, ProcessRunner};
    pub use crate::core::{
        CommandRunner, CommandSpec, EngineMetadata, FileInput, ProcessOutcome, ScanError,
        ScanRequest, Verdict,
    };
    pub use crate::manager::{ScanManager, ScanManagerConfig};
    pub use crate::render::{JsonRenderer, OutputFormat, Renderer, TableRenderer};
    pub use crate::store::{StoredVerdict, VerdictStore};
}
