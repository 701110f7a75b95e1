//! Scan engine backend.
//!
//! This module contains everything that talks to the external engine:
//!
//! - [`process`] - Runs commands as child processes under a deadline
//! - [`engine`] - Engine configuration and the daemon/scan/version/update commands
//! - [`parser`] - Turns the engine's text output into a verdict
//! - [`mock`] - A scripted runner for testing
//!
//! ## Substituting the process layer
//!
//! The engine is reached only through the [`CommandRunner`] trait, so a
//! different transport (SSH, a container exec API) can be plugged in:
//!
//! ```rust,ignore
//! use avbridge::core::{CommandRunner, CommandSpec, ProcessOutcome, ScanError};
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! pub struct ContainerRunner {
//!     container: String,
//! }
//!
//! #[async_trait]
//! impl CommandRunner for ContainerRunner {
//!     async fn run(&self, command: &CommandSpec, timeout: Duration) -> Result<ProcessOutcome, ScanError> {
//!         todo!()
//!     }
//! }
//! ```
//!
//! [`CommandRunner`]: crate::core::CommandRunner

pub mod engine;
pub mod mock;
pub mod parser;
pub mod process;

// Re-exports
pub use engine::{EngineConfig, EngineInvoker};
pub use mock::{ScriptedResponse, ScriptedRunner};
pub use parser::{parse_detection, parse_output, CLEAN_MARKER};
pub use process::ProcessRunner;
