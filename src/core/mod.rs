//! Core types and traits for the avbridge library.
//!
//! This module provides the fundamental building blocks used throughout
//! the library:
//!
//! - [`types`] - `Verdict`, `EngineMetadata`, `ScanRequest`
//! - [`traits`] - The `CommandRunner` trait and `CommandSpec`
//! - [`result`] - `ProcessOutcome`, the tagged result of an engine process
//! - [`error`] - Structured error types
//! - [`input`] - File input and upload staging
//! - [`hasher`] - SHA-256 file hashing

pub mod error;
pub mod hasher;
pub mod input;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types at the core level
pub use error::{ErrorCategory, ScanError, StoreError, WebhookError};
pub use hasher::FileHasher;
pub use input::{FileInput, StagedFile};
pub use result::ProcessOutcome;
pub use traits::{ArcRunner, CommandRunner, CommandSpec};
pub use types::{Detection, EngineMetadata, ScanRequest, Verdict};
