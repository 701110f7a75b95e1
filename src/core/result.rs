//! Process result structures.
//!
//! The scan engine overloads its exit status: `0` means the file is clean,
//! `1` means a threat was found, anything else is a failure. This module
//! models that convention as a tagged result instead of folding it into
//! generic error handling.

use crate::core::error::ScanError;

/// Exit code the engine uses to signal a detection.
pub const THREAT_EXIT_CODE: i32 = 1;

/// Outcome of one completed engine process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Exit code 0.
    Success(String),

    /// Exit code 1: the engine found something. The text still carries the
    /// verdict and must be parsed.
    ThreatSignaled(String),

    /// Any other exit, including termination by a signal.
    Failed {
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
        /// Captured stdout followed by stderr.
        output: String,
    },
}

impl ProcessOutcome {
    /// Classifies an exit code and captured output.
    pub fn from_exit(code: Option<i32>, output: String) -> Self {
        match code {
            Some(0) => Self::Success(output),
            Some(THREAT_EXIT_CODE) => Self::ThreatSignaled(output),
            code => Self::Failed { code, output },
        }
    }

    /// Returns `true` for exit codes 0 and 1.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Returns the captured text regardless of outcome.
    pub fn output(&self) -> &str {
        match self {
            Self::Success(text) | Self::ThreatSignaled(text) => text,
            Self::Failed { output, .. } => output,
        }
    }

    /// Returns the text of a successful run, or a `Process` error.
    pub fn into_text(self, program: &str) -> Result<String, ScanError> {
        match self {
            Self::Success(text) | Self::ThreatSignaled(text) => Ok(text),
            Self::Failed { code, output } => Err(ScanError::Process {
                program: program.to_string(),
                code,
                output: output.trim().to_string(),
            }),
        }
    }
}
