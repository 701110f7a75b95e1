//! Error types for the avbridge library.
//!
//! Every failure is returned as a typed `Result`; nothing in the library
//! aborts the process. Transport adapters decide how a fatal error maps to
//! an exit code or an HTTP status.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a [`ScanError`], used for structured logging
/// and for mapping errors onto transport-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing license file, missing input path, bad settings.
    Configuration,
    /// The engine process could not be spawned or exited abnormally.
    Process,
    /// A deadline was exceeded on daemon start, scan, or metadata query.
    Timeout,
    /// The engine produced output that could not be parsed.
    Parse,
    /// Rendering or local I/O failures.
    Internal,
}

impl ErrorCategory {
    /// Returns the category as a stable lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Process => "process",
            Self::Timeout => "timeout",
            Self::Parse => "parse",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The main error type for scan operations.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Configuration error (missing license, bad settings).
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// The file to scan does not exist.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// The engine process could not be started.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The engine process exited with a code other than 0 or 1.
    #[error("'{program}' exited with {}: {output}", describe_code(*.code))]
    Process {
        /// Program that failed.
        program: String,
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
        /// Combined process output, trimmed.
        output: String,
    },

    /// A process ran past its deadline and was killed.
    #[error("'{program}' timed out after {elapsed:?}")]
    Timeout {
        /// Program that timed out.
        program: String,
        /// How long it ran before being killed.
        elapsed: Duration,
    },

    /// The engine output could not be turned into a verdict.
    #[error("malformed engine output: {details}")]
    MalformedOutput {
        /// What was wrong with the output.
        details: String,
    },

    /// A verdict could not be rendered.
    #[error("render error: {message}")]
    Render {
        /// Description of the rendering failure.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl ScanError {
    /// Returns `true` if this error may be retried.
    ///
    /// Only malformed output is recoverable; a broken process or an
    /// exhausted deadline is not expected to improve on a second attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedOutput { .. })
    }

    /// Returns the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } | Self::FileNotFound { .. } => ErrorCategory::Configuration,
            Self::Spawn { .. } | Self::Process { .. } => ErrorCategory::Process,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::MalformedOutput { .. } => ErrorCategory::Parse,
            Self::Render { .. } | Self::Io(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the name of the component that raised this error.
    pub fn component(&self) -> &'static str {
        match self {
            Self::Configuration { .. } | Self::FileNotFound { .. } => "orchestrator",
            Self::Spawn { .. } | Self::Process { .. } | Self::Timeout { .. } => "engine",
            Self::MalformedOutput { .. } => "parser",
            Self::Render { .. } => "renderer",
            Self::Io(_) => "io",
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(program: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            program: program.into(),
            elapsed,
        }
    }

    /// Creates a `MalformedOutput` error.
    pub fn malformed(details: impl Into<String>) -> Self {
        Self::MalformedOutput {
            details: details.into(),
        }
    }

    /// Creates a `Render` error.
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }
}

/// Error type for verdict store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("document store unreachable: {0}")]
    Connection(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("document store rejected request to {url}: {status}: {body}")]
    Rejected {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The store configuration is unusable.
    #[error("invalid document store configuration: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },
}

/// Error type for webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The webhook client could not be built or the request failed.
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("webhook endpoint returned {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// No endpoint was configured.
    #[error("no webhook endpoint configured")]
    MissingEndpoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_malformed_output_is_recoverable() {
        assert!(ScanError::malformed("no tab").is_recoverable());
        assert!(!ScanError::timeout("scan", Duration::from_secs(1)).is_recoverable());
        assert!(!ScanError::Process {
            program: "scan".into(),
            code: Some(2),
            output: String::new(),
        }
        .is_recoverable());
        assert!(!ScanError::configuration("missing license").is_recoverable());
    }

    #[test]
    fn test_category_and_component() {
        let err = ScanError::timeout("/bin/scan", Duration::from_secs(5));
        assert_eq!(err.category(), ErrorCategory::Timeout);
        assert_eq!(err.component(), "engine");

        let err = ScanError::malformed("missing field");
        assert_eq!(err.category(), ErrorCategory::Parse);
        assert_eq!(err.component(), "parser");

        let err = ScanError::FileNotFound {
            path: "/malware/x".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.category().to_string(), "configuration");
    }

    #[test]
    fn test_process_error_display() {
        let err = ScanError::Process {
            program: "/bin/scan".into(),
            code: Some(13),
            output: "license invalid".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit code 13"));
        assert!(msg.contains("license invalid"));

        let err = ScanError::Process {
            program: "/bin/scan".into(),
            code: None,
            output: String::new(),
        };
        assert!(err.to_string().contains("signal"));
    }
}
