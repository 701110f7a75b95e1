//! Core traits for the avbridge library.
//!
//! This module defines the `CommandRunner` trait, the seam between the
//! scan pipeline and the operating system. The production runner spawns
//! real processes; tests substitute a scripted one.

use crate::core::error::ScanError;
use crate::core::result::ProcessOutcome;

use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::time::Duration;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Creates a command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Parses a whitespace-separated command line.
    ///
    /// Returns `None` for an empty or blank string. No shell quoting is
    /// interpreted.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).args(parts))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs external commands under a deadline.
///
/// # Implementation Notes
///
/// - Exit codes 0 and 1 come back as `Ok`; callers interpret them through
///   [`ProcessOutcome`].
/// - A run that exceeds `timeout` must return [`ScanError::Timeout`], and
///   the child must already be terminated and reaped when it does.
/// - Spawn failures are reported as [`ScanError::Spawn`].
#[async_trait]
pub trait CommandRunner: Send + Sync + Debug {
    /// Runs `command` and waits at most `timeout` for it to finish.
    async fn run(&self, command: &CommandSpec, timeout: Duration) -> Result<ProcessOutcome, ScanError>;
}

/// An arc-wrapped runner for shared ownership.
pub type ArcRunner = std::sync::Arc<dyn CommandRunner>;
