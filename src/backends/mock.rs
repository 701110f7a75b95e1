//! Scripted command runner for testing.
//!
//! `ScriptedRunner` answers commands from queued responses instead of
//! spawning processes, so the orchestration logic can be exercised without
//! a real scan engine installed.

use crate::core::{CommandRunner, CommandSpec, ProcessOutcome, ScanError};

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A scripted response for one command invocation.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Finish with the given outcome.
    Outcome(ProcessOutcome),
    /// Fail to spawn.
    SpawnError,
    /// Run for the given duration, then finish with the outcome. Subject to
    /// the caller's timeout.
    Delayed(Duration, ProcessOutcome),
}

/// A command runner that replays scripted responses.
///
/// Responses are keyed by the first argument of the command (or the
/// program name when there are no arguments), which is enough to tell the
/// scan, version, and daemon commands apart. Each key holds a queue; the
/// last response in a queue is repeated once the queue drains.
///
/// # Examples
///
/// ```rust
/// use avbridge::backends::ScriptedRunner;
/// use avbridge::core::ProcessOutcome;
///
/// let runner = ScriptedRunner::new()
///     .with_response("-abfu", ProcessOutcome::Success("sample.exe\t[OK]".into()))
///     .with_response("-v", ProcessOutcome::Success("6.0.4".into()));
/// assert_eq!(runner.call_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, VecDeque<ScriptedResponse>>>,
    calls: Mutex<Vec<CommandSpec>>,
    call_count: AtomicU64,
}

impl ScriptedRunner {
    /// Creates a runner with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an outcome for commands with the given key.
    pub fn with_response(self, key: impl Into<String>, outcome: ProcessOutcome) -> Self {
        self.push(key, ScriptedResponse::Outcome(outcome));
        self
    }

    /// Queues an arbitrary scripted response.
    pub fn with_scripted(self, key: impl Into<String>, response: ScriptedResponse) -> Self {
        self.push(key, response);
        self
    }

    /// Queues a response (mutable version).
    pub fn push(&self, key: impl Into<String>, response: ScriptedResponse) {
        self.responses
            .lock()
            .unwrap()
            .entry(key.into())
            .or_default()
            .push_back(response);
    }

    /// Returns the number of commands run.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Returns how many commands matched the given key.
    pub fn calls_for(&self, key: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| Self::key_of(c) == key)
            .count()
    }

    /// Returns every command run so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    fn key_of(command: &CommandSpec) -> &str {
        command
            .args
            .first()
            .map(String::as_str)
            .unwrap_or(command.program.as_str())
    }

    fn next_response(&self, key: &str) -> Option<ScriptedResponse> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &CommandSpec, timeout: Duration) -> Result<ProcessOutcome, ScanError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.calls.lock().unwrap().push(command.clone());

        let key = Self::key_of(command).to_string();
        let response = self.next_response(&key).ok_or_else(|| ScanError::Spawn {
            program: command.program.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no scripted response for '{}'", key),
            ),
        })?;

        match response {
            ScriptedResponse::Outcome(outcome) => Ok(outcome),
            ScriptedResponse::SpawnError => Err(ScanError::Spawn {
                program: command.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted spawn error"),
            }),
            ScriptedResponse::Delayed(latency, outcome) => {
                if latency > timeout {
                    tokio::time::sleep(timeout).await;
                    return Err(ScanError::timeout(&command.program, timeout));
                }
                tokio::time::sleep(latency).await;
                Ok(outcome)
            }
        }
    }
}
