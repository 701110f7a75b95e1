//! The main scan manager implementation.

use crate::backends::{parse_detection, EngineInvoker};
use crate::core::{Detection, ScanError, ScanRequest, Verdict};
use crate::manager::retry::RetryConfig;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// Configuration for the scan manager.
#[derive(Debug, Clone)]
pub struct ScanManagerConfig {
    /// Timeout for each engine step when a request does not carry its own.
    pub scan_timeout: Duration,

    /// Retry configuration.
    pub retry: RetryConfig,
}

impl Default for ScanManagerConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(120),
            retry: RetryConfig::default(),
        }
    }
}

impl ScanManagerConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scan timeout.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Phase of a single orchestration, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Starting the engine daemon.
    DaemonStarting,
    /// Running the scanner.
    Scanning,
    /// Scanner output was parsed.
    ParseOk,
    /// Scanner output could not be parsed.
    ParseFailed,
    /// Querying engine and definition versions.
    QueryingMetadata,
    /// A verdict was produced.
    Done,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DaemonStarting => "daemon_starting",
            Self::Scanning => "scanning",
            Self::ParseOk => "parse_ok",
            Self::ParseFailed => "parse_failed",
            Self::QueryingMetadata => "querying_metadata",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Builder for creating a `ScanManager`.
#[derive(Debug, Default)]
pub struct ScanManagerBuilder {
    invoker: Option<EngineInvoker>,
    config: ScanManagerConfig,
}

impl ScanManagerBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the engine invoker.
    pub fn with_invoker(mut self, invoker: EngineInvoker) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: ScanManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the scan manager.
    pub fn build(self) -> Result<ScanManager, ScanError> {
        let invoker = self
            .invoker
            .ok_or_else(|| ScanError::configuration("an engine invoker is required"))?;

        Ok(ScanManager {
            invoker,
            config: self.config,
        })
    }
}

/// Drives one engine through daemon start, scan, parse and metadata queries.
///
/// The manager holds no per-scan state, so one instance can serve
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct ScanManager {
    invoker: EngineInvoker,
    config: ScanManagerConfig,
}

impl ScanManager {
    /// Creates a new builder.
    pub fn builder() -> ScanManagerBuilder {
        ScanManagerBuilder::new()
    }

    /// Returns the engine invoker.
    pub fn invoker(&self) -> &EngineInvoker {
        &self.invoker
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &ScanManagerConfig {
        &self.config
    }

    /// Scans `path` with the configured timeout.
    pub async fn scan_path(&self, path: impl Into<PathBuf>) -> Result<Verdict, ScanError> {
        self.scan(ScanRequest::new(path, self.config.scan_timeout))
            .await
    }

    /// Scans the requested file and returns its verdict.
    ///
    /// Malformed output is retried within the same deadline; the daemon is
    /// only started once.
    pub async fn scan(&self, request: ScanRequest) -> Result<Verdict, ScanError> {
        let engine = self.invoker.name().to_string();
        let started = Instant::now();

        crate::audit::emit_scan_started(&engine, &request);

        match self.run(&request).await {
            Ok((verdict, attempts)) => {
                let event = crate::audit::ScanAuditEvent::from_verdict(
                    &engine,
                    &request,
                    &verdict,
                    attempts,
                    started.elapsed(),
                );
                crate::audit::emit_scan_verdict(&event);
                Ok(verdict)
            }
            Err(e) => {
                crate::audit::emit_scan_failed(&engine, &request, &e, started.elapsed());
                Err(e)
            }
        }
    }

    async fn run(&self, request: &ScanRequest) -> Result<(Verdict, u32), ScanError> {
        if !request.path().exists() {
            return Err(ScanError::FileNotFound {
                path: request.path().display().to_string(),
            });
        }

        self.enter(request, ScanPhase::DaemonStarting);
        self.invoker.ensure_daemon(request.timeout()).await?;

        let deadline = Instant::now() + request.timeout();
        let (detection, attempts) = self.detect(request, deadline).await?;

        self.enter(request, ScanPhase::QueryingMetadata);
        let metadata = self.invoker.metadata(deadline).await?;

        let verdict = Verdict::from_detection(detection, metadata)?;
        self.enter(request, ScanPhase::Done);
        Ok((verdict, attempts))
    }

    async fn detect(
        &self,
        request: &ScanRequest,
        deadline: Instant,
    ) -> Result<(Detection, u32), ScanError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.enter(request, ScanPhase::Scanning);

            let result = match self.invoker.scan(request, deadline).await {
                Ok(output) => parse_detection(&output),
                Err(e) => Err(e),
            };

            match result {
                Ok(detection) => {
                    self.enter(request, ScanPhase::ParseOk);
                    return Ok((detection, attempt));
                }
                Err(e) if self.config.retry.should_retry_error(attempt, &e) => {
                    self.enter(request, ScanPhase::ParseFailed);
                    tracing::warn!(
                        engine = %self.invoker.name(),
                        path = %request,
                        attempt,
                        error = %e,
                        "Unparseable engine output, retrying scan"
                    );
                }
                Err(e) => {
                    if e.is_recoverable() {
                        self.enter(request, ScanPhase::ParseFailed);
                    }
                    return Err(e);
                }
            }
        }
    }

    fn enter(&self, request: &ScanRequest, phase: ScanPhase) {
        tracing::debug!(engine = %self.invoker.name(), path = %request, phase = %phase, "Scan phase");
    }
}
