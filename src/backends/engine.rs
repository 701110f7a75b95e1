//! Command-line scan engine backend.
//!
//! This module drives a scan engine that ships as a command-line program
//! backed by a daemon, the way the McAfee VirusScan Command Line Scanner
//! works on Linux.
//!
//! # Requirements
//!
//! - The daemon must be startable through its init script
//! - The scanner binary must accept `-v`/`-V` version queries
//!
//! # Exit codes
//!
//! The scanner exits with `0` for a clean file and `1` for a detection.
//! Both are successful invocations; anything else is a process fault.

use crate::core::{ArcRunner, CommandSpec, EngineMetadata, ScanError, ScanRequest};
use crate::definitions::{UpdatedMarker, BUILD_DATE, DEFAULT_LICENSE_PATH, DEFAULT_UPDATED_PATH};

use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine name used as the JSON key and in logs.
    pub name: String,

    /// Human-readable engine name used in table headings.
    pub title: String,

    /// Plugin category reported to the document store.
    pub category: String,

    /// Path to the scanner binary.
    pub scan_program: String,

    /// Arguments placed before the file path when scanning.
    pub scan_args: Vec<String>,

    /// Arguments that print the engine version.
    pub version_args: Vec<String>,

    /// Arguments that print the definitions version.
    pub database_args: Vec<String>,

    /// Command that starts the daemon, if the engine needs one.
    pub daemon_command: Option<CommandSpec>,

    /// Command that downloads new definitions.
    pub update_command: CommandSpec,

    /// Location of the `UPDATED` marker.
    pub updated_marker: PathBuf,

    /// Date reported when no update has been recorded.
    pub build_date: String,

    /// Location of the license file.
    pub license_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "mcafee".to_string(),
            title: "McAfee".to_string(),
            category: "av".to_string(),
            scan_program: "/bin/scan".to_string(),
            scan_args: vec!["-abfu".to_string()],
            version_args: vec!["-v".to_string()],
            database_args: vec!["-V".to_string()],
            daemon_command: Some(CommandSpec::new("/etc/init.d/mcafee").arg("start")),
            update_command: CommandSpec::new("/var/lib/mcafee/Setup/mcafee.vpsupdate"),
            updated_marker: PathBuf::from(DEFAULT_UPDATED_PATH),
            build_date: BUILD_DATE.to_string(),
            license_path: PathBuf::from(DEFAULT_LICENSE_PATH),
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the engine name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the engine title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the scanner binary.
    pub fn with_scan_program(mut self, program: impl Into<String>) -> Self {
        self.scan_program = program.into();
        self
    }

    /// Sets or clears the daemon start command.
    pub fn with_daemon_command(mut self, command: Option<CommandSpec>) -> Self {
        self.daemon_command = command;
        self
    }

    /// Sets the definitions update command.
    pub fn with_update_command(mut self, command: CommandSpec) -> Self {
        self.update_command = command;
        self
    }

    /// Sets the `UPDATED` marker path.
    pub fn with_updated_marker(mut self, path: impl Into<PathBuf>) -> Self {
        self.updated_marker = path.into();
        self
    }

    /// Sets the fallback definition date.
    pub fn with_build_date(mut self, date: impl Into<String>) -> Self {
        self.build_date = date.into();
        self
    }

    /// Sets the license file path.
    pub fn with_license_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.license_path = path.into();
        self
    }

    /// Returns the `UPDATED` marker for this engine.
    pub fn marker(&self) -> UpdatedMarker {
        UpdatedMarker::new(&self.updated_marker, &self.build_date)
    }

    fn scan_command(&self, request: &ScanRequest) -> CommandSpec {
        CommandSpec::new(&self.scan_program)
            .args(self.scan_args.iter().cloned())
            .arg(request.path().display().to_string())
    }

    fn query_command(&self, args: &[String]) -> CommandSpec {
        CommandSpec::new(&self.scan_program).args(args.iter().cloned())
    }
}

/// Runs the engine's commands through a [`CommandRunner`].
///
/// The invoker never retries; that policy belongs to the scan manager.
///
/// [`CommandRunner`]: crate::core::CommandRunner
#[derive(Debug, Clone)]
pub struct EngineInvoker {
    config: EngineConfig,
    runner: ArcRunner,
}

impl EngineInvoker {
    /// Creates a new invoker.
    pub fn new(config: EngineConfig, runner: ArcRunner) -> Result<Self, ScanError> {
        if config.scan_program.trim().is_empty() {
            return Err(ScanError::configuration("scan program must be specified"));
        }
        if config.name.trim().is_empty() {
            return Err(ScanError::configuration("engine name must be specified"));
        }

        Ok(Self { config, runner })
    }

    /// Returns the engine name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts the scan daemon.
    ///
    /// The daemon may already be running, so spawn failures and non-zero
    /// exits are logged and ignored. Running past `timeout` is fatal.
    pub async fn ensure_daemon(&self, timeout: Duration) -> Result<(), ScanError> {
        let Some(command) = &self.config.daemon_command else {
            return Ok(());
        };

        match self.runner.run(command, timeout).await {
            Ok(outcome) if outcome.is_success() => {
                tracing::debug!(engine = %self.config.name, command = %command, "Daemon started");
                Ok(())
            }
            Ok(outcome) => {
                tracing::warn!(
                    engine = %self.config.name,
                    command = %command,
                    output = %outcome.output().trim(),
                    "Daemon start command failed, continuing"
                );
                Ok(())
            }
            Err(e @ ScanError::Timeout { .. }) => Err(e),
            Err(e) => {
                tracing::warn!(
                    engine = %self.config.name,
                    command = %command,
                    error = %e,
                    "Could not run daemon start command, continuing"
                );
                Ok(())
            }
        }
    }

    /// Runs one scan of the requested file and returns the raw output.
    ///
    /// The run is bounded by whatever remains until `deadline`.
    pub async fn scan(&self, request: &ScanRequest, deadline: Instant) -> Result<String, ScanError> {
        let command = self.config.scan_command(request);

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ScanError::timeout(&command.program, request.timeout()));
        }

        self.runner
            .run(&command, remaining)
            .await?
            .into_text(&command.program)
    }

    /// Queries engine version, definitions version and definitions date.
    ///
    /// The version queries share the scan's `deadline`. The date comes from
    /// the `UPDATED` marker and cannot fail.
    pub async fn metadata(&self, deadline: Instant) -> Result<EngineMetadata, ScanError> {
        let engine_version = self.query(&self.config.version_args, deadline).await?;
        tracing::debug!(engine = %self.config.name, version = %engine_version, "Engine version");

        let definition_version = self.query(&self.config.database_args, deadline).await?;
        tracing::debug!(engine = %self.config.name, database = %definition_version, "Engine database");

        Ok(EngineMetadata {
            engine_version,
            definition_version,
            definition_date: self.config.marker().definition_date(),
        })
    }

    /// Downloads new definitions and records today's date in the marker.
    ///
    /// Returns the update command's output. The marker is only rewritten
    /// when the update command succeeds.
    pub async fn update_definitions(&self, timeout: Duration) -> Result<String, ScanError> {
        if let Some(command) = &self.config.daemon_command {
            if let Err(e) = self.runner.run(command, timeout).await {
                tracing::debug!(engine = %self.config.name, error = %e, "Daemon start before update failed");
            }
        }

        let command = &self.config.update_command;
        let output = self
            .runner
            .run(command, timeout)
            .await?
            .into_text(&command.program)?;

        let stamp = self.config.marker().touch()?;
        tracing::info!(engine = %self.config.name, updated = %stamp, "Definitions updated");
        Ok(output)
    }

    async fn query(&self, args: &[String], deadline: Instant) -> Result<String, ScanError> {
        let command = self.config.query_command(args);
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ScanError::timeout(&command.program, Duration::ZERO));
        }

        let text = self
            .runner
            .run(&command, remaining)
            .await?
            .into_text(&command.program)?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::{ScriptedResponse, ScriptedRunner};
    use crate::core::ProcessOutcome;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn invoker(runner: ScriptedRunner, dir: &TempDir) -> (EngineInvoker, Arc<ScriptedRunner>) {
        let runner = Arc::new(runner);
        let config = EngineConfig::new()
            .with_updated_marker(dir.path().join("UPDATED"))
            .with_build_date("20170801");
        (EngineInvoker::new(config, runner.clone()).unwrap(), runner)
    }

    #[tokio::test]
    async fn test_daemon_failure_is_ignored() {
        let dir = TempDir::new().unwrap();
        let (invoker, runner) = invoker(
            ScriptedRunner::new().with_scripted("start", ScriptedResponse::SpawnError),
            &dir,
        );
        invoker.ensure_daemon(Duration::from_secs(1)).await.unwrap();
        assert_eq!(runner.calls_for("start"), 1);
    }

    #[tokio::test]
    async fn test_daemon_nonzero_exit_is_ignored() {
        let dir = TempDir::new().unwrap();
        let (invoker, _) = invoker(
            ScriptedRunner::new().with_response(
                "start",
                ProcessOutcome::Failed {
                    code: Some(3),
                    output: "already running".into(),
                },
            ),
            &dir,
        );
        assert!(invoker.ensure_daemon(Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_daemon_timeout_is_fatal() {
        let dir = TempDir::new().unwrap();
        let (invoker, _) = invoker(
            ScriptedRunner::new().with_scripted(
                "start",
                ScriptedResponse::Delayed(Duration::from_secs(30), ProcessOutcome::Success(String::new())),
            ),
            &dir,
        );
        let err = invoker.ensure_daemon(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ScanError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_scan_passes_path_and_accepts_exit_one() {
        let dir = TempDir::new().unwrap();
        let (invoker, runner) = invoker(
            ScriptedRunner::new().with_response(
                "-abfu",
                ProcessOutcome::ThreatSignaled("/malware/x\tEICAR".into()),
            ),
            &dir,
        );
        let request = ScanRequest::new("/malware/x", Duration::from_secs(5));
        let deadline = Instant::now() + request.timeout();

        let text = invoker.scan(&request, deadline).await.unwrap();
        assert_eq!(text, "/malware/x\tEICAR");

        let calls = runner.calls();
        assert_eq!(calls[0].program, "/bin/scan");
        assert_eq!(calls[0].args, vec!["-abfu", "/malware/x"]);
    }

    #[tokio::test]
    async fn test_scan_other_exit_is_process_error() {
        let dir = TempDir::new().unwrap();
        let (invoker, _) = invoker(
            ScriptedRunner::new().with_response(
                "-abfu",
                ProcessOutcome::Failed {
                    code: Some(2),
                    output: "daemon not running".into(),
                },
            ),
            &dir,
        );
        let request = ScanRequest::new("/malware/x", Duration::from_secs(5));
        let err = invoker
            .scan(&request, Instant::now() + request.timeout())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Process { code: Some(2), .. }));
    }

    #[tokio::test]
    async fn test_metadata_trims_and_reads_marker() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("UPDATED"), "20260110").unwrap();
        let (invoker, _) = invoker(
            ScriptedRunner::new()
                .with_response("-v", ProcessOutcome::Success("6.0.4.564\n".into()))
                .with_response("-V", ProcessOutcome::ThreatSignaled(" 9324 \n".into())),
            &dir,
        );

        let deadline = Instant::now() + Duration::from_secs(1);
        let metadata = invoker.metadata(deadline).await.unwrap();
        assert_eq!(metadata, EngineMetadata::new("6.0.4.564", "9324", "20260110"));
    }

    #[tokio::test]
    async fn test_update_writes_marker_on_success() {
        let dir = TempDir::new().unwrap();
        let (invoker, _) = invoker(
            ScriptedRunner::new()
                .with_response("start", ProcessOutcome::Success(String::new()))
                .with_response(
                    "/var/lib/mcafee/Setup/mcafee.vpsupdate",
                    ProcessOutcome::Success("DATs updated".into()),
                ),
            &dir,
        );

        let output = invoker.update_definitions(Duration::from_secs(1)).await.unwrap();
        assert_eq!(output, "DATs updated");
        assert!(dir.path().join("UPDATED").exists());
    }

    #[tokio::test]
    async fn test_failed_update_keeps_marker() {
        let dir = TempDir::new().unwrap();
        let (invoker, _) = invoker(
            ScriptedRunner::new()
                .with_response("start", ProcessOutcome::Success(String::new()))
                .with_response(
                    "/var/lib/mcafee/Setup/mcafee.vpsupdate",
                    ProcessOutcome::Failed {
                        code: Some(4),
                        output: "download failed".into(),
                    },
                ),
            &dir,
        );

        assert!(invoker.update_definitions(Duration::from_secs(1)).await.is_err());
        assert!(!dir.path().join("UPDATED").exists());
    }

    #[test]
    fn test_config_requires_scan_program() {
        let config = EngineConfig::new().with_scan_program(" ");
        let result = EngineInvoker::new(config, Arc::new(ScriptedRunner::new()));
        assert!(matches!(result, Err(ScanError::Configuration { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_forking_daemon_start_returns_on_exit() {
        use crate::backends::ProcessRunner;

        let dir = TempDir::new().unwrap();
        let pid_file = dir.path().join("daemon.pid");
        let start = CommandSpec::new("sh")
            .arg("-c")
            .arg(format!("sleep 30 & echo $! > {}; echo started", pid_file.display()));
        let config = EngineConfig::new()
            .with_daemon_command(Some(start))
            .with_updated_marker(dir.path().join("UPDATED"));
        let invoker = EngineInvoker::new(config, Arc::new(ProcessRunner::new())).unwrap();

        invoker.ensure_daemon(Duration::from_secs(2)).await.unwrap();

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let _ = std::process::Command::new("kill").arg(pid.trim()).status();
    }
}
