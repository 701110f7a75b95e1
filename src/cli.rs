//! Command-line interface definition.

use crate::backends::EngineConfig;
use crate::core::{CommandSpec, ScanError};
use crate::render::OutputFormat;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Default port for the web service.
pub const DEFAULT_PORT: u16 = 3993;

/// Default upload staging directory for the web service.
pub const DEFAULT_UPLOAD_DIR: &str = "/malware";

/// Top-level arguments.
#[derive(Parser, Debug)]
#[command(
    name = "avbridge",
    version,
    about = "Antivirus engine bridge: scan a file and report a normalized verdict"
)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Elasticsearch URL to store results in
    #[arg(long, env = "MALICE_ELASTICSEARCH_URL", global = true)]
    pub elasticsearch: Option<String>,

    /// Output as a Markdown table
    #[arg(short, long, global = true)]
    pub table: bool,

    /// POST results to the webhook endpoint instead of printing them
    #[arg(short, long, global = true)]
    pub callback: bool,

    /// Webhook endpoint for --callback
    #[arg(long, env = "MALICE_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Proxy for the webhook endpoint
    #[arg(short = 'x', long, env = "MALICE_PROXY", global = true)]
    pub proxy: Option<String>,

    /// Timeout in seconds for each engine step
    #[arg(long, env = "MALICE_TIMEOUT", default_value_t = 120, global = true)]
    pub timeout: u64,

    /// Scan id used as the document id and webhook correlation id
    #[arg(long, env = "MALICE_SCANID", global = true)]
    pub scan_id: Option<String>,

    /// Engine location overrides
    #[command(flatten)]
    pub engine: EngineArgs,

    /// File to scan
    pub path: Option<PathBuf>,

    /// Subcommand; scans `path` when absent
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands. Without one, the positional path is scanned.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Scan a file
    Scan {
        /// File to scan
        path: PathBuf,
    },
    /// Update virus definitions
    #[command(alias = "u")]
    Update,
    /// Run the HTTP scan service
    Web {
        /// Listen port
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Directory uploads are staged in
        #[arg(long, env = "AVBRIDGE_UPLOAD_DIR", default_value = DEFAULT_UPLOAD_DIR)]
        upload_dir: PathBuf,

        /// Maximum upload size in bytes
        #[arg(long, default_value_t = 100 * 1024 * 1024)]
        body_limit: usize,
    },
}

/// Engine locations. Defaults match a stock McAfee install.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineArgs {
    /// Scanner binary
    #[arg(long, env = "AVBRIDGE_SCAN_BIN", global = true)]
    pub scan_bin: Option<String>,

    /// Daemon start command; empty disables the daemon start
    #[arg(long, env = "AVBRIDGE_DAEMON_CMD", global = true)]
    pub daemon_cmd: Option<String>,

    /// Definitions update command
    #[arg(long, env = "AVBRIDGE_UPDATE_CMD", global = true)]
    pub update_cmd: Option<String>,

    /// License file
    #[arg(long, env = "AVBRIDGE_LICENSE_FILE", global = true)]
    pub license_file: Option<PathBuf>,

    /// UPDATED marker file
    #[arg(long, env = "AVBRIDGE_UPDATED_FILE", global = true)]
    pub updated_file: Option<PathBuf>,
}

impl EngineArgs {
    /// Applies the overrides to the default engine configuration.
    pub fn to_config(&self) -> Result<EngineConfig, ScanError> {
        let mut config = EngineConfig::new();

        if let Some(program) = &self.scan_bin {
            config = config.with_scan_program(program);
        }
        if let Some(line) = &self.daemon_cmd {
            config = config.with_daemon_command(CommandSpec::parse(line));
        }
        if let Some(line) = &self.update_cmd {
            let command = CommandSpec::parse(line)
                .ok_or_else(|| ScanError::configuration("update command must not be empty"))?;
            config = config.with_update_command(command);
        }
        if let Some(path) = &self.license_file {
            config = config.with_license_path(path);
        }
        if let Some(path) = &self.updated_file {
            config = config.with_updated_marker(path);
        }

        Ok(config)
    }
}

/// What the invocation asks for, after resolving the default action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Scan the file.
    Scan(PathBuf),
    /// Refresh definitions.
    Update,
    /// Serve HTTP.
    Web {
        /// Listen port.
        port: u16,
        /// Upload staging directory.
        upload_dir: PathBuf,
        /// Body limit in bytes.
        body_limit: usize,
    },
}

impl Cli {
    /// Resolves the action to run.
    pub fn action(&self) -> Result<Action, ScanError> {
        match (&self.command, &self.path) {
            (Some(_), Some(path)) => Err(ScanError::configuration(format!(
                "unexpected path {} before subcommand",
                path.display()
            ))),
            (Some(Commands::Scan { path }), None) => Ok(Action::Scan(path.clone())),
            (Some(Commands::Update), None) => Ok(Action::Update),
            (
                Some(Commands::Web {
                    port,
                    upload_dir,
                    body_limit,
                }),
                None,
            ) => Ok(Action::Web {
                port: *port,
                upload_dir: upload_dir.clone(),
                body_limit: *body_limit,
            }),
            (None, Some(path)) => Ok(Action::Scan(path.clone())),
            (None, None) => Err(ScanError::configuration(
                "no file to scan; pass a path or a subcommand (see --help)",
            )),
        }
    }

    /// Returns the per-step timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Returns the selected output format.
    pub fn output_format(&self) -> OutputFormat {
        if self.table {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    }
}
