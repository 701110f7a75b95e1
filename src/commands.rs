//! Command handlers behind the CLI.

use crate::audit;
use crate::backends::{EngineConfig, EngineInvoker, ProcessRunner};
use crate::cli::{Action, Cli};
use crate::core::{
    ArcRunner, ErrorCategory, FileHasher, ScanError, ScanRequest, StoreError, WebhookError,
};
use crate::definitions::LicenseChecker;
use crate::manager::{ScanManager, ScanManagerConfig};
use crate::render::{JsonRenderer, OutputFormat, Renderer, TableRenderer};
use crate::server::{self, ServerConfig};
use crate::store::{ElasticsearchConfig, ElasticsearchStore, StoredVerdict, VerdictStore};
use crate::webhook::WebhookNotifier;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

const LICENSE_HINT: &str = "please get a new one here: https://www.mcafee.com/linux-server-antivirus";

/// Any failure a command can end with.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Scan, update, or configuration failure.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The verdict could not be stored.
    #[error("failed to index results: {0}")]
    Store(#[from] StoreError),

    /// The verdict could not be delivered.
    #[error("failed to post results: {0}")]
    Webhook(#[from] WebhookError),
}

impl CommandError {
    /// Returns the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Scan(e) => e.category(),
            Self::Store(StoreError::Configuration { .. })
            | Self::Webhook(WebhookError::MissingEndpoint) => ErrorCategory::Configuration,
            Self::Store(_) | Self::Webhook(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the component that raised the error.
    pub fn component(&self) -> &'static str {
        match self {
            Self::Scan(e) => e.component(),
            Self::Store(_) => "store",
            Self::Webhook(_) => "webhook",
        }
    }
}

/// Runs the action selected on the command line against the real engine.
pub async fn run(cli: &Cli) -> Result<(), CommandError> {
    run_with_runner(cli, Arc::new(ProcessRunner::new())).await
}

/// Runs the selected action with the given command runner.
pub async fn run_with_runner(cli: &Cli, runner: ArcRunner) -> Result<(), CommandError> {
    let config = cli.engine.to_config()?;

    match cli.action()? {
        Action::Scan(path) => {
            let output = run_scan(cli, config, runner, &path).await?;
            if let Some(output) = output {
                println!("{}", output);
            }
            Ok(())
        }
        Action::Update => run_update(cli, config, runner).await,
        Action::Web {
            port,
            upload_dir,
            body_limit,
        } => {
            let server_config = ServerConfig::new()
                .with_port(port)
                .with_upload_dir(upload_dir)
                .with_body_limit(body_limit)
                .with_timeout(cli.timeout());
            run_web(cli, config, runner, server_config).await
        }
    }
}

/// Scans `path` and returns what should be printed, or `None` when the
/// verdict was sent to the webhook instead.
pub async fn run_scan(
    cli: &Cli,
    config: EngineConfig,
    runner: ArcRunner,
    path: &Path,
) -> Result<Option<String>, CommandError> {
    let path = resolve(path)?;

    let license = LicenseChecker::new(&config.license_path);
    let expired = license.is_expired()?;
    audit::emit_license_status(&config.name, &license.path().display().to_string(), expired);
    if expired {
        tracing::error!(plugin = %config.name, "{}", LICENSE_HINT);
    }

    let manager = build_manager(cli, config, runner)?;
    let engine = manager.invoker().config().clone();

    let verdict = manager.scan(ScanRequest::new(&path, cli.timeout())).await?;
    let table = TableRenderer::new(&engine.title).render(&verdict)?;
    let mut verdict = verdict.with_rendered_table(table);

    let mut correlation_id = None;
    if let Some(url) = cli.elasticsearch.as_deref().filter(|u| !u.is_empty()) {
        let id = scan_id(cli, &path, &mut correlation_id)?;
        store_verdict(url, StoredVerdict::new(id, &engine.name, &engine.category, &verdict)).await?;
    }

    if cli.output_format() == OutputFormat::Table {
        return Ok(verdict.rendered_table().map(|t| t.trim_end().to_string()));
    }

    verdict.clear_rendered_table();
    let json = JsonRenderer::new(&engine.name).render(&verdict)?;

    if cli.callback {
        let id = scan_id(cli, &path, &mut correlation_id)?;
        let endpoint = cli
            .endpoint
            .as_deref()
            .ok_or(WebhookError::MissingEndpoint)?;
        WebhookNotifier::new(endpoint, cli.proxy.as_deref())?
            .notify(&id, json)
            .await?;
        return Ok(None);
    }

    Ok(Some(json))
}

/// Refreshes the engine's definitions.
pub async fn run_update(cli: &Cli, config: EngineConfig, runner: ArcRunner) -> Result<(), CommandError> {
    let manager = build_manager(cli, config, runner)?;
    let output = manager.invoker().update_definitions(cli.timeout()).await?;
    tracing::debug!(output = %output.trim(), "Update output");
    Ok(())
}

/// Serves the HTTP scan endpoint until interrupted.
pub async fn run_web(
    cli: &Cli,
    config: EngineConfig,
    runner: ArcRunner,
    server_config: ServerConfig,
) -> Result<(), CommandError> {
    std::fs::create_dir_all(&server_config.upload_dir).map_err(ScanError::from)?;
    let manager = build_manager(cli, config, runner)?;
    server::serve(manager, server_config).await?;
    Ok(())
}

fn build_manager(cli: &Cli, config: EngineConfig, runner: ArcRunner) -> Result<ScanManager, ScanError> {
    let invoker = EngineInvoker::new(config, runner)?;
    ScanManager::builder()
        .with_invoker(invoker)
        .with_config(ScanManagerConfig::new().with_scan_timeout(cli.timeout()))
        .build()
}

fn resolve(path: &Path) -> Result<PathBuf, ScanError> {
    let path = std::path::absolute(path)?;
    if !path.exists() {
        return Err(ScanError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(path)
}

fn scan_id(cli: &Cli, path: &Path, cached: &mut Option<String>) -> Result<String, ScanError> {
    if let Some(id) = cached {
        return Ok(id.clone());
    }
    let id = match cli.scan_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => FileHasher::new().hash_file(path)?,
    };
    *cached = Some(id.clone());
    Ok(id)
}

async fn store_verdict(url: &str, verdict: StoredVerdict) -> Result<(), StoreError> {
    let store = ElasticsearchStore::new(ElasticsearchConfig::new(url))?;
    store.init().await?;
    store.store(&verdict).await
}
