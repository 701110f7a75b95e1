//! HTTP scan service.
//!
//! A single route, `POST /scan`, accepts a multipart upload in the
//! `malware` field, stages it to a temporary file, scans it and answers
//! with the JSON verdict. Each request gets its own temp file and engine
//! process; the temp file is removed when the request finishes.

use crate::core::{ErrorCategory, FileInput, ScanError, ScanRequest};
use crate::manager::ScanManager;
use crate::render::{JsonRenderer, Renderer};

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Multipart field holding the uploaded file.
pub const UPLOAD_FIELD: &str = "malware";

/// Body returned when no usable upload was supplied.
pub const MISSING_FILE_MESSAGE: &str = "Please supply a valid file to scan.";

/// Body returned when the upload exceeds the body limit.
pub const TOO_LARGE_MESSAGE: &str = "Uploaded file is too large.";

/// HTTP service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub address: SocketAddr,

    /// Directory uploads are staged in.
    pub upload_dir: PathBuf,

    /// Maximum accepted request body, in bytes.
    pub body_limit: usize,

    /// Per-step scan timeout.
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 3993)),
            upload_dir: PathBuf::from("/malware"),
            body_limit: 100 * 1024 * 1024, // 100 MiB
            timeout: Duration::from_secs(120),
        }
    }
}

impl ServerConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the listen port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.address.set_port(port);
        self
    }

    /// Sets the listen address.
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = address;
        self
    }

    /// Sets the upload staging directory.
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// Sets the request body limit.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Sets the scan timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug)]
struct AppState {
    manager: ScanManager,
    renderer: JsonRenderer,
    config: ServerConfig,
}

/// Builds the router.
pub fn router(manager: ScanManager, config: ServerConfig) -> Router {
    let body_limit = config.body_limit;
    let state = AppState {
        renderer: JsonRenderer::new(manager.invoker().name()),
        manager,
        config,
    };

    Router::new()
        .route("/scan", post(scan_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(Arc::new(state))
}

/// Serves the router until Ctrl-C.
pub async fn serve(manager: ScanManager, config: ServerConfig) -> Result<(), ScanError> {
    let address = config.address;
    let listener = tokio::net::TcpListener::bind(address).await?;

    tracing::info!(
        plugin = %manager.invoker().name(),
        category = %manager.invoker().config().category,
        address = %address,
        "Web service listening"
    );

    axum::serve(listener, router(manager, config))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Could not install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down web service");
        })
        .await?;
    Ok(())
}

async fn scan_upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("scan_upload", request_id = %request_id);
    handle_upload(state, multipart).instrument(span).await
}

async fn handle_upload(
    state: Arc<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let input = match read_upload(multipart).await {
        Ok(input) => input,
        Err((status, reason)) => {
            tracing::error!(status = %status, reason = %reason, "Rejected upload");
            return rejected(status);
        }
    };

    tracing::debug!(filename = ?input.filename(), size = ?input.size_hint(), "Uploaded file");

    let staged = match input.stage(&state.config.upload_dir) {
        Ok(staged) => staged,
        Err(e) => return error_response(&e),
    };

    let request = ScanRequest::new(staged.path(), state.config.timeout);
    let result = state.manager.scan(request).await;
    drop(staged);

    match result.and_then(|verdict| state.renderer.render(&verdict)) {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            json,
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<FileInput, (StatusCode, String)> {
    let mut multipart = multipart.map_err(|e| (e.status(), e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(|e| (e.status(), e.body_text()))?;

        let input = FileInput::from_bytes(data.to_vec());
        return Ok(match filename {
            Some(name) => input.with_filename(name),
            None => input,
        });
    }

    Err((
        StatusCode::BAD_REQUEST,
        format!("multipart field '{}' is missing", UPLOAD_FIELD),
    ))
}

fn rejected(status: StatusCode) -> Response {
    let (status, message) = if status == StatusCode::PAYLOAD_TOO_LARGE {
        (status, TOO_LARGE_MESSAGE)
    } else {
        (StatusCode::BAD_REQUEST, MISSING_FILE_MESSAGE)
    };
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("{}\n", message),
    )
        .into_response()
}

fn status_for(error: &ScanError) -> StatusCode {
    match error.category() {
        ErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCategory::Process | ErrorCategory::Parse => StatusCode::BAD_GATEWAY,
        ErrorCategory::Configuration | ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &ScanError) -> Response {
    tracing::error!(
        category = %error.category(),
        component = error.component(),
        error = %error,
        "Scan request failed"
    );
    (
        status_for(error),
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        error.to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{EngineConfig, EngineInvoker, ScriptedResponse, ScriptedRunner};
    use crate::core::ProcessOutcome;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "avbridge-test-boundary";

    fn app(runner: ScriptedRunner, dir: &TempDir) -> Router {
        app_with(runner, dir, ServerConfig::new())
    }

    fn app_with(runner: ScriptedRunner, dir: &TempDir, config: ServerConfig) -> Router {
        std::fs::write(dir.path().join("UPDATED"), "20260110").unwrap();
        let runner = runner
            .with_response("start", ProcessOutcome::Success(String::new()))
            .with_response("-v", ProcessOutcome::Success("6.0.4.564".into()))
            .with_response("-V", ProcessOutcome::Success("9324".into()));
        let engine_config = EngineConfig::new().with_updated_marker(dir.path().join("UPDATED"));
        let invoker = EngineInvoker::new(engine_config, Arc::new(runner)).unwrap();
        let manager = ScanManager::builder().with_invoker(invoker).build().unwrap();

        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        router(
            manager,
            config
                .with_upload_dir(uploads)
                .with_timeout(Duration::from_secs(5)),
        )
    }

    fn multipart(field: &str, data: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"sample.exe\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{data}\r\n--{b}--\r\n",
            b = BOUNDARY,
        );
        Request::post("/scan")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn uploads_left(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path().join("uploads")).unwrap().count()
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let response = app(ScriptedRunner::new(), &dir)
            .oneshot(multipart("document", "hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(body_text(response).await.trim(), MISSING_FILE_MESSAGE);
    }

    #[tokio::test]
    async fn test_non_multipart_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let request = Request::post("/scan").body(Body::from("raw bytes")).unwrap();
        let response = app(ScriptedRunner::new(), &dir).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await.trim(), MISSING_FILE_MESSAGE);
    }

    #[tokio::test]
    async fn test_upload_is_scanned_and_removed() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().with_response(
            "-abfu",
            ProcessOutcome::ThreatSignaled("web_x\tEICAR test file NOT a virus.".into()),
        );
        let response = app(runner, &dir)
            .oneshot(multipart(UPLOAD_FIELD, "X5O!P%@AP"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json"));

        let value: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(value["mcafee"]["infected"], serde_json::json!(true));
        assert_eq!(value["mcafee"]["result"], serde_json::json!("EICAR test file NOT a virus."));
        assert_eq!(value["mcafee"]["updated"], serde_json::json!("20260110"));
        assert_eq!(uploads_left(&dir), 0);
    }

    #[tokio::test]
    async fn test_parse_failure_is_bad_gateway_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let runner =
            ScriptedRunner::new().with_response("-abfu", ProcessOutcome::Success("garbled".into()));
        let response = app(runner, &dir)
            .oneshot(multipart(UPLOAD_FIELD, "data"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(uploads_left(&dir), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_gateway_timeout() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().with_scripted(
            "-abfu",
            ScriptedResponse::Delayed(Duration::from_secs(60), ProcessOutcome::Success("x\t[OK]".into())),
        );
        let response = app(runner, &dir)
            .oneshot(multipart(UPLOAD_FIELD, "data"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(uploads_left(&dir), 0);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&ScanError::malformed("x")), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&ScanError::configuration("x")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_oversized_upload_is_payload_too_large() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        let app = app_with(runner, &dir, ServerConfig::new().with_body_limit(64));

        let response = app
            .oneshot(multipart(UPLOAD_FIELD, &"A".repeat(4096)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_text(response).await.trim(), TOO_LARGE_MESSAGE);
        assert_eq!(uploads_left(&dir), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_concurrent_uploads_get_own_verdicts() {
        use crate::backends::ProcessRunner;
        use std::os::unix::fs::PermissionsExt;

        const ENGINE: &str = r#"#!/bin/sh
case "$1" in
  -v) echo "6.0.4.564"; exit 0 ;;
  -V) echo "9324"; exit 0 ;;
  -abfu)
    sleep 0.2
    if grep -q EICAR "$2"; then
      printf '%s\tEICAR test file NOT a virus.\n' "$2"
      exit 1
    fi
    printf '%s\t[OK]\n' "$2"
    exit 0 ;;
esac
exit 3
"#;

        let dir = TempDir::new().unwrap();
        let engine = dir.path().join("scan");
        std::fs::write(&engine, ENGINE).unwrap();
        std::fs::set_permissions(&engine, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(dir.path().join("UPDATED"), "20260110").unwrap();

        let config = EngineConfig::new()
            .with_scan_program(engine.display().to_string())
            .with_daemon_command(None)
            .with_updated_marker(dir.path().join("UPDATED"));
        let invoker = EngineInvoker::new(config, Arc::new(ProcessRunner::new())).unwrap();
        let manager = ScanManager::builder().with_invoker(invoker).build().unwrap();
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        let app = router(
            manager,
            ServerConfig::new()
                .with_upload_dir(uploads)
                .with_timeout(Duration::from_secs(10)),
        );

        let (clean, infected) = tokio::join!(
            app.clone().oneshot(multipart(UPLOAD_FIELD, "hello")),
            app.clone().oneshot(multipart(UPLOAD_FIELD, "EICAR")),
        );
        let clean = clean.unwrap();
        let infected = infected.unwrap();
        assert_eq!(clean.status(), StatusCode::OK);
        assert_eq!(infected.status(), StatusCode::OK);

        let clean: serde_json::Value = serde_json::from_str(&body_text(clean).await).unwrap();
        let infected: serde_json::Value = serde_json::from_str(&body_text(infected).await).unwrap();
        assert_eq!(clean["mcafee"]["infected"], serde_json::json!(false));
        assert_eq!(clean["mcafee"]["result"], serde_json::json!(""));
        assert_eq!(infected["mcafee"]["infected"], serde_json::json!(true));
        assert_eq!(
            infected["mcafee"]["result"],
            serde_json::json!("EICAR test file NOT a virus.")
        );
        assert_eq!(uploads_left(&dir), 0);
    }
}
