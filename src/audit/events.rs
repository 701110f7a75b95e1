//! Audit event types and emission functions.

use crate::core::{ScanError, ScanRequest, Verdict};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Audit record for a completed scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanAuditEvent {
    /// Event type.
    pub event_type: String,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Engine that performed the scan.
    pub engine: String,

    /// Scanned file.
    pub path: String,

    /// Whether a threat was found.
    pub infected: bool,

    /// Threat name, empty when clean.
    pub result: String,

    /// Number of scan attempts, including the retry.
    pub attempts: u32,

    /// Scan duration in milliseconds.
    pub duration_ms: u64,
}

impl ScanAuditEvent {
    /// Builds the audit record for a verdict.
    pub fn from_verdict(
        engine: &str,
        request: &ScanRequest,
        verdict: &Verdict,
        attempts: u32,
        duration: Duration,
    ) -> Self {
        Self {
            event_type: "scan_verdict".to_string(),
            timestamp: Utc::now(),
            engine: engine.to_string(),
            path: request.path().display().to_string(),
            infected: verdict.is_infected(),
            result: verdict.threat_name().to_string(),
            attempts,
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Emits an audit event when a scan starts.
pub fn emit_scan_started(engine: &str, request: &ScanRequest) {
    tracing::info!(
        target: "avbridge::audit",
        event_type = "scan_started",
        engine = %engine,
        path = %request.path().display(),
        timeout_secs = request.timeout().as_secs(),
        "Scan started"
    );
}

/// Emits an audit event for a verdict.
pub fn emit_scan_verdict(event: &ScanAuditEvent) {
    tracing::info!(
        target: "avbridge::audit",
        event_type = %event.event_type,
        engine = %event.engine,
        path = %event.path,
        infected = event.infected,
        result = %event.result,
        attempts = event.attempts,
        duration_ms = event.duration_ms,
        "Scan completed"
    );
}

/// Emits an audit event for a scan that ended without a verdict.
pub fn emit_scan_failed(engine: &str, request: &ScanRequest, error: &ScanError, duration: Duration) {
    tracing::warn!(
        target: "avbridge::audit",
        event_type = "scan_failed",
        engine = %engine,
        path = %request.path().display(),
        category = %error.category(),
        component = error.component(),
        duration_ms = duration.as_millis() as u64,
        error = %error,
        "Scan failed"
    );
}

/// Emits an audit event for the license check.
pub fn emit_license_status(engine: &str, license: &str, expired: bool) {
    if expired {
        tracing::error!(
            target: "avbridge::audit",
            event_type = "license_status",
            engine = %engine,
            license = %license,
            expired,
            "{} license has expired", engine
        );
    } else {
        tracing::debug!(
            target: "avbridge::audit",
            event_type = "license_status",
            engine = %engine,
            license = %license,
            expired,
            "License is valid"
        );
    }
}
