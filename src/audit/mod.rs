//! Structured audit logging.
//!
//! Scan lifecycle events are emitted through `tracing` under the
//! `avbridge::audit` target, so any subscriber (JSON file, log shipper) can
//! capture them separately from diagnostic logs.

mod events;

pub use events::{
    emit_license_status, emit_scan_failed, emit_scan_started, emit_scan_verdict, ScanAuditEvent,
};
