//! Scan orchestration.
//!
//! The `ScanManager` drives one engine through a scan: it starts the
//! daemon, runs the scanner under a single deadline, retries once on
//! unparseable output, and stamps the verdict with engine metadata.

mod retry;
mod scan_manager;

pub use retry::{RetryConfig, MAX_SCAN_ATTEMPTS};
pub use scan_manager::{ScanManager, ScanManagerBuilder, ScanManagerConfig, ScanPhase};
