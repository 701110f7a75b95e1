//! License expiry check.
//!
//! The engine's license file is a list of `key=value` lines. The
//! `UpdateValidThru` entry holds the Unix timestamp after which definition
//! updates stop. The check is advisory: callers report an expired license
//! but keep scanning.

use crate::core::ScanError;

use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};

/// Default license location for the McAfee engine.
pub const DEFAULT_LICENSE_PATH: &str = "/etc/mcafee/license.mcafeelic";

const VALID_THRU_KEY: &str = "UpdateValidThru";

/// Reads the license file and reports whether definition updates expired.
#[derive(Debug, Clone)]
pub struct LicenseChecker {
    path: PathBuf,
}

impl Default for LicenseChecker {
    fn default() -> Self {
        Self::new(DEFAULT_LICENSE_PATH)
    }
}

impl LicenseChecker {
    /// Creates a checker for the license at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the license file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the license expired before now.
    ///
    /// # Errors
    ///
    /// A missing license file is a configuration fault. A license that is
    /// present but has no usable `UpdateValidThru` entry is logged and
    /// treated as not expired.
    pub fn is_expired(&self) -> Result<bool, ScanError> {
        self.is_expired_at(Utc::now())
    }

    /// Returns `true` if the license expired before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> Result<bool, ScanError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScanError::configuration(format!(
                    "could not find license file {}",
                    self.path.display()
                )));
            }
            Err(e) => return Err(ScanError::Io(e)),
        };

        let Some(expires) = valid_thru(&contents) else {
            tracing::error!(
                license = %self.path.display(),
                "could not find expiration date in license file"
            );
            return Ok(false);
        };

        let expired = expires < now;
        tracing::debug!(
            license = %self.path.display(),
            expires = %expires,
            expired,
            "License expiry checked"
        );
        Ok(expired)
    }
}

/// Extracts the `UpdateValidThru` timestamp from license text.
fn valid_thru(contents: &str) -> Option<DateTime<Utc>> {
    let raw = contents.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        (key.trim() == VALID_THRU_KEY).then(|| value.trim())
    })?;

    match raw.parse::<i64>() {
        Ok(secs) => Utc.timestamp_opt(secs, 0).single(),
        Err(e) => {
            tracing::warn!(value = %raw, error = %e, "UpdateValidThru is not a Unix timestamp");
            None
        }
    }
}
