//! The `UPDATED` marker: when definitions were last refreshed.
//!
//! `avbridge update` writes today's date (`YYYYMMDD`) to the marker. Scans
//! read it back as the definition date, falling back to the build date when
//! no update has run yet.

use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};

/// Default marker location.
pub const DEFAULT_UPDATED_PATH: &str = "/opt/malice/UPDATED";

/// Date baked in at compile time through `AVBRIDGE_BUILD_DATE`, if set.
pub const BUILD_DATE: &str = match option_env!("AVBRIDGE_BUILD_DATE") {
    Some(date) => date,
    None => "",
};

const DATE_FORMAT: &str = "%Y%m%d";

/// Reads and writes the definitions-refresh marker.
#[derive(Debug, Clone)]
pub struct UpdatedMarker {
    path: PathBuf,
    fallback: String,
}

impl Default for UpdatedMarker {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATED_PATH, BUILD_DATE)
    }
}

impl UpdatedMarker {
    /// Creates a marker at `path` with the given fallback date.
    pub fn new(path: impl Into<PathBuf>, fallback: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            fallback: fallback.into(),
        }
    }

    /// Returns the marker path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the definition date.
    ///
    /// Never fails: a missing or unreadable marker yields the fallback date.
    pub fn definition_date(&self) -> String {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.fallback.clone(),
            Err(e) => {
                tracing::warn!(
                    marker = %self.path.display(),
                    error = %e,
                    "Could not read definitions marker, using build date"
                );
                self.fallback.clone()
            }
        }
    }

    /// Records today's date (UTC) as the last refresh.
    pub fn touch(&self) -> std::io::Result<String> {
        self.write_date(Utc::now().date_naive())
    }

    /// Records `date` as the last refresh.
    pub fn write_date(&self, date: NaiveDate) -> std::io::Result<String> {
        let stamp = date.format(DATE_FORMAT).to_string();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, &stamp)?;
        tracing::debug!(marker = %self.path.display(), date = %stamp, "Definitions marker updated");
        Ok(stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_marker_uses_fallback() {
        let dir = TempDir::new().unwrap();
        let marker = UpdatedMarker::new(dir.path().join("UPDATED"), "20170801");
        assert_eq!(marker.definition_date(), "20170801");
    }

    #[test]
    fn test_marker_contents_are_trimmed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("UPDATED");
        std::fs::write(&path, "20260110\n").unwrap();

        let marker = UpdatedMarker::new(path, "20170801");
        assert_eq!(marker.definition_date(), "20260110");
    }

    #[test]
    fn test_write_date_round_trips() {
        let dir = TempDir::new().unwrap();
        let marker = UpdatedMarker::new(dir.path().join("malice").join("UPDATED"), "");

        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(marker.write_date(date).unwrap(), "20260307");
        assert_eq!(marker.definition_date(), "20260307");
    }

    #[test]
    fn test_touch_writes_eight_digits() {
        let dir = TempDir::new().unwrap();
        let marker = UpdatedMarker::new(dir.path().join("UPDATED"), "");
        let stamp = marker.touch().unwrap();
        assert_eq!(stamp.len(), 8);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }
}
