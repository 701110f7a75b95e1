//! Core types used throughout the avbridge library.
//!
//! This module defines the verdict produced by a scan, the metadata that
//! accompanies it, and the request value threaded through the pipeline.

use crate::core::error::ScanError;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What the engine said about the file, before metadata is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// The engine reported the file as clean.
    Clean,
    /// The engine reported a detection with the given threat name.
    Infected {
        /// Signature or label reported by the engine.
        threat: String,
    },
}

impl Detection {
    /// Returns `true` if this detection is clean.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }
}

/// Engine and definition metadata stamped onto every verdict.
///
/// Gathered through separate engine queries; it never depends on whether
/// the scanned file was clean or infected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineMetadata {
    /// Engine version string.
    pub engine_version: String,
    /// Virus definition (DAT) version string.
    pub definition_version: String,
    /// Date the definitions were last refreshed, `YYYYMMDD`.
    pub definition_date: String,
}

impl EngineMetadata {
    /// Creates metadata from its three parts.
    pub fn new(
        engine_version: impl Into<String>,
        definition_version: impl Into<String>,
        definition_date: impl Into<String>,
    ) -> Self {
        Self {
            engine_version: engine_version.into(),
            definition_version: definition_version.into(),
            definition_date: definition_date.into(),
        }
    }
}

/// The normalized outcome of one scan attempt sequence.
///
/// A verdict is immutable once built. `infected` is `true` exactly when
/// `threat_name` is non-empty; the constructors enforce this. The only
/// mutable part is the rendered table, which transport layers may attach
/// or clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    infected: bool,
    threat_name: String,
    metadata: EngineMetadata,
    rendered_table: Option<String>,
}

impl Verdict {
    /// Creates a clean verdict.
    pub fn clean(metadata: EngineMetadata) -> Self {
        Self {
            infected: false,
            threat_name: String::new(),
            metadata,
            rendered_table: None,
        }
    }

    /// Creates an infected verdict.
    ///
    /// The threat name is trimmed and must not be empty.
    pub fn infected(
        threat_name: impl Into<String>,
        metadata: EngineMetadata,
    ) -> Result<Self, ScanError> {
        let threat_name = threat_name.into().trim().to_string();
        if threat_name.is_empty() {
            return Err(ScanError::malformed("detection reported without a threat name"));
        }
        Ok(Self {
            infected: true,
            threat_name,
            metadata,
            rendered_table: None,
        })
    }

    /// Creates a verdict from a parsed detection.
    pub fn from_detection(detection: Detection, metadata: EngineMetadata) -> Result<Self, ScanError> {
        match detection {
            Detection::Clean => Ok(Self::clean(metadata)),
            Detection::Infected { threat } => Self::infected(threat, metadata),
        }
    }

    /// Returns `true` if the engine found a threat.
    pub fn is_infected(&self) -> bool {
        self.infected
    }

    /// Returns the threat name; empty when clean.
    pub fn threat_name(&self) -> &str {
        &self.threat_name
    }

    /// Returns the engine version.
    pub fn engine_version(&self) -> &str {
        &self.metadata.engine_version
    }

    /// Returns the definition version.
    pub fn definition_version(&self) -> &str {
        &self.metadata.definition_version
    }

    /// Returns the definition date (`YYYYMMDD`).
    pub fn definition_date(&self) -> &str {
        &self.metadata.definition_date
    }

    /// Returns all metadata.
    pub fn metadata(&self) -> &EngineMetadata {
        &self.metadata
    }

    /// Returns the rendered table, if one was attached.
    pub fn rendered_table(&self) -> Option<&str> {
        self.rendered_table.as_deref()
    }

    /// Attaches a rendered table.
    pub fn with_rendered_table(mut self, table: impl Into<String>) -> Self {
        self.rendered_table = Some(table.into());
        self
    }

    /// Removes the rendered table.
    pub fn clear_rendered_table(&mut self) {
        self.rendered_table = None;
    }
}

/// A single scan request: which file, and how long each step may take.
///
/// Built by a transport adapter and owned by the orchestrator for the
/// duration of one scan. It is never shared between scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    path: PathBuf,
    timeout: Duration,
}

impl ScanRequest {
    /// Creates a new request.
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the per-step timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Display for ScanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
