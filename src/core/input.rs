//! File input abstraction.
//!
//! The engine only scans files on disk. `FileInput` accepts either a path or
//! an in-memory upload; uploads are staged into a temporary file whose
//! lifetime is tied to a [`StagedFile`] guard.

use crate::core::error::ScanError;

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File input from a path or from uploaded bytes.
///
/// # Examples
///
/// ```rust
/// use avbridge::core::FileInput;
///
/// let input = FileInput::from_path("/malware/sample.exe");
/// assert_eq!(input.filename(), Some("sample.exe"));
///
/// let input = FileInput::from_bytes(vec![0x4D, 0x5A]).with_filename("upload.exe");
/// assert_eq!(input.size_hint(), Some(2));
/// ```
#[derive(Clone)]
pub enum FileInput {
    /// A file path on disk.
    Path(PathBuf),

    /// In-memory bytes with optional filename.
    Bytes {
        /// The file data.
        data: Vec<u8>,
        /// Optional original filename.
        filename: Option<String>,
    },
}

impl std::fmt::Debug for FileInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes { data, filename } => f
                .debug_struct("Bytes")
                .field("data_len", &data.len())
                .field("filename", filename)
                .finish(),
        }
    }
}

impl FileInput {
    /// Creates a `FileInput` from a file path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Creates a `FileInput` from bytes.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            data: data.into(),
            filename: None,
        }
    }

    /// Sets the filename for bytes inputs.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        if let Self::Bytes { filename: f, .. } = &mut self {
            *f = Some(filename.into());
        }
        self
    }

    /// Returns the filename, if known.
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Path(path) => path.file_name().and_then(|n| n.to_str()),
            Self::Bytes { filename, .. } => filename.as_deref(),
        }
    }

    /// Returns the size in bytes when it is known without touching disk.
    pub fn size_hint(&self) -> Option<u64> {
        match self {
            Self::Path(_) => None,
            Self::Bytes { data, .. } => Some(data.len() as u64),
        }
    }

    /// Makes the input available as a file on disk.
    ///
    /// A path input is resolved to an absolute path and checked for
    /// existence. A bytes input is written to a new temporary file in
    /// `dir` (named `web_*`), which is deleted when the returned guard is
    /// dropped.
    pub fn stage(self, dir: &Path) -> Result<StagedFile, ScanError> {
        match self {
            Self::Path(path) => {
                let path = std::path::absolute(&path).unwrap_or(path);
                if !path.exists() {
                    return Err(ScanError::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                Ok(StagedFile {
                    path,
                    temp: None,
                })
            }
            Self::Bytes { data, .. } => {
                let mut temp = tempfile::Builder::new().prefix("web_").tempfile_in(dir)?;
                temp.write_all(&data)?;
                temp.flush()?;
                Ok(StagedFile {
                    path: temp.path().to_path_buf(),
                    temp: Some(temp),
                })
            }
        }
    }
}

impl From<PathBuf> for FileInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for FileInput {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for FileInput {
    fn from(data: Vec<u8>) -> Self {
        Self::from_bytes(data)
    }
}

/// A file ready for scanning.
///
/// When backed by a temporary file, the file is removed on drop, on the
/// success path as well as on every error path.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    temp: Option<NamedTempFile>,
}

impl StagedFile {
    /// Returns the path to scan.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if this file is a temporary copy that will be deleted.
    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }
}
