//! Error types for datacube loading.

use std::path::PathBuf;

use stemcube_store::StoreError;
use thiserror::Error;

use crate::data::ReaderError;

/// Errors that can occur while loading or saving a datacube.
///
/// Only [`LoadError::CorruptContainer`] and [`LoadError::UnsupportedVersion`]
/// reach callers of the lenient outer loader; everything else is absorbed by
/// the fallback policy.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be opened or parsed as a container at all
    #[error("Unreadable file {path:?}: {source}")]
    UnreadableFile {
        /// Path that was inspected
        path: PathBuf,
        /// Why the container could not be opened
        source: StoreError,
    },

    /// A self-declared native container is structurally broken
    #[error("Corrupt container {path:?}: {message}")]
    CorruptContainer {
        /// Path of the container
        path: PathBuf,
        /// What is wrong with it
        message: String,
    },

    /// A native container declares a schema revision this reader cannot handle
    #[error("Unsupported container version {major}.{minor} in {path:?} (supported: {supported}.x)")]
    UnsupportedVersion {
        /// Path of the container
        path: PathBuf,
        /// Declared major version
        major: i64,
        /// Declared minor version
        minor: i64,
        /// Newest supported major version
        supported: i64,
    },

    /// A foreign array has a rank other than 3 or 4
    #[error("Unsupported array shape {shape:?} (expected 3 or 4 dimensions)")]
    UnsupportedShape {
        /// Shape of the extracted array
        shape: Vec<usize>,
    },

    /// A foreign reader could not extract data from the file
    #[error("Failed to load {path:?}: {source}")]
    ExternalLoadFailure {
        /// Path that was read
        path: PathBuf,
        /// Reader failure
        source: ReaderError,
    },

    /// Writing a native container failed
    #[error("Failed to write {path:?}: {source}")]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying store error
        source: StoreError,
    },
}

impl LoadError {
    /// Create a corrupt container error.
    pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CorruptContainer {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an external load failure.
    pub fn external(path: impl Into<PathBuf>, source: impl Into<ReaderError>) -> Self {
        Self::ExternalLoadFailure {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Whether this error is fatal even for the lenient loader.
    ///
    /// A file that declares itself native but cannot be read as such is
    /// reported instead of being replaced by a placeholder.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LoadError::CorruptContainer { .. } | LoadError::UnsupportedVersion { .. }
        )
    }
}
