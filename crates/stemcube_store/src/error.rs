//! Error types for store operations.

use thiserror::Error;

/// Errors that can occur while reading or writing a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The HDF5 library rejected an operation (not an HDF5 file, I/O failure, ...)
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// No group or dataset exists at the given path
    #[error("No such node: '{path}'")]
    MissingNode {
        /// The missing node path
        path: String,
    },

    /// A node exists but has the wrong kind for the requested operation
    #[error("Node '{path}' is not a {expected}")]
    WrongKind {
        /// The offending node path
        path: String,
        /// What the caller expected ("group" or "dataset")
        expected: &'static str,
    },

    /// The node was already written
    #[error("Node already exists: '{path}'")]
    Duplicate {
        /// The duplicated node path
        path: String,
    },

    /// Dataset cannot be read as a numeric array of the requested shape
    #[error("Unsupported array at '{path}': {message}")]
    Array {
        /// Dataset path
        path: String,
        /// Description of the problem
        message: String,
    },

    /// Attribute could not be read or written
    #[error("Invalid attribute '{name}' at '{path}': {message}")]
    Attribute {
        /// Node owning the attribute
        path: String,
        /// Attribute name
        name: String,
        /// Description of the problem
        message: String,
    },
}

impl StoreError {
    /// Create a missing node error.
    pub fn missing(path: impl Into<String>) -> Self {
        Self::MissingNode { path: path.into() }
    }

    /// Create an unsupported array error.
    pub fn array(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Array {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an attribute error.
    pub fn attribute(
        path: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Attribute {
            path: path.into(),
            name: name.into(),
            message: message.into(),
        }
    }
}
