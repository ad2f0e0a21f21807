//! Trait-based reading of foreign microscopy files.
//!
//! Foreign files are anything that is not a native container. Each supported
//! format implements `MicroscopyReader`, which turns raw file bytes into an
//! array plus two opaque metadata trees. The registry picks a reader by file
//! extension first, then by magic bytes, and finally tries every reader.
//!
//! ## Supported Formats
//!
//! - **NumPy Arrays**: `.npy` files of any common numeric dtype
//! - **MRC/CCP4**: image stacks with a 1024-byte header
//! - **TIFF**: grayscale pages, multi-page files stacked as `(pages, h, w)`
//! - **Standard Images**: PNG, JPEG, BMP, WebP (single frames)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stemcube::data::ReaderRegistry;
//!
//! let registry = ReaderRegistry::new();
//! let extracted = registry.read(&bytes, Some("scan.npy"))?;
//! ```

use ndarray::ArrayD;

use crate::data::ForeignMetadata;

/// Error type for reader operations.
#[derive(Debug, Clone)]
pub struct ReaderError {
    /// Human-readable error message.
    pub message: String,
    /// The reader that produced this error (if known).
    pub reader_id: Option<&'static str>,
}

impl ReaderError {
    /// Create a new reader error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            reader_id: None,
        }
    }

    /// Create an error with reader context.
    pub fn with_reader(mut self, reader_id: &'static str) -> Self {
        self.reader_id = Some(reader_id);
        self
    }
}

impl std::fmt::Display for ReaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(reader) = self.reader_id {
            write!(f, "[{}] {}", reader, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ReaderError {}

impl From<String> for ReaderError {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ReaderError {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<std::io::Error> for ReaderError {
    fn from(e: std::io::Error) -> Self {
        Self::new(format!("I/O error: {}", e))
    }
}

/// Array and metadata extracted from a foreign file.
///
/// The array keeps the rank found in the file; turning it into a 4D
/// datacube is the caller's job.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub array: ArrayD<f32>,
    pub metadata: ForeignMetadata,
}

/// Trait for foreign microscopy format readers.
pub trait MicroscopyReader: Send + Sync {
    /// Unique identifier for this reader (e.g., "npy", "mrc").
    fn id(&self) -> &'static str;

    /// Human-readable name for display.
    fn display_name(&self) -> &'static str;

    /// File extensions this reader handles (lowercase, without dots).
    fn extensions(&self) -> &'static [&'static str];

    /// Check if this reader can handle the given data.
    ///
    /// Used for format auto-detection when the file extension is unknown
    /// or misleading. Implementations should check magic bytes or headers.
    fn can_read(&self, data: &[u8]) -> bool;

    /// Extract the array and metadata trees from raw file bytes.
    fn read(&self, data: &[u8]) -> Result<Extracted, ReaderError>;

    /// Priority for format detection (higher = checked first).
    ///
    /// Specialized scientific formats should rank above generic images.
    fn priority(&self) -> i32 {
        0
    }
}

/// Registry of available foreign readers.
pub struct ReaderRegistry {
    readers: Vec<Box<dyn MicroscopyReader>>,
}

impl ReaderRegistry {
    /// Create a new registry with all built-in readers.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        // Order matters for priority ties
        registry.register(Box::new(super::readers::NpyReader));
        registry.register(Box::new(super::readers::MrcReader));
        registry.register(Box::new(super::readers::TiffReader));
        registry.register(Box::new(super::readers::ImageReader));

        registry
    }

    /// Create a registry with no readers.
    pub fn empty() -> Self {
        Self {
            readers: Vec::new(),
        }
    }

    /// Register a new reader.
    pub fn register(&mut self, reader: Box<dyn MicroscopyReader>) {
        self.readers.push(reader);
        // Stable sort keeps registration order among equal priorities
        self.readers.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// Get all supported file extensions (for file filtering).
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<&'static str> = self
            .readers
            .iter()
            .flat_map(|r| r.extensions().iter().copied())
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }

    /// Find readers that handle a given extension.
    fn readers_for_extension(&self, ext: &str) -> Vec<&dyn MicroscopyReader> {
        let ext_lower = ext.to_lowercase();
        self.readers
            .iter()
            .filter(|r| r.extensions().iter().any(|e| *e == ext_lower))
            .map(|r| r.as_ref())
            .collect()
    }

    /// Find a reader by magic byte detection.
    fn detect_reader(&self, data: &[u8]) -> Option<&dyn MicroscopyReader> {
        self.readers
            .iter()
            .find(|r| r.can_read(data))
            .map(|r| r.as_ref())
    }

    /// Extract data, auto-detecting the format.
    ///
    /// Tries readers in this order:
    /// 1. By file extension (if filename provided)
    /// 2. By magic byte detection
    /// 3. All readers as a last resort
    ///
    /// Returns the error of the most specific reader that was attempted.
    pub fn read(&self, data: &[u8], filename: Option<&str>) -> Result<Extracted, ReaderError> {
        let extension = filename
            .and_then(|f| f.rsplit_once('.'))
            .map(|(_, e)| e.to_lowercase());

        let mut first_error: Option<ReaderError> = None;

        if let Some(ref ext) = extension {
            for reader in self.readers_for_extension(ext) {
                match reader.read(data) {
                    Ok(result) => {
                        log::debug!("Read with {} reader (by extension)", reader.id());
                        return Ok(result);
                    }
                    Err(e) => {
                        log::trace!("Reader {} failed: {}", reader.id(), e);
                        first_error.get_or_insert(e.with_reader(reader.id()));
                    }
                }
            }
        }

        if let Some(reader) = self.detect_reader(data) {
            match reader.read(data) {
                Ok(result) => {
                    log::debug!("Read with {} reader (by detection)", reader.id());
                    return Ok(result);
                }
                Err(e) => {
                    log::trace!("Detected reader {} failed: {}", reader.id(), e);
                    first_error.get_or_insert(e.with_reader(reader.id()));
                }
            }
        }

        for reader in &self.readers {
            if let Ok(result) = reader.read(data) {
                log::debug!("Read with {} reader (fallback)", reader.id());
                return Ok(result);
            }
        }

        Err(first_error.unwrap_or_else(|| {
            ReaderError::new(format!(
                "No reader could handle the data{}",
                filename
                    .map(|f| format!(" (file: {})", f))
                    .unwrap_or_default()
            ))
        }))
    }

    /// Check if a filename has a supported extension.
    pub fn is_supported_file(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.supported_extensions()
            .iter()
            .any(|ext| lower.ends_with(&format!(".{}", ext)))
    }

    /// Get all registered readers.
    pub fn readers(&self) -> &[Box<dyn MicroscopyReader>] {
        &self.readers
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
