//! Loading 4D-STEM datacubes.
//!
//! This module provides:
//! - `DataCube`: the in-memory dataset
//! - `DataReader`: the outer loader that routes a file to the native or
//!   foreign path and applies the fallback policy
//! - `ReaderRegistry`: extensible set of foreign format readers
//!
//! ## Routing
//!
//! 1. The file is opened as a container and classified. A native container
//!    is loaded directly; corruption in it is always reported.
//! 2. Anything else (including files that are not containers at all) goes to
//!    the foreign readers and is shaped into 4D.
//! 3. If that fails, the lenient policy returns a random placeholder; the
//!    strict policy returns the error.
//!
//! ## Adding New Formats
//!
//! ```rust,ignore
//! use stemcube::data::{Extracted, MicroscopyReader, ReaderError};
//!
//! pub struct MyFormatReader;
//!
//! impl MicroscopyReader for MyFormatReader {
//!     fn id(&self) -> &'static str { "myformat" }
//!     fn display_name(&self) -> &'static str { "My Format" }
//!     fn extensions(&self) -> &'static [&'static str] { &["myf"] }
//!     fn can_read(&self, data: &[u8]) -> bool { /* check magic bytes */ }
//!     fn read(&self, data: &[u8]) -> Result<Extracted, ReaderError> { /* ... */ }
//! }
//! ```

mod datacube;
mod detect;
mod fallback;
mod foreign;
mod native;
mod reader;
pub mod readers;

#[cfg(test)]
mod tests;

use std::path::Path;

use web_time::Instant;

pub use datacube::{DataCube, ForeignMetadata};
pub use detect::{Format, classify, detect};
pub use fallback::{placeholder_filename, synthetic};
pub use foreign::{load_foreign, to_datacube_array};
pub use native::load_native;
pub use reader::{Extracted, MicroscopyReader, ReaderError, ReaderRegistry};

use crate::config::{FallbackPolicy, ReaderConfig};
use crate::error::LoadError;

/// Outer datacube loader.
///
/// Holds the configuration and the foreign reader registry so repeated loads
/// share them. Loads are independent and read-only.
pub struct DataReader {
    config: ReaderConfig,
    registry: ReaderRegistry,
}

impl DataReader {
    /// Create a loader with the built-in readers.
    pub fn new(config: ReaderConfig) -> Self {
        Self::with_registry(config, ReaderRegistry::new())
    }

    /// Create a loader with a custom reader registry.
    pub fn with_registry(config: ReaderConfig, registry: ReaderRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn registry(&self) -> &ReaderRegistry {
        &self.registry
    }

    /// Load a datacube from `path`.
    ///
    /// With the lenient policy this only fails for native containers that are
    /// corrupt or too new; every other failure yields a placeholder.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<DataCube, LoadError> {
        let path = path.as_ref();
        let started = Instant::now();
        log::info!("Reading file {:?}", path);

        let result = self.route(path);

        match &result {
            Ok(cube) => log::debug!(
                "Read {:?} as {:?} in {:.1?}",
                path,
                cube.shape(),
                started.elapsed()
            ),
            Err(e) => log::debug!("Reading {:?} failed: {}", path, e),
        }
        result
    }

    fn route(&self, path: &Path) -> Result<DataCube, LoadError> {
        match detect(path) {
            Ok((Format::Native, store)) => return load_native(store, path),
            Ok((Format::Foreign, _)) => {}
            Err(e) => log::debug!("Not a container: {}", e),
        }

        let known = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.registry.is_supported_file(name));
        if !known {
            log::debug!("{:?} has no registered extension, detecting by content", path);
        }

        load_foreign(path, &self.registry).or_else(|e| self.fall_back(e, path))
    }

    fn fall_back(&self, error: LoadError, path: &Path) -> Result<DataCube, LoadError> {
        match self.config.fallback.policy {
            FallbackPolicy::Strict => Err(error),
            FallbackPolicy::Lenient => {
                log::warn!("Failed to load {:?}: {}", path, error);
                log::warn!("Initializing placeholder datacube {:?}", self.config.fallback.shape);
                Ok(synthetic(
                    &self.config.fallback,
                    placeholder_filename(&error, path),
                ))
            }
        }
    }
}

impl Default for DataReader {
    fn default() -> Self {
        Self::new(ReaderConfig::default())
    }
}

/// Load a datacube with the default configuration.
///
/// Always returns a datacube unless `path` is a native container that is
/// corrupt or declares an unsupported version.
pub fn read_data(path: impl AsRef<Path>) -> Result<DataCube, LoadError> {
    DataReader::default().read(path)
}
