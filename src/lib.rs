//! stemcube - 4D-STEM datacube loader
//!
//! Reads four-dimensional scanning transmission electron microscopy
//! datasets: native containers are loaded directly, anything else is handed
//! to the foreign format readers and reshaped into `(R_Ny, R_Nx, Q_Ny, Q_Nx)`.

pub mod config;
pub mod container;
pub mod data;
pub mod error;

pub use config::{FallbackPolicy, ReaderConfig};
pub use container::{ContainerMetadata, read_native_metadata, save_native};
pub use data::{DataCube, DataReader, ForeignMetadata, read_data};
pub use error::LoadError;
