//! Synthetic placeholder datacubes.
//!
//! When a foreign file cannot be turned into a datacube, the lenient loader
//! hands back random data instead of an error so interactive pipelines keep
//! running. Whether the source filename is kept depends on how far loading
//! got.

use std::path::{Path, PathBuf};

use ndarray::Array4;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};

use crate::config::FallbackConfig;
use crate::data::DataCube;
use crate::error::LoadError;

/// Build a placeholder datacube of `config.shape` filled with uniform values in `[0, 1)`.
pub fn synthetic(config: &FallbackConfig, filename: Option<PathBuf>) -> DataCube {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let unit = Uniform::new(0.0f32, 1.0);

    let [r_ny, r_nx, q_ny, q_nx] = config.shape;
    let data = Array4::from_shape_simple_fn((r_ny, r_nx, q_ny, q_nx), || unit.sample(&mut rng));

    DataCube::placeholder(data, filename)
}

/// Filename to attach to the placeholder for a given failure.
///
/// A file that was read but had the wrong shape keeps its name; a file that
/// could not be read at all is treated as unknown.
pub fn placeholder_filename(error: &LoadError, path: &Path) -> Option<PathBuf> {
    match error {
        LoadError::UnsupportedShape { .. } => Some(path.to_path_buf()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(seed: Option<u64>) -> FallbackConfig {
        FallbackConfig {
            shape: [2, 3, 8, 8],
            seed,
            ..FallbackConfig::default()
        }
    }

    #[test]
    fn test_default_shape() {
        let cube = synthetic(&FallbackConfig::default(), None);
        assert_eq!(cube.shape(), [10, 10, 512, 512]);
        assert!(!cube.is_native());
        assert!(cube.metadata().is_none());
        assert!(cube.filename().is_none());
    }

    #[test]
    fn test_values_in_unit_interval() {
        let cube = synthetic(&small(None), Some(PathBuf::from("scan.png")));
        assert_eq!(cube.shape(), [2, 3, 8, 8]);
        assert!(cube.data().iter().all(|v| (0.0..1.0).contains(v)));
        assert_eq!(cube.filename(), Some(Path::new("scan.png")));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = synthetic(&small(Some(42)), None);
        let b = synthetic(&small(Some(42)), None);
        let c = synthetic(&small(Some(43)), None);

        assert_eq!(a.data(), b.data());
        assert_ne!(a.data(), c.data());
    }

    #[test]
    fn test_filename_policy() {
        let path = Path::new("scan.npy");
        let shape_error = LoadError::UnsupportedShape { shape: vec![2, 2] };
        let read_error = LoadError::external(path, "bad header");

        assert_eq!(placeholder_filename(&shape_error, path), Some(path.to_path_buf()));
        assert_eq!(placeholder_filename(&read_error, path), None);
    }
}
