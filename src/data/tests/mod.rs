//! Loader scenarios over real files.
//!
//! These tests write native containers and foreign files to a scratch
//! directory and run them through the outer loader.


use std::path::{Path, PathBuf};

use ndarray::{Array4, ArrayD, IxDyn};
use ndarray_npy::WriteNpyExt;
use stemcube_store::{AttrValue, Attrs, StoreWriter};

use crate::config::{FallbackConfig, ReaderConfig};
use crate::container::{ContainerMetadata, save_native, schema};
use crate::data::DataCube;

/// Config with a small seeded placeholder so fallback tests stay cheap.
fn small_fallback_config() -> ReaderConfig {
    let mut config = ReaderConfig::new();
    config.fallback = FallbackConfig {
        shape: [2, 2, 4, 4],
        seed: Some(1),
        ..FallbackConfig::default()
    };
    config
}

/// Deterministic 4D array where every element is distinct.
fn ramp(shape: (usize, usize, usize, usize)) -> Array4<f32> {
    Array4::from_shape_fn(shape, |(a, b, c, d)| (a * 1000 + b * 100 + c * 10 + d) as f32)
}

/// Write a valid native container holding `data`.
fn write_native(dir: &Path, name: &str, data: Array4<f32>) -> PathBuf {
    let path = dir.join(name);
    let cube = DataCube::native(data, &path);
    save_native(&path, &cube, &ContainerMetadata::new()).unwrap();
    path
}

/// Write a container with the given root attributes and groups but no datacube.
fn write_skeleton(dir: &Path, name: &str, version: Option<(i64, i64)>, groups: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut root = Attrs::new();
    if let Some((major, minor)) = version {
        root.insert(schema::VERSION_MAJOR_ATTR.into(), AttrValue::Int(major));
        root.insert(schema::VERSION_MINOR_ATTR.into(), AttrValue::Int(minor));
    }
    let mut writer = StoreWriter::create(&path, &root).unwrap();
    for group in groups {
        writer.create_group(group, &Attrs::new()).unwrap();
    }
    writer.finish().unwrap();
    path
}

/// Write an `f32` `.npy` file of the given shape.
fn write_npy(dir: &Path, name: &str, shape: &[usize]) -> PathBuf {
    let path = dir.join(name);
    let array = ArrayD::<f32>::from_shape_fn(IxDyn(shape), |ix| ix[0] as f32);
    let file = std::fs::File::create(&path).unwrap();
    array.write_npy(std::io::BufWriter::new(file)).unwrap();
    path
}
