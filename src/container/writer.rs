//! Writing datacubes as native containers.

use std::io;
use std::path::{Path, PathBuf};

use stemcube_store::{AttrValue, Attrs, StoreError, StoreWriter};

use super::metadata::{ContainerMetadata, DimensionDescriptor};
use super::schema::{self, MetadataSection};
use crate::data::DataCube;
use crate::error::LoadError;

/// Write `cube` to `path` as a native container.
///
/// Descriptors in `metadata.dims` are used when there are exactly four and
/// each matches its axis length; otherwise default pixel descriptors are
/// written. Every metadata section is created, empty if `metadata` has
/// nothing for it.
///
/// The container is written next to `path` under a `.partial` name and
/// renamed into place once complete, so a failed write never leaves a
/// truncated file at `path` or replaces an existing one.
pub fn save_native(
    path: impl AsRef<Path>,
    cube: &DataCube,
    metadata: &ContainerMetadata,
) -> Result<(), LoadError> {
    let path = path.as_ref();
    log::info!("Writing native container {:?} ({:?})", path, cube.shape());

    let write_error = |source: StoreError| LoadError::Write {
        path: path.to_path_buf(),
        source,
    };

    let partial = partial_path(path).map_err(write_error)?;
    if let Err(e) = write_container(&partial, cube, metadata) {
        remove_partial(&partial);
        return Err(write_error(e));
    }
    std::fs::rename(&partial, path).map_err(|e| {
        remove_partial(&partial);
        write_error(e.into())
    })
}

/// Sibling path the container is written to before the final rename.
fn partial_path(path: &Path) -> Result<PathBuf, StoreError> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name")
    })?;
    let mut partial = name.to_os_string();
    partial.push(".partial");
    Ok(path.with_file_name(partial))
}

fn remove_partial(partial: &Path) {
    match std::fs::remove_file(partial) {
        Ok(()) => log::debug!("Removed incomplete container {:?}", partial),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove incomplete container {:?}: {}", partial, e),
    }
}

fn write_container(
    path: &Path,
    cube: &DataCube,
    metadata: &ContainerMetadata,
) -> Result<(), StoreError> {
    let (major, minor) = schema::CURRENT_VERSION;
    let mut root = Attrs::new();
    root.insert(schema::VERSION_MAJOR_ATTR.into(), AttrValue::Int(major));
    root.insert(schema::VERSION_MINOR_ATTR.into(), AttrValue::Int(minor));

    let mut writer = StoreWriter::create(path, &root)?;
    writer.create_group(schema::PAYLOAD_ROOT, &Attrs::new())?;

    let mut group_attrs = Attrs::new();
    group_attrs.insert(
        schema::EMD_GROUP_TYPE_ATTR.into(),
        AttrValue::Int(schema::EMD_GROUP_TYPE),
    );
    writer.create_group(schema::DATACUBE_GROUP, &group_attrs)?;
    writer.write_dataset(schema::DATACUBE_PATH, cube.data(), &Attrs::new())?;

    for (axis, dim) in descriptors(cube.shape(), &metadata.dims)
        .iter()
        .enumerate()
    {
        writer.write_dataset(&schema::dim_path(axis), &dim.coords, &dim.attrs())?;
    }

    writer.create_group(schema::PROCESSING_GROUP, &Attrs::new())?;
    writer.create_group(schema::METADATA_GROUP, &Attrs::new())?;
    for section in MetadataSection::all() {
        let attrs = metadata.section(*section).cloned().unwrap_or_default();
        writer.create_group(&section.path(), &attrs)?;
    }

    writer.finish()
}

fn descriptors(shape: [usize; 4], dims: &[DimensionDescriptor]) -> Vec<DimensionDescriptor> {
    if dims.is_empty() {
        return DimensionDescriptor::defaults(shape);
    }
    if dims.len() != 4 {
        log::warn!(
            "Expected 4 dimension descriptors, got {}; writing defaults",
            dims.len()
        );
        return DimensionDescriptor::defaults(shape);
    }

    let defaults = DimensionDescriptor::defaults(shape);
    dims.iter()
        .zip(defaults)
        .enumerate()
        .map(|(axis, (dim, default))| {
            if dim.coords.len() == shape[axis] {
                dim.clone()
            } else {
                log::warn!(
                    "Descriptor '{}' has {} coordinates for an axis of length {}; using defaults",
                    dim.name,
                    dim.coords.len(),
                    shape[axis]
                );
                default
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use ndarray::Array4;

    use super::*;

    #[test]
    fn test_descriptor_selection() {
        let shape = [2, 3, 4, 5];

        assert_eq!(descriptors(shape, &[]), DimensionDescriptor::defaults(shape));

        let partial = vec![DimensionDescriptor::pixels("x", "px", 2)];
        assert_eq!(
            descriptors(shape, &partial),
            DimensionDescriptor::defaults(shape)
        );

        let mut custom = DimensionDescriptor::defaults(shape);
        custom[0] = DimensionDescriptor::calibrated("R_y", "[n_m]", 2, 0.5);
        custom[3] = DimensionDescriptor::pixels("wrong", "px", 99);
        let chosen = descriptors(shape, &custom);
        assert_eq!(chosen[0].coords[1], 0.5);
        assert_eq!(chosen[3].name, "Q_x");
    }

    #[test]
    fn test_write_failure_maps_to_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("cube.h5");
        let cube = DataCube::placeholder(Array4::zeros((1, 1, 2, 2)), None);

        let err = save_native(&path, &cube, &ContainerMetadata::new()).unwrap_err();
        assert!(matches!(err, LoadError::Write { .. }));
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("out/cube.h5")).unwrap(),
            PathBuf::from("out/cube.h5.partial")
        );
        assert!(partial_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_failed_write_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.h5");
        let original = DataCube::placeholder(Array4::from_elem((1, 1, 2, 2), 7.0), None);
        save_native(&path, &original, &ContainerMetadata::new()).unwrap();

        // NUL bytes cannot be stored in an HDF5 string attribute
        let mut metadata = ContainerMetadata::new();
        metadata.set(MetadataSection::Comments, "note", "bad\0text");
        let replacement = DataCube::placeholder(Array4::zeros((1, 1, 2, 2)), None);
        let err = save_native(&path, &replacement, &metadata).unwrap_err();
        assert!(matches!(err, LoadError::Write { .. }));

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("cube.h5")]);

        let reread = crate::data::read_data(&path).unwrap();
        assert!(reread.is_native());
        assert!(reread.data().iter().all(|&v| v == 7.0));
    }
}
