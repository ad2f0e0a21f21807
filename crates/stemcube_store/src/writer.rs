//! Write access to a store.

use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;

use hdf5::types::VarLenUnicode;
use hdf5::{File, H5Type, Location};
use ndarray::{ArrayView, Dimension};

use crate::attrs::{AttrValue, Attrs};
use crate::error::StoreError;
use crate::{normalize, parent};

/// Builder for a new store.
///
/// Nodes cannot be rewritten and parents must be created before their
/// children. Call [`StoreWriter::finish`] to flush and close the file.
pub struct StoreWriter {
    file: File,
    groups: BTreeSet<String>,
    nodes: BTreeSet<String>,
}

impl StoreWriter {
    /// Create an HDF5 file on disk, truncating any existing file.
    pub fn create(path: impl AsRef<Path>, root_attrs: &Attrs) -> Result<Self, StoreError> {
        let path = path.as_ref();
        log::debug!("Creating store {:?}", path);
        let file = File::create(path)?;
        write_attrs(&file, "", root_attrs)?;

        Ok(Self {
            file,
            groups: BTreeSet::from([String::new()]),
            nodes: BTreeSet::from([String::new()]),
        })
    }

    /// Create a group at `path`.
    pub fn create_group(&mut self, path: &str, attrs: &Attrs) -> Result<(), StoreError> {
        let path = self.claim(path)?;

        let group = self.file.create_group(&path)?;
        write_attrs(&group, &path, attrs)?;

        log::trace!("Created group '{}'", path);
        self.groups.insert(path);
        Ok(())
    }

    /// Write an array as a dataset at `path`.
    ///
    /// Arrays that are not in standard layout are copied first.
    pub fn write_dataset<'a, A, T, D>(
        &mut self,
        path: &str,
        array: A,
        attrs: &Attrs,
    ) -> Result<(), StoreError>
    where
        A: Into<ArrayView<'a, T, D>>,
        T: H5Type + Clone + 'a,
        D: Dimension,
    {
        let path = self.claim(path)?;
        let array: ArrayView<'a, T, D> = array.into();
        let data = array.as_standard_layout();

        let dataset = self
            .file
            .new_dataset_builder()
            .with_data(data.view())
            .create(path.as_str())?;
        write_attrs(&dataset, &path, attrs)?;

        log::trace!("Wrote dataset '{}' {:?}", path, data.shape());
        Ok(())
    }

    /// Flush and close the file.
    pub fn finish(self) -> Result<(), StoreError> {
        self.file.flush()?;
        self.file.close()?;
        Ok(())
    }

    /// Validate a new node path and reserve it.
    fn claim(&mut self, path: &str) -> Result<String, StoreError> {
        let path = normalize(path).to_string();
        let parent = parent(&path).ok_or_else(|| StoreError::Duplicate {
            path: String::new(),
        })?;

        if !self.groups.contains(parent) {
            return Err(StoreError::missing(parent));
        }
        if !self.nodes.insert(path.clone()) {
            return Err(StoreError::Duplicate { path });
        }
        Ok(path)
    }
}

fn write_attrs(location: &Location, path: &str, attrs: &Attrs) -> Result<(), StoreError> {
    for (name, value) in attrs {
        let name = name.as_str();
        match value {
            AttrValue::Bool(v) => location.new_attr::<bool>().create(name)?.write_scalar(v)?,
            AttrValue::Int(v) => location.new_attr::<i64>().create(name)?.write_scalar(v)?,
            AttrValue::Float(v) => location.new_attr::<f64>().create(name)?.write_scalar(v)?,
            AttrValue::Str(v) => {
                let value = VarLenUnicode::from_str(v)
                    .map_err(|e| StoreError::attribute(path, name, e.to_string()))?;
                location
                    .new_attr::<VarLenUnicode>()
                    .create(name)?
                    .write_scalar(&value)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Axis};

    use super::*;
    use crate::Store;

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.h5");

        let mut root = Attrs::new();
        root.insert("format".into(), "test".into());
        root.insert("major".into(), AttrValue::Int(0));

        let mut writer = StoreWriter::create(&path, &root).unwrap();
        writer.create_group("g", &Attrs::new()).unwrap();
        writer
            .write_dataset("g/m", &Array2::<f32>::eye(3), &Attrs::new())
            .unwrap();
        writer.finish().unwrap();

        let store = Store::open(&path).unwrap();
        assert_eq!(store.root_attrs()["format"].as_str(), Some("test"));
        assert_eq!(store.root_attrs()["major"], AttrValue::Int(0));
        let m = store.read_array("g/m").unwrap();
        assert_eq!(m.shape(), &[3, 3]);
        assert_eq!(m[[1, 1]], 1.0);
        assert_eq!(m[[0, 1]], 0.0);
    }

    #[test]
    fn test_transposed_view_written_in_logical_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.h5");
        let a = Array2::<f32>::from_shape_fn((2, 3), |(i, j)| (i * 10 + j) as f32);

        let mut writer = StoreWriter::create(&path, &Attrs::new()).unwrap();
        writer.write_dataset("t", a.t(), &Attrs::new()).unwrap();
        writer.finish().unwrap();

        let t = Store::open(&path).unwrap().read_array("t").unwrap();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.index_axis(Axis(0), 2).iter().copied().collect::<Vec<f32>>(), vec![2.0, 12.0]);
    }

    #[test]
    fn test_parent_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = StoreWriter::create(dir.path().join("p.h5"), &Attrs::new()).unwrap();
        assert!(matches!(
            writer.create_group("a/b", &Attrs::new()),
            Err(StoreError::MissingNode { .. })
        ));
        writer.create_group("a", &Attrs::new()).unwrap();
        writer.create_group("a/b", &Attrs::new()).unwrap();
    }

    #[test]
    fn test_dataset_cannot_be_a_parent() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = StoreWriter::create(dir.path().join("d.h5"), &Attrs::new()).unwrap();
        writer
            .write_dataset("d", &Array2::<u8>::zeros((1, 1)), &Attrs::new())
            .unwrap();
        assert!(writer.create_group("d/child", &Attrs::new()).is_err());
    }

    #[test]
    fn test_duplicates_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = StoreWriter::create(dir.path().join("dup.h5"), &Attrs::new()).unwrap();
        writer.create_group("a", &Attrs::new()).unwrap();
        assert!(matches!(
            writer.create_group("a", &Attrs::new()),
            Err(StoreError::Duplicate { .. })
        ));
        assert!(matches!(
            writer.create_group("/", &Attrs::new()),
            Err(StoreError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_nul_in_string_attribute_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = StoreWriter::create(dir.path().join("nul.h5"), &Attrs::new()).unwrap();
        let mut attrs = Attrs::new();
        attrs.insert("bad".into(), "a\0b".into());
        assert!(matches!(
            writer.create_group("g", &attrs),
            Err(StoreError::Attribute { .. })
        ));
    }
}
