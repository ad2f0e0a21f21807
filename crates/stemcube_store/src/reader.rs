//! Read access to a store.

use std::path::Path;

use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Attribute, File, Group, H5Type, Location, LocationType};
use ndarray::{Array1, ArrayD, Ix1};

use crate::attrs::{AttrValue, Attrs};
use crate::error::StoreError;
use crate::normalize;

/// Longest fixed-length string attribute that is read.
const MAX_FIXED_STRING: usize = 1024;

/// Kind of a node in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Dataset,
}

/// An opened store.
///
/// Root attributes are parsed when the store is opened; everything else is
/// read on demand. The underlying file is closed when the store is dropped.
pub struct Store {
    file: File,
    root_attrs: Attrs,
}

impl Store {
    /// Open an HDF5 file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        log::debug!("Opening store {:?}", path);
        let file = File::open(path)?;
        let root_attrs = read_attrs(&file, "")?;
        log::trace!(
            "Store has {} root members, {} root attributes",
            file.len(),
            root_attrs.len()
        );

        Ok(Self { file, root_attrs })
    }

    /// Attributes attached to the root group.
    pub fn root_attrs(&self) -> &Attrs {
        &self.root_attrs
    }

    /// Kind of the node at `path`, if it exists.
    pub fn kind(&self, path: &str) -> Option<NodeKind> {
        let path = normalize(path);
        if path.is_empty() {
            return Some(NodeKind::Group);
        }
        if !self.file.link_exists(path) {
            return None;
        }
        match self.file.loc_type_by_name(path).ok()? {
            LocationType::Group => Some(NodeKind::Group),
            LocationType::Dataset => Some(NodeKind::Dataset),
            _ => None,
        }
    }

    /// Check whether a group exists at `path`.
    pub fn has_group(&self, path: &str) -> bool {
        self.kind(path) == Some(NodeKind::Group)
    }

    /// Check whether a dataset exists at `path`.
    pub fn has_dataset(&self, path: &str) -> bool {
        self.kind(path) == Some(NodeKind::Dataset)
    }

    /// Names of the direct children of the group at `path`, sorted.
    pub fn children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let mut names = self.group(path)?.member_names()?;
        names.sort();
        Ok(names)
    }

    /// Attributes of the node at `path` (empty if it has none).
    pub fn attrs(&self, path: &str) -> Result<Attrs, StoreError> {
        let path = normalize(path);
        if path.is_empty() {
            return Ok(self.root_attrs.clone());
        }
        match self.kind(path) {
            Some(NodeKind::Group) => read_attrs(&*self.file.group(path)?, path),
            Some(NodeKind::Dataset) => read_attrs(&*self.file.dataset(path)?, path),
            None => Err(StoreError::missing(path)),
        }
    }

    /// Read the dataset at `path` as an `f32` array of any rank.
    ///
    /// Any integer or float dataset converts; other element types are an
    /// [`StoreError::Array`].
    pub fn read_array(&self, path: &str) -> Result<ArrayD<f32>, StoreError> {
        let path = normalize(path);
        self.expect_kind(path, NodeKind::Dataset)?;

        let dataset = self.file.dataset(path)?;
        let array = dataset
            .read_dyn::<f32>()
            .map_err(|e| StoreError::array(path, e.to_string()))?;

        log::trace!("Read dataset '{}' {:?}", path, array.shape());
        Ok(array)
    }

    /// Read a one-dimensional dataset.
    pub fn read_array_1d(&self, path: &str) -> Result<Array1<f32>, StoreError> {
        let array = self.read_array(path)?;
        let ndim = array.ndim();
        array
            .into_dimensionality::<Ix1>()
            .map_err(|_| StoreError::array(normalize(path), format!("expected 1D, found {}D", ndim)))
    }

    fn group(&self, path: &str) -> Result<Group, StoreError> {
        let path = normalize(path);
        self.expect_kind(path, NodeKind::Group)?;
        Ok(self.file.group(if path.is_empty() { "/" } else { path })?)
    }

    fn expect_kind(&self, path: &str, expected: NodeKind) -> Result<(), StoreError> {
        match self.kind(path) {
            Some(kind) if kind == expected => Ok(()),
            Some(_) => Err(StoreError::WrongKind {
                path: normalize(path).to_string(),
                expected: match expected {
                    NodeKind::Group => "group",
                    NodeKind::Dataset => "dataset",
                },
            }),
            None => Err(StoreError::missing(normalize(path))),
        }
    }
}

/// Read every scalar attribute of a node, skipping the ones that have no
/// [`AttrValue`] equivalent.
fn read_attrs(location: &Location, path: &str) -> Result<Attrs, StoreError> {
    let mut attrs = Attrs::new();
    for name in location.attr_names()? {
        let attr = location.attr(&name)?;
        match read_attr(&attr).map_err(|e| StoreError::attribute(path, &name, e.to_string()))? {
            Some(value) => {
                attrs.insert(name, value);
            }
            None => log::debug!("Skipping non-scalar attribute '{}' of '{}'", name, path),
        }
    }
    Ok(attrs)
}

fn read_attr(attr: &Attribute) -> hdf5::Result<Option<AttrValue>> {
    if attr.size() != 1 {
        return Ok(None);
    }

    let value = match attr.dtype()?.to_descriptor()? {
        TypeDescriptor::Boolean => AttrValue::Bool(scalar::<bool>(attr)?),
        TypeDescriptor::Integer(_) => AttrValue::Int(scalar::<i64>(attr)?),
        TypeDescriptor::Unsigned(_) => match i64::try_from(scalar::<u64>(attr)?) {
            Ok(v) => AttrValue::Int(v),
            Err(_) => return Ok(None),
        },
        TypeDescriptor::Float(_) => AttrValue::Float(scalar::<f64>(attr)?),
        TypeDescriptor::VarLenUnicode => {
            AttrValue::Str(scalar::<VarLenUnicode>(attr)?.as_str().to_string())
        }
        TypeDescriptor::VarLenAscii => {
            AttrValue::Str(scalar::<VarLenAscii>(attr)?.as_str().to_string())
        }
        TypeDescriptor::FixedAscii(len) if len <= MAX_FIXED_STRING => AttrValue::Str(
            scalar::<FixedAscii<MAX_FIXED_STRING>>(attr)?
                .as_str()
                .to_string(),
        ),
        TypeDescriptor::FixedUnicode(len) if len <= MAX_FIXED_STRING => AttrValue::Str(
            scalar::<FixedUnicode<MAX_FIXED_STRING>>(attr)?
                .as_str()
                .to_string(),
        ),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Read a single-element attribute, scalar or shape `(1,)`.
fn scalar<T: H5Type>(attr: &Attribute) -> hdf5::Result<T> {
    attr.read_raw::<T>()?
        .into_iter()
        .next()
        .ok_or_else(|| "empty attribute".into())
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array3};

    use super::*;
    use crate::StoreWriter;

    fn sample_store(dir: &Path) -> Store {
        let path = dir.join("sample.h5");
        let mut root = Attrs::new();
        root.insert("version".into(), AttrValue::Int(3));

        let mut writer = StoreWriter::create(&path, &root).unwrap();

        let mut group_attrs = Attrs::new();
        group_attrs.insert("kind".into(), "frames".into());
        writer.create_group("data", &group_attrs).unwrap();
        writer.create_group("data/extra", &Attrs::new()).unwrap();

        let frames = Array3::<u16>::from_shape_fn((2, 3, 4), |(i, j, k)| (i * 100 + j * 10 + k) as u16);
        writer
            .write_dataset("data/frames", &frames, &Attrs::new())
            .unwrap();

        let mut axis_attrs = Attrs::new();
        axis_attrs.insert("units".into(), "[pix]".into());
        writer
            .write_dataset("data/axis", &Array1::<f32>::linspace(0.0, 1.0, 5), &axis_attrs)
            .unwrap();
        writer.finish().unwrap();

        Store::open(&path).unwrap()
    }

    #[test]
    fn test_root_attrs_parsed_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample_store(dir.path());
        assert_eq!(store.root_attrs()["version"].as_i64(), Some(3));
    }

    #[test]
    fn test_node_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample_store(dir.path());
        assert_eq!(store.kind(""), Some(NodeKind::Group));
        assert_eq!(store.kind("data"), Some(NodeKind::Group));
        assert_eq!(store.kind("/data/frames"), Some(NodeKind::Dataset));
        assert_eq!(store.kind("data/missing"), None);
        assert_eq!(store.kind("nowhere/deeper/still"), None);
        assert!(store.has_group("data/extra"));
        assert!(!store.has_dataset("data"));
    }

    #[test]
    fn test_children_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample_store(dir.path());
        assert_eq!(store.children("").unwrap(), vec!["data".to_string()]);
        assert_eq!(
            store.children("data").unwrap(),
            vec!["axis".to_string(), "extra".to_string(), "frames".to_string()]
        );
        assert!(matches!(
            store.children("data/frames"),
            Err(StoreError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_read_arrays_and_attrs() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample_store(dir.path());

        let frames = store.read_array("data/frames").unwrap();
        assert_eq!(frames.shape(), &[2, 3, 4]);
        assert_eq!(frames[[1, 2, 3]], 123.0);

        let axis = store.read_array_1d("data/axis").unwrap();
        assert_eq!(axis.len(), 5);
        assert!(store.read_array_1d("data/frames").is_err());

        let attrs = store.attrs("data/axis").unwrap();
        assert_eq!(attrs["units"].as_str(), Some("[pix]"));
        assert_eq!(store.attrs("data").unwrap()["kind"].as_str(), Some("frames"));
        assert!(store.attrs("data/extra").unwrap().is_empty());
        assert!(matches!(
            store.attrs("nope"),
            Err(StoreError::MissingNode { .. })
        ));
        assert!(matches!(
            store.read_array("data"),
            Err(StoreError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_foreign_attribute_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h5py.h5");
        {
            let file = File::create(&path).unwrap();
            file.new_attr::<u8>().create("small").unwrap().write_scalar(&7u8).unwrap();
            file.new_attr::<u64>()
                .create("huge")
                .unwrap()
                .write_scalar(&u64::MAX)
                .unwrap();
            file.new_attr::<f32>().create("half").unwrap().write_scalar(&0.5f32).unwrap();
            file.new_attr::<bool>().create("flag").unwrap().write_scalar(&true).unwrap();
            let fixed: FixedAscii<8> = FixedAscii::from_ascii(b"ascii").unwrap();
            file.new_attr::<FixedAscii<8>>()
                .create("fixed")
                .unwrap()
                .write_scalar(&fixed)
                .unwrap();
            let text: VarLenUnicode = "µm".parse().unwrap();
            file.new_attr::<VarLenUnicode>()
                .create("text")
                .unwrap()
                .write_scalar(&text)
                .unwrap();
            file.new_attr::<i32>()
                .shape(3)
                .create("vector")
                .unwrap()
                .write_raw(&[1i32, 2, 3][..])
                .unwrap();
        }

        let store = Store::open(&path).unwrap();
        let attrs = store.root_attrs();
        assert_eq!(attrs["small"], AttrValue::Int(7));
        assert_eq!(attrs["half"], AttrValue::Float(0.5));
        assert_eq!(attrs["flag"], AttrValue::Bool(true));
        assert_eq!(attrs["fixed"].as_str(), Some("ascii"));
        assert_eq!(attrs["text"].as_str(), Some("µm"));
        assert!(!attrs.contains_key("huge"));
        assert!(!attrs.contains_key("vector"));
    }

    #[test]
    fn test_integer_dataset_converts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ints.h5");
        {
            let file = File::create(&path).unwrap();
            let data = Array1::from(vec![-3i64, 0, 1 << 20]);
            file.new_dataset_builder()
                .with_data(&data)
                .create("ints")
                .unwrap();
        }

        let store = Store::open(&path).unwrap();
        let ints = store.read_array_1d("ints").unwrap();
        assert_eq!(ints.to_vec(), vec![-3.0, 0.0, 1_048_576.0]);
    }

    #[test]
    fn test_not_an_hdf5_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, b"definitely not hdf5").unwrap();

        assert!(matches!(Store::open(&path), Err(StoreError::Hdf5(_))));
        assert!(matches!(
            Store::open(dir.path().join("missing.h5")),
            Err(StoreError::Hdf5(_))
        ));
    }
}
