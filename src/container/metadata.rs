//! Dimension descriptors and metadata sections of a native container.

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::Array1;
use serde_json::Value;
use stemcube_store::{AttrValue, Attrs, Store};

use super::schema::{self, MetadataSection};
use crate::data::ForeignMetadata;
use crate::error::LoadError;

/// Describes one axis of the datacube.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionDescriptor {
    pub name: String,
    pub units: String,
    /// Coordinate of every sample along the axis.
    pub coords: Array1<f32>,
}

impl DimensionDescriptor {
    /// Uncalibrated axis: coordinates are pixel indices.
    pub fn pixels(name: impl Into<String>, units: impl Into<String>, len: usize) -> Self {
        Self::calibrated(name, units, len, 1.0)
    }

    /// Axis with a uniform sampling step.
    pub fn calibrated(
        name: impl Into<String>,
        units: impl Into<String>,
        len: usize,
        step: f32,
    ) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            coords: Array1::from_shape_fn(len, |i| i as f32 * step),
        }
    }

    /// Default descriptors for a datacube of the given shape.
    pub fn defaults(shape: [usize; 4]) -> Vec<Self> {
        (0..4)
            .map(|axis| {
                Self::pixels(
                    schema::DEFAULT_DIM_NAMES[axis],
                    schema::DEFAULT_DIM_UNITS[axis],
                    shape[axis],
                )
            })
            .collect()
    }

    pub(crate) fn attrs(&self) -> Attrs {
        let mut attrs = Attrs::new();
        attrs.insert(schema::DIM_NAME_ATTR.into(), self.name.as_str().into());
        attrs.insert(schema::DIM_UNITS_ATTR.into(), self.units.as_str().into());
        attrs
    }
}

/// Metadata stored alongside the datacube.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerMetadata {
    /// Axis descriptors in array order; empty means "use defaults" when writing.
    pub dims: Vec<DimensionDescriptor>,
    /// Attributes of each metadata section present in the file.
    pub sections: BTreeMap<MetadataSection, Attrs>,
}

impl ContainerMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute to a section, creating the section if needed.
    pub fn set(
        &mut self,
        section: MetadataSection,
        key: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> &mut Self {
        self.sections
            .entry(section)
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Attributes of a section, if present.
    pub fn section(&self, section: MetadataSection) -> Option<&Attrs> {
        self.sections.get(&section)
    }

    /// Carry foreign metadata into the `original` section.
    ///
    /// Nested objects are flattened into dotted keys, prefixed with
    /// `shortlist.` or `full.`.
    pub fn from_foreign(metadata: &ForeignMetadata) -> Self {
        let mut original = Attrs::new();
        flatten_into(&mut original, "shortlist", &metadata.shortlist);
        flatten_into(&mut original, "full", &metadata.full);

        let mut result = Self::new();
        result.sections.insert(MetadataSection::Original, original);
        result
    }
}

/// Flatten a JSON tree into scalar attributes.
///
/// Arrays are kept as their JSON text; nulls are dropped.
pub fn flatten_into(attrs: &mut Attrs, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(attrs, &key, child);
            }
        }
        Value::Null => {}
        Value::Bool(b) => {
            attrs.insert(prefix.to_string(), AttrValue::Bool(*b));
        }
        Value::Number(n) => {
            let value = match n.as_i64() {
                Some(i) => AttrValue::Int(i),
                None => AttrValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            };
            attrs.insert(prefix.to_string(), value);
        }
        Value::String(s) => {
            attrs.insert(prefix.to_string(), AttrValue::Str(s.clone()));
        }
        Value::Array(_) => {
            attrs.insert(prefix.to_string(), AttrValue::Str(value.to_string()));
        }
    }
}

/// Read dimension descriptors and metadata sections of a native container.
///
/// Missing descriptors and sections are skipped rather than reported, as are
/// metadata groups with unknown names; only an unreadable file or a
/// non-native file is an error.
pub fn read_native_metadata(path: impl AsRef<Path>) -> Result<ContainerMetadata, LoadError> {
    let path = path.as_ref();
    let store = Store::open(path).map_err(|source| LoadError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })?;

    if crate::data::classify(&store) != crate::data::Format::Native {
        return Err(LoadError::corrupt(path, "not a native container"));
    }

    let corrupt = |e: stemcube_store::StoreError| LoadError::corrupt(path, e.to_string());
    let mut metadata = ContainerMetadata::new();

    for axis in 0..4 {
        let dim = schema::dim_path(axis);
        if !store.has_dataset(&dim) {
            log::debug!("{:?}: no descriptor for axis {}", path, axis + 1);
            continue;
        }
        let attrs = store.attrs(&dim).map_err(corrupt)?;
        let text = |key: &str| {
            attrs
                .get(key)
                .and_then(AttrValue::as_str)
                .unwrap_or_default()
                .to_string()
        };
        metadata.dims.push(DimensionDescriptor {
            name: text(schema::DIM_NAME_ATTR),
            units: text(schema::DIM_UNITS_ATTR),
            coords: store.read_array_1d(&dim).map_err(corrupt)?,
        });
    }

    if !store.has_group(schema::METADATA_GROUP) {
        return Ok(metadata);
    }
    for name in store.children(schema::METADATA_GROUP).map_err(corrupt)? {
        let Some(section) = MetadataSection::from_name(&name) else {
            log::debug!("{:?}: skipping unknown metadata group '{}'", path, name);
            continue;
        };
        if store.has_group(&section.path()) {
            let attrs = store.attrs(&section.path()).map_err(corrupt)?;
            metadata.sections.insert(section, attrs);
        }
    }

    Ok(metadata)
}
