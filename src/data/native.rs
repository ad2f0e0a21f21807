//! Loading datacubes from native containers.

use std::path::Path;

use ndarray::Ix4;
use stemcube_store::{AttrValue, Store};

use crate::container::schema;
use crate::data::DataCube;
use crate::error::LoadError;

/// Load the datacube from a store already classified as native.
///
/// Takes ownership of the store so the file is closed on every return path.
/// The array is copied out in full. A missing, undecodable or non-4D payload
/// is a [`LoadError::CorruptContainer`]: the file claims to be native, so
/// falling back would hide real damage.
pub fn load_native(store: Store, path: &Path) -> Result<DataCube, LoadError> {
    check_version(&store, path)?;
    check_group_type(&store, path);

    if !store.has_dataset(schema::DATACUBE_PATH) {
        return Err(LoadError::corrupt(
            path,
            format!("missing payload dataset '{}'", schema::DATACUBE_PATH),
        ));
    }

    let array = store
        .read_array(schema::DATACUBE_PATH)
        .map_err(|e| LoadError::corrupt(path, e.to_string()))?;

    let shape = array.shape().to_vec();
    let data = array.into_dimensionality::<Ix4>().map_err(|_| {
        LoadError::corrupt(
            path,
            format!("payload has shape {:?}, expected 4 dimensions", shape),
        )
    })?;

    log::info!("{:?} is a native container, loaded shape {:?}", path, shape);
    Ok(DataCube::native(data, path))
}

fn check_version(store: &Store, path: &Path) -> Result<(), LoadError> {
    let attrs = store.root_attrs();
    let version = |name: &str| -> Result<i64, LoadError> {
        let value = attrs
            .get(name)
            .ok_or_else(|| LoadError::corrupt(path, format!("missing root attribute '{}'", name)))?;
        value.as_i64().ok_or_else(|| {
            LoadError::corrupt(
                path,
                format!("root attribute '{}' is a {}, expected int", name, value.type_name()),
            )
        })
    };

    let major = version(schema::VERSION_MAJOR_ATTR)?;
    let minor = version(schema::VERSION_MINOR_ATTR)?;
    let (_, current_minor) = schema::CURRENT_VERSION;

    if major > schema::SUPPORTED_MAJOR || major < 0 {
        return Err(LoadError::UnsupportedVersion {
            path: path.to_path_buf(),
            major,
            minor,
            supported: schema::SUPPORTED_MAJOR,
        });
    }
    if major == schema::SUPPORTED_MAJOR && minor > current_minor {
        log::warn!(
            "{:?} has container version {}.{}, newer than {}.{}; reading anyway",
            path,
            major,
            minor,
            schema::SUPPORTED_MAJOR,
            current_minor
        );
    }
    Ok(())
}

fn check_group_type(store: &Store, path: &Path) {
    let Ok(attrs) = store.attrs(schema::DATACUBE_GROUP) else {
        return;
    };
    match attrs.get(schema::EMD_GROUP_TYPE_ATTR) {
        Some(AttrValue::Int(t)) if *t == schema::EMD_GROUP_TYPE => {}
        Some(other) => log::warn!(
            "{:?}: unexpected {} = {}",
            path,
            schema::EMD_GROUP_TYPE_ATTR,
            other
        ),
        None => log::debug!("{:?}: datacube group has no {}", path, schema::EMD_GROUP_TYPE_ATTR),
    }
}
