//! Native container detection.

use std::path::Path;

use stemcube_store::Store;

use crate::container::schema;
use crate::error::LoadError;

/// Verdict of the format detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// A native container (version attributes and payload group present)
    Native,
    /// Anything else; left to the foreign readers
    Foreign,
}

/// Classify an opened store.
///
/// Native iff the root carries both version attributes and a root-level
/// payload group. A datacube stored anywhere else does not count.
pub fn classify(store: &Store) -> Format {
    let attrs = store.root_attrs();
    let has_version = attrs.contains_key(schema::VERSION_MAJOR_ATTR)
        && attrs.contains_key(schema::VERSION_MINOR_ATTR);

    if has_version && store.has_group(schema::PAYLOAD_ROOT) {
        Format::Native
    } else {
        Format::Foreign
    }
}

/// Open `path` and classify it.
///
/// The opened store is returned so a native file need not be opened twice.
/// A file that cannot be opened as HDF5 at all yields
/// [`LoadError::UnreadableFile`], which is not the same as [`Format::Foreign`].
pub fn detect(path: &Path) -> Result<(Format, Store), LoadError> {
    let store = Store::open(path).map_err(|source| LoadError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })?;

    let format = classify(&store);
    log::debug!("{:?} classified as {:?}", path, format);
    Ok((format, store))
}
