//! Hierarchical store: groups, attributes and datasets in an HDF5 file.
//!
//! ## Layout
//!
//! Every node is addressed by a slash-separated path (`""` is the root).
//! Groups and datasets are plain HDF5 objects, so files written by other
//! HDF5 tools (h5py, py4DSTEM) open the same way as files written here.
//!
//! Attributes are read as scalars: integers, floats, booleans and strings.
//! Array-valued and compound attributes are skipped.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stemcube_store::{Attrs, Store, StoreWriter};
//!
//! let mut writer = StoreWriter::create("scan.h5", &Attrs::new())?;
//! writer.create_group("data", &Attrs::new())?;
//! writer.write_dataset("data/frames", &frames, &Attrs::new())?;
//! writer.finish()?;
//!
//! let store = Store::open("scan.h5")?;
//! let frames = store.read_array("data/frames")?;
//! ```

mod attrs;
mod error;
mod reader;
mod writer;

pub use attrs::{AttrValue, Attrs};
pub use error::StoreError;
pub use reader::{NodeKind, Store};
pub use writer::StoreWriter;

/// Normalize a node path: strip leading/trailing slashes.
pub(crate) fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

/// Parent path of a node (`None` for the root).
pub(crate) fn parent(path: &str) -> Option<&str> {
    let path = normalize(path);
    if path.is_empty() {
        return None;
    }
    Some(path.rsplit_once('/').map(|(p, _)| p).unwrap_or(""))
}
