//! Native container format.
//!
//! A native container is a hierarchical store (see `stemcube_store`) laid
//! out according to [`schema`]. This module knows the layout; detection and
//! loading live in [`crate::data`].

mod metadata;
pub mod schema;
mod writer;

pub use metadata::{ContainerMetadata, DimensionDescriptor, flatten_into, read_native_metadata};
pub use schema::MetadataSection;
pub use writer::save_native;
