//! Native container schema.
//!
//! ```text
//! /
//! |--attr: version_major=0
//! |--attr: version_minor=2
//! |--grp: 4D-STEM_data
//!             |--grp: datacube
//!             |          |--attr: emd_group_type=1
//!             |          |--data: datacube   (R_Ny, R_Nx, Q_Ny, Q_Nx)
//!             |          |--data: dim1..dim4 (attrs: name, units)
//!             |--grp: processing
//!             |--grp: metadata
//!                        |--grp: original, microscope, sample, user,
//!                                processing, calibration, comments
//! ```

/// Root attribute holding the schema major version.
pub const VERSION_MAJOR_ATTR: &str = "version_major";
/// Root attribute holding the schema minor version.
pub const VERSION_MINOR_ATTR: &str = "version_minor";

/// Version written by this crate.
pub const CURRENT_VERSION: (i64, i64) = (0, 2);
/// Newest major version this crate can read.
pub const SUPPORTED_MAJOR: i64 = 0;

/// Root group holding the whole payload.
pub const PAYLOAD_ROOT: &str = "4D-STEM_data";
/// Group holding the datacube and its dimension descriptors.
pub const DATACUBE_GROUP: &str = "4D-STEM_data/datacube";
/// The 4D array itself.
pub const DATACUBE_PATH: &str = "4D-STEM_data/datacube/datacube";
/// Opaque group for derived processing artifacts.
pub const PROCESSING_GROUP: &str = "4D-STEM_data/processing";
/// Parent of the metadata sections.
pub const METADATA_GROUP: &str = "4D-STEM_data/metadata";

/// Attribute on the datacube group identifying an EMD data group.
pub const EMD_GROUP_TYPE_ATTR: &str = "emd_group_type";
pub const EMD_GROUP_TYPE: i64 = 1;

/// Attribute names on each dimension descriptor.
pub const DIM_NAME_ATTR: &str = "name";
pub const DIM_UNITS_ATTR: &str = "units";

/// Path of dimension descriptor `axis` (0-based) inside the datacube group.
pub fn dim_path(axis: usize) -> String {
    format!("{}/dim{}", DATACUBE_GROUP, axis + 1)
}

/// Default axis names in array order.
pub const DEFAULT_DIM_NAMES: [&str; 4] = ["R_y", "R_x", "Q_y", "Q_x"];
/// Default axis units in array order.
pub const DEFAULT_DIM_UNITS: [&str; 4] = ["[n_m]", "[n_m]", "[n_m^-1]", "[n_m^-1]"];

/// Named metadata sections under [`METADATA_GROUP`].
///
/// None of them is required; readers treat a missing section as empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataSection {
    /// Raw metadata carried over from the original file
    Original,
    /// Acquisition parameters
    Microscope,
    /// Material, preparation
    Sample,
    /// Operator details
    User,
    /// Processing history
    Processing,
    /// Pixel sizes and rotations derived from data
    Calibration,
    /// Free text
    Comments,
}

impl MetadataSection {
    pub fn all() -> &'static [MetadataSection] {
        &[
            MetadataSection::Original,
            MetadataSection::Microscope,
            MetadataSection::Sample,
            MetadataSection::User,
            MetadataSection::Processing,
            MetadataSection::Calibration,
            MetadataSection::Comments,
        ]
    }

    /// Group name inside the metadata group.
    pub fn name(&self) -> &'static str {
        match self {
            MetadataSection::Original => "original",
            MetadataSection::Microscope => "microscope",
            MetadataSection::Sample => "sample",
            MetadataSection::User => "user",
            MetadataSection::Processing => "processing",
            MetadataSection::Calibration => "calibration",
            MetadataSection::Comments => "comments",
        }
    }

    /// Section with the given group name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|s| s.name() == name)
    }

    /// Full group path of this section.
    pub fn path(&self) -> String {
        format!("{}/{}", METADATA_GROUP, self.name())
    }
}
