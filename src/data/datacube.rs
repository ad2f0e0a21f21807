//! In-memory 4D-STEM datacube.

use std::path::{Path, PathBuf};

use ndarray::{Array4, ArrayView4, ArrayViewMut4};
use serde_json::Value;

/// Metadata trees produced by a foreign reader.
///
/// Both trees are passed through unmodified; no schema is imposed on them.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignMetadata {
    /// Curated subset (shape, dtype, pixel sizes, ...)
    pub shortlist: Value,
    /// Everything the reader found in the file
    pub full: Value,
}

impl ForeignMetadata {
    pub fn new(shortlist: Value, full: Value) -> Self {
        Self { shortlist, full }
    }
}

/// A loaded 4D-STEM dataset.
///
/// The array is indexed as `(R_Ny, R_Nx, Q_Ny, Q_Nx)`: scan row, scan
/// column, detector row, detector column. Shape fields are fixed when the
/// datacube is built; values can be edited through [`DataCube::data_mut`],
/// which cannot reshape the array.
#[derive(Debug, Clone)]
pub struct DataCube {
    data: Array4<f32>,
    r_ny: usize,
    r_nx: usize,
    q_ny: usize,
    q_nx: usize,
    filename: Option<PathBuf>,
    is_native: bool,
    metadata: Option<ForeignMetadata>,
}

impl DataCube {
    /// Wrap an array read from a native container.
    pub fn native(data: Array4<f32>, filename: impl Into<PathBuf>) -> Self {
        Self::build(data, Some(filename.into()), true, None)
    }

    /// Wrap an array read by a foreign reader, keeping its metadata.
    pub fn foreign(
        data: Array4<f32>,
        filename: impl Into<PathBuf>,
        metadata: ForeignMetadata,
    ) -> Self {
        Self::build(data, Some(filename.into()), false, Some(metadata))
    }

    /// Wrap a synthetic array with no file behind it.
    pub fn placeholder(data: Array4<f32>, filename: Option<PathBuf>) -> Self {
        Self::build(data, filename, false, None)
    }

    fn build(
        data: Array4<f32>,
        filename: Option<PathBuf>,
        is_native: bool,
        metadata: Option<ForeignMetadata>,
    ) -> Self {
        let (r_ny, r_nx, q_ny, q_nx) = data.dim();
        Self {
            data,
            r_ny,
            r_nx,
            q_ny,
            q_nx,
            filename,
            is_native,
            metadata,
        }
    }

    /// Scan rows (`R_Ny`).
    pub fn r_ny(&self) -> usize {
        self.r_ny
    }

    /// Scan columns (`R_Nx`).
    pub fn r_nx(&self) -> usize {
        self.r_nx
    }

    /// Detector rows (`Q_Ny`).
    pub fn q_ny(&self) -> usize {
        self.q_ny
    }

    /// Detector columns (`Q_Nx`).
    pub fn q_nx(&self) -> usize {
        self.q_nx
    }

    /// `(R_Ny, R_Nx, Q_Ny, Q_Nx)`
    pub fn shape(&self) -> [usize; 4] {
        [self.r_ny, self.r_nx, self.q_ny, self.q_nx]
    }

    /// Number of scan positions.
    pub fn scan_positions(&self) -> usize {
        self.r_ny * self.r_nx
    }

    pub fn data(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// Mutable view of the values; the shape stays fixed.
    pub fn data_mut(&mut self) -> ArrayViewMut4<'_, f32> {
        self.data.view_mut()
    }

    /// Consume the datacube, returning the owned array.
    pub fn into_data(self) -> Array4<f32> {
        self.data
    }

    /// Diffraction pattern recorded at scan position `(ry, rx)`.
    pub fn pattern(&self, ry: usize, rx: usize) -> Option<ndarray::ArrayView2<'_, f32>> {
        (ry < self.r_ny && rx < self.r_nx)
            .then(|| self.data.slice(ndarray::s![ry, rx, .., ..]))
    }

    /// Path the data was read from, if it came from a file.
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Whether the data came from a native container.
    pub fn is_native(&self) -> bool {
        self.is_native
    }

    /// Metadata from a foreign reader, if any.
    pub fn metadata(&self) -> Option<&ForeignMetadata> {
        self.metadata.as_ref()
    }
}
