//! Built-in foreign readers.

mod mrc;
mod npy;
mod raster;
mod tiff_stack;

pub use mrc::MrcReader;
pub use npy::NpyReader;
pub use raster::ImageReader;
pub use tiff_stack::TiffReader;

#[cfg(test)]
pub(crate) use mrc::tests::{mrc_bytes, oversized_mrc_bytes};
#[cfg(test)]
pub(crate) use raster::tests::png_bytes;
#[cfg(test)]
pub(crate) use tiff_stack::tests::tiff_stack_bytes;
