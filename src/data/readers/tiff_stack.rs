//! Reader for grayscale TIFF files, including multi-page stacks.
//!
//! Every page of a multi-page file is decoded and stacked along a new
//! leading axis, giving `(pages, height, width)`. A single page comes back
//! as 2D `(height, width)` and the datacube loader rejects it by rank.

use std::io::Cursor;

use ndarray::{Array2, Array3, ArrayD, Axis};
use serde_json::json;
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};

use crate::data::ForeignMetadata;
use crate::data::reader::{Extracted, MicroscopyReader, ReaderError};

/// Little endian, big endian and BigTIFF signatures.
const TIFF_MAGIC: [&[u8]; 4] = [b"II*\0", b"MM\0*", b"II+\0", b"MM\0+"];

/// Loader for grayscale TIFF images and page stacks.
pub struct TiffReader;

fn tiff_error(e: tiff::TiffError) -> ReaderError {
    ReaderError::new(format!("Failed to decode TIFF: {}", e))
}

/// Decoded samples of one page, converted to `f32` without rescaling.
fn page_samples(page: DecodingResult) -> Vec<f32> {
    match page {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F16(v) => v.into_iter().map(|x| x.to_f32()).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
    }
}

impl MicroscopyReader for TiffReader {
    fn id(&self) -> &'static str {
        "tiff"
    }

    fn display_name(&self) -> &'static str {
        "TIFF Image Stack (grayscale)"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["tif", "tiff"]
    }

    fn can_read(&self, data: &[u8]) -> bool {
        TIFF_MAGIC.iter().any(|magic| data.starts_with(magic))
    }

    fn read(&self, data: &[u8]) -> Result<Extracted, ReaderError> {
        if !self.can_read(data) {
            return Err(ReaderError::new("Missing TIFF signature"));
        }

        let mut decoder = Decoder::new(Cursor::new(data)).map_err(tiff_error)?;
        let (width, height) = decoder.dimensions().map_err(tiff_error)?;
        let color = decoder.colortype().map_err(tiff_error)?;
        let bits = match color {
            ColorType::Gray(bits) => bits,
            other => {
                return Err(ReaderError::new(format!(
                    "Only grayscale TIFF pages are supported, found {:?}",
                    other
                )));
            }
        };

        let shape = (height as usize, width as usize);
        let mut pages: Vec<Array2<f32>> = Vec::new();
        loop {
            let page_dims = decoder.dimensions().map_err(tiff_error)?;
            if page_dims != (width, height) {
                return Err(ReaderError::new(format!(
                    "TIFF page {} is {}x{}, expected {}x{}",
                    pages.len(),
                    page_dims.0,
                    page_dims.1,
                    width,
                    height
                )));
            }
            let page_color = decoder.colortype().map_err(tiff_error)?;
            if page_color != color {
                return Err(ReaderError::new(format!(
                    "TIFF page {} is {:?}, expected {:?}",
                    pages.len(),
                    page_color,
                    color
                )));
            }

            let samples = page_samples(decoder.read_image().map_err(tiff_error)?);
            let page = Array2::from_shape_vec(shape, samples)
                .map_err(|e| ReaderError::new(format!("TIFF page shape error: {}", e)))?;
            pages.push(page);

            if !decoder.more_images() {
                break;
            }
            decoder.next_image().map_err(tiff_error)?;
        }

        let page_count = pages.len();
        let array: ArrayD<f32> = if page_count == 1 {
            pages.remove(0).into_dyn()
        } else {
            let views: Vec<_> = pages.iter().map(|p| p.view()).collect();
            let stack: Array3<f32> = ndarray::stack(Axis(0), &views)
                .map_err(|e| ReaderError::new(format!("TIFF stack error: {}", e)))?;
            stack.into_dyn()
        };

        log::debug!(
            "TiffReader: {} page(s) of {}x{} at {} bits",
            page_count,
            width,
            height,
            bits
        );

        let shape = array.shape().to_vec();
        let shortlist = json!({
            "format": "tiff",
            "shape": shape,
        });
        let full = json!({
            "format": "tiff",
            "shape": shape,
            "pages": page_count,
            "bits_per_sample": bits,
            "color_type": format!("{:?}", color),
        });

        Ok(Extracted {
            array,
            metadata: ForeignMetadata::new(shortlist, full),
        })
    }

    fn priority(&self) -> i32 {
        // Stacks can carry whole scans, unlike the generic image formats
        5
    }
}
