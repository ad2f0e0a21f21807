//! Reader for standard image formats (PNG, JPEG, BMP, WebP).
//!
//! TIFF goes to the stack reader, which keeps every page.
//!
//! A single image is one diffraction pattern, not a scan: the array comes
//! back as 2D `(height, width)` and the datacube loader rejects it by rank.

use ndarray::Array2;
use serde_json::json;

use crate::data::ForeignMetadata;
use crate::data::reader::{Extracted, MicroscopyReader, ReaderError};

/// Loader for standard image formats, decoded as 16-bit grayscale.
pub struct ImageReader;

impl MicroscopyReader for ImageReader {
    fn id(&self) -> &'static str {
        "image"
    }

    fn display_name(&self) -> &'static str {
        "Standard Image (grayscale)"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["png", "jpg", "jpeg", "bmp", "webp"]
    }

    fn can_read(&self, data: &[u8]) -> bool {
        // Check common image magic bytes
        if data.len() < 8 {
            return false;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return true;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return true;
        }

        // BMP: 42 4D (BM)
        if data.starts_with(&[0x42, 0x4D]) {
            return true;
        }

        // WebP: RIFF....WEBP
        data.len() >= 12 && data.starts_with(&[0x52, 0x49, 0x46, 0x46]) && &data[8..12] == b"WEBP"
    }

    fn read(&self, data: &[u8]) -> Result<Extracted, ReaderError> {
        let format = image::guess_format(data).ok();
        let img = image::load_from_memory(data)
            .map_err(|e| ReaderError::new(format!("Failed to decode image: {}", e)))?;
        let color = img.color();
        let gray = img.to_luma16();

        let (width, height) = gray.dimensions();
        let pattern = Array2::from_shape_vec(
            (height as usize, width as usize),
            gray.into_raw().into_iter().map(f32::from).collect(),
        )
        .map_err(|e| ReaderError::new(format!("Image shape error: {}", e)))?;

        log::trace!("ImageReader: decoded {}x{} {:?} image", width, height, color);

        let shortlist = json!({
            "format": "image",
            "shape": [height, width],
        });
        let full = json!({
            "format": "image",
            "shape": [height, width],
            "image_format": format.map(|f| format!("{:?}", f)),
            "color_type": format!("{:?}", color),
        });

        Ok(Extracted {
            array: pattern.into_dyn(),
            metadata: ForeignMetadata::new(shortlist, full),
        })
    }

    fn priority(&self) -> i32 {
        // Standard images have lower priority than scientific formats
        0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use image::{ImageBuffer, ImageFormat, Luma};

    use super::*;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(width, height, |x, y| Luma([(x + y * width) as u16]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_reader_metadata() {
        let reader = ImageReader;
        assert_eq!(reader.id(), "image");
        assert!(reader.extensions().contains(&"png"));
        assert!(!reader.extensions().contains(&"tif"));
    }

    #[test]
    fn test_magic_detection() {
        let reader = ImageReader;
        assert!(reader.can_read(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]));
        assert!(reader.can_read(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46]));
        assert!(!reader.can_read(&[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]));
        assert!(!reader.can_read(b"II*\0\x08\0\0\0"));
    }

    #[test]
    fn test_png_is_two_dimensional() {
        let extracted = ImageReader.read(&png_bytes(5, 3)).unwrap();
        assert_eq!(extracted.array.shape(), &[3, 5]);
        assert_eq!(extracted.array[[2, 4]], 14.0);
        assert_eq!(extracted.metadata.shortlist["shape"], json!([3, 5]));
        assert_eq!(extracted.metadata.full["image_format"], "Png");
    }
}
