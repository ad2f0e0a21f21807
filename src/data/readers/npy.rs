//! Reader for NumPy `.npy` files.

use std::io::Cursor;

use ndarray::ArrayD;
use ndarray_npy::{ReadNpyExt, ReadableElement};
use serde_json::json;

use crate::data::ForeignMetadata;
use crate::data::reader::{Extracted, MicroscopyReader, ReaderError};

/// NumPy magic bytes: \x93NUMPY
const NPY_MAGIC: &[u8] = &[0x93, b'N', b'U', b'M', b'P', b'Y'];

/// Element type found in a decoded array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dtype {
    F32,
    F64,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Bool,
}

impl Dtype {
    /// NumPy name of the dtype.
    fn name(&self) -> &'static str {
        match self {
            Dtype::F32 => "float32",
            Dtype::F64 => "float64",
            Dtype::U8 => "uint8",
            Dtype::U16 => "uint16",
            Dtype::U32 => "uint32",
            Dtype::U64 => "uint64",
            Dtype::I8 => "int8",
            Dtype::I16 => "int16",
            Dtype::I32 => "int32",
            Dtype::I64 => "int64",
            Dtype::Bool => "bool",
        }
    }
}

/// Conversion of stored element types to `f32` samples.
///
/// Values are converted without rescaling, so detector counts keep their
/// physical meaning. 64-bit integers lose precision above 2^24.
trait Sample: Copy {
    fn to_f32(self) -> f32;
}

impl Sample for f32 {
    fn to_f32(self) -> f32 {
        self
    }
}

impl Sample for f64 {
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Sample for u8 {
    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

impl Sample for u16 {
    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

impl Sample for u32 {
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Sample for u64 {
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Sample for i8 {
    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

impl Sample for i16 {
    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

impl Sample for i32 {
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Sample for i64 {
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Sample for bool {
    fn to_f32(self) -> f32 {
        if self { 1.0 } else { 0.0 }
    }
}

/// Check whether `bytes` start with the NumPy magic.
fn is_npy(bytes: &[u8]) -> bool {
    bytes.starts_with(NPY_MAGIC)
}

/// Decode an in-memory `.npy` file, probing the dtypes in order of
/// likelihood.
fn decode_npy(bytes: &[u8]) -> Result<(ArrayD<f32>, Dtype), String> {
    if !is_npy(bytes) {
        return Err("missing NumPy magic bytes".to_string());
    }

    // f32 is most common for scientific data, then detector integer types
    try_read::<f32>(bytes, Dtype::F32)
        .or_else(|| try_read::<u16>(bytes, Dtype::U16))
        .or_else(|| try_read::<f64>(bytes, Dtype::F64))
        .or_else(|| try_read::<u8>(bytes, Dtype::U8))
        .or_else(|| try_read::<u32>(bytes, Dtype::U32))
        .or_else(|| try_read::<i16>(bytes, Dtype::I16))
        .or_else(|| try_read::<i32>(bytes, Dtype::I32))
        .or_else(|| try_read::<i64>(bytes, Dtype::I64))
        .or_else(|| try_read::<u64>(bytes, Dtype::U64))
        .or_else(|| try_read::<i8>(bytes, Dtype::I8))
        .or_else(|| try_read::<bool>(bytes, Dtype::Bool))
        .ok_or_else(|| "unsupported dtype or truncated array".to_string())
}

fn try_read<T>(bytes: &[u8], dtype: Dtype) -> Option<(ArrayD<f32>, Dtype)>
where
    T: ReadableElement + Sample,
{
    match ArrayD::<T>::read_npy(Cursor::new(bytes)) {
        Ok(array) => Some((array.mapv(Sample::to_f32), dtype)),
        Err(e) => {
            log::trace!("npy: not {} ({})", dtype.name(), e);
            None
        }
    }
}

/// Reader for NumPy `.npy` files.
///
/// Arrays of any rank are returned as stored; the datacube loader decides
/// whether the rank is usable. Supported data types: `f32`, `f64`, `u8`,
/// `u16`, `u32`, `u64`, `i8`, `i16`, `i32`, `i64` and `bool`.
pub struct NpyReader;

impl NpyReader {
    /// Raw header dictionary text (`{'descr': '<f4', ...}`), if well formed.
    fn header_text(data: &[u8]) -> Option<String> {
        let major = *data.get(NPY_MAGIC.len())?;
        let (len_bytes, start): (usize, usize) = match major {
            1 => (2, 10),
            2 | 3 => (4, 12),
            _ => return None,
        };

        let len_field = data.get(8..8 + len_bytes)?;
        let header_len = len_field
            .iter()
            .rev()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
        let header = data.get(start..start.checked_add(header_len)?)?;

        Some(String::from_utf8_lossy(header).trim().to_string())
    }
}

impl MicroscopyReader for NpyReader {
    fn id(&self) -> &'static str {
        "npy"
    }

    fn display_name(&self) -> &'static str {
        "NumPy Array (.npy)"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["npy"]
    }

    fn can_read(&self, data: &[u8]) -> bool {
        is_npy(data)
    }

    fn read(&self, data: &[u8]) -> Result<Extracted, ReaderError> {
        let (array, dtype) = decode_npy(data)
            .map_err(|e| ReaderError::new(format!("Failed to read NumPy array: {}", e)))?;

        let shape = array.shape().to_vec();
        log::debug!("NpyReader: {} array with shape {:?}", dtype.name(), shape);

        let shortlist = json!({
            "format": "npy",
            "dtype": dtype.name(),
            "shape": shape,
        });
        let full = json!({
            "format": "npy",
            "dtype": dtype.name(),
            "shape": shape,
            "byte_length": data.len(),
            "header": Self::header_text(data),
        });

        Ok(Extracted {
            array,
            metadata: ForeignMetadata::new(shortlist, full),
        })
    }

    fn priority(&self) -> i32 {
        // NumPy files are specifically scientific data
        10
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Array3};
    use ndarray_npy::WriteNpyExt;

    use super::*;

    fn encode<T: WriteNpyExt>(array: &T) -> Vec<u8> {
        let mut bytes = Vec::new();
        array.write_npy(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_reader_metadata() {
        let reader = NpyReader;
        assert_eq!(reader.id(), "npy");
        assert!(reader.extensions().contains(&"npy"));
        assert_eq!(reader.priority(), 10);
    }

    #[test]
    fn test_magic_detection() {
        let reader = NpyReader;
        assert!(reader.can_read(&[0x93, b'N', b'U', b'M', b'P', b'Y', 0x01, 0x00]));
        assert!(!reader.can_read(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(decode_npy(&[0x89, 0x50, 0x4E, 0x47]).is_err());
    }

    #[test]
    fn test_read_stack_with_metadata() {
        let stack = Array3::<u16>::from_shape_fn((5, 4, 3), |(i, _, _)| i as u16);
        let extracted = NpyReader.read(&encode(&stack)).unwrap();

        assert_eq!(extracted.array.shape(), &[5, 4, 3]);
        assert_eq!(extracted.array[[4, 0, 0]], 4.0);

        let shortlist = &extracted.metadata.shortlist;
        assert_eq!(shortlist["format"], "npy");
        assert_eq!(shortlist["dtype"], "uint16");
        assert_eq!(shortlist["shape"], json!([5, 4, 3]));

        let header = extracted.metadata.full["header"].as_str().unwrap();
        assert!(header.contains("'descr'"));
        assert!(header.contains("(5, 4, 3)"));
    }

    #[test]
    fn test_decode_keeps_counts() {
        let array = Array2::from_shape_vec((2, 2), vec![0u16, 1, 1000, 65535]).unwrap();
        let (data, dtype) = decode_npy(&encode(&array)).unwrap();
        assert_eq!(dtype, Dtype::U16);
        assert_eq!(data[[1, 1]], 65535.0);

        let array = Array3::<f64>::from_elem((2, 3, 4), 0.25);
        let (data, dtype) = decode_npy(&encode(&array)).unwrap();
        assert_eq!(dtype, Dtype::F64);
        assert!((data[[1, 2, 3]] - 0.25).abs() < f32::EPSILON);

        let signed = Array2::from_shape_vec((1, 2), vec![-5i16, 7]).unwrap();
        let (data, dtype) = decode_npy(&encode(&signed)).unwrap();
        assert_eq!(dtype, Dtype::I16);
        assert_eq!(data[[0, 0]], -5.0);
    }

    #[test]
    fn test_int64_stack() {
        // NumPy's default integer dtype
        let stack = Array3::<i64>::from_shape_fn((4, 3, 3), |(i, j, k)| (i * 9 + j * 3 + k) as i64 - 5);
        let extracted = NpyReader.read(&encode(&stack)).unwrap();

        assert_eq!(extracted.array.shape(), &[4, 3, 3]);
        assert_eq!(extracted.array[[0, 0, 0]], -5.0);
        assert_eq!(extracted.array[[3, 2, 2]], 30.0);
        assert_eq!(extracted.metadata.shortlist["dtype"], "int64");
    }

    #[test]
    fn test_uint64_and_bool() {
        let counts = Array2::from_shape_vec((1, 3), vec![0u64, 7, 1 << 40]).unwrap();
        let (data, dtype) = decode_npy(&encode(&counts)).unwrap();
        assert_eq!(dtype, Dtype::U64);
        assert_eq!(data[[0, 1]], 7.0);
        assert_eq!(data[[0, 2]], (1u64 << 40) as f32);

        let mask = Array2::from_shape_vec((2, 2), vec![true, false, false, true]).unwrap();
        let (data, dtype) = decode_npy(&encode(&mask)).unwrap();
        assert_eq!(dtype, Dtype::Bool);
        assert_eq!(data.iter().copied().collect::<Vec<_>>(), vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(NpyReader.read(b"\x93NUMPY garbage").is_err());
        assert!(NpyReader.read(b"plain text").is_err());

        let array = Array2::<f32>::zeros((8, 8));
        let bytes = encode(&array);
        assert!(decode_npy(&bytes[..bytes.len() - 16]).is_err());
    }
}
