//! Reader for MRC/CCP4 image stacks.
//!
//! Many direct-electron detectors export 4D-STEM scans as an MRC stack with
//! one frame per scan position. Only little-endian files are supported.

use ndarray::{ArrayD, IxDyn};
use serde_json::{Value, json};

use crate::data::ForeignMetadata;
use crate::data::reader::{Extracted, MicroscopyReader, ReaderError};

/// Size of the fixed MRC header.
const HEADER_LEN: usize = 1024;
/// Offset of the `MAP ` identifier.
const MAP_OFFSET: usize = 208;
/// Offset of the machine stamp.
const MACHST_OFFSET: usize = 212;
const LABEL_COUNT_OFFSET: usize = 220;
const LABELS_OFFSET: usize = 224;
const LABEL_LEN: usize = 80;

/// Reader for MRC stacks (`.mrc`, `.mrcs`, `.map`).
pub struct MrcReader;

/// Voxel encodings supported by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    I8,
    I16,
    F32,
    U16,
}

impl Mode {
    fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Mode::I8),
            1 => Some(Mode::I16),
            2 => Some(Mode::F32),
            6 => Some(Mode::U16),
            _ => None,
        }
    }

    fn bytes(&self) -> usize {
        match self {
            Mode::I8 => 1,
            Mode::I16 | Mode::U16 => 2,
            Mode::F32 => 4,
        }
    }

    fn decode(&self, raw: &[u8]) -> f32 {
        match self {
            Mode::I8 => f32::from(raw[0] as i8),
            Mode::I16 => f32::from(i16::from_le_bytes([raw[0], raw[1]])),
            Mode::U16 => f32::from(u16::from_le_bytes([raw[0], raw[1]])),
            Mode::F32 => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        }
    }
}

/// Parsed fixed header.
#[derive(Debug, Clone)]
struct Header {
    nx: usize,
    ny: usize,
    nz: usize,
    mode_code: i32,
    start: [i32; 3],
    sampling: [i32; 3],
    cell: [f32; 3],
    angles: [f32; 3],
    axis_map: [i32; 3],
    stats: [f32; 3],
    space_group: i32,
    extended_len: usize,
    exttyp: String,
    nversion: i32,
    origin: [f32; 3],
    rms: f32,
    labels: Vec<String>,
}

fn word(data: &[u8], offset: usize) -> [u8; 4] {
    [
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]
}

fn i32_at(data: &[u8], index: usize) -> i32 {
    i32::from_le_bytes(word(data, index * 4))
}

fn f32_at(data: &[u8], index: usize) -> f32 {
    f32::from_le_bytes(word(data, index * 4))
}

fn dimension(value: i32, name: &str) -> Result<usize, ReaderError> {
    usize::try_from(value)
        .ok()
        .filter(|&v| v > 0)
        .ok_or_else(|| ReaderError::new(format!("invalid MRC dimension {} = {}", name, value)))
}

impl Header {
    fn parse(data: &[u8]) -> Result<Self, ReaderError> {
        if data.len() < HEADER_LEN {
            return Err(ReaderError::new(format!(
                "file too short for MRC header ({} bytes)",
                data.len()
            )));
        }
        if data[MACHST_OFFSET] == 0x11 {
            return Err(ReaderError::new("big-endian MRC files are not supported"));
        }

        let text = |bytes: &[u8]| {
            String::from_utf8_lossy(bytes)
                .trim_end_matches(['\0', ' '])
                .to_string()
        };

        let label_count = i32_at(data, LABEL_COUNT_OFFSET / 4).clamp(0, 10) as usize;
        let labels = (0..label_count)
            .map(|i| {
                let start = LABELS_OFFSET + i * LABEL_LEN;
                text(&data[start..start + LABEL_LEN])
            })
            .collect();

        let extended_len = i32_at(data, 23);
        let extended_len = usize::try_from(extended_len).map_err(|_| {
            ReaderError::new(format!("invalid extended header length {}", extended_len))
        })?;

        Ok(Self {
            nx: dimension(i32_at(data, 0), "nx")?,
            ny: dimension(i32_at(data, 1), "ny")?,
            nz: dimension(i32_at(data, 2), "nz")?,
            mode_code: i32_at(data, 3),
            start: [i32_at(data, 4), i32_at(data, 5), i32_at(data, 6)],
            sampling: [i32_at(data, 7), i32_at(data, 8), i32_at(data, 9)],
            cell: [f32_at(data, 10), f32_at(data, 11), f32_at(data, 12)],
            angles: [f32_at(data, 13), f32_at(data, 14), f32_at(data, 15)],
            axis_map: [i32_at(data, 16), i32_at(data, 17), i32_at(data, 18)],
            stats: [f32_at(data, 19), f32_at(data, 20), f32_at(data, 21)],
            space_group: i32_at(data, 22),
            extended_len,
            exttyp: text(&data[104..108]),
            nversion: i32_at(data, 27),
            origin: [f32_at(data, 49), f32_at(data, 50), f32_at(data, 51)],
            rms: f32_at(data, 54),
            labels,
        })
    }

    /// Pixel size along x, y, z (cell length / sampling), when defined.
    fn pixel_size(&self) -> [Option<f32>; 3] {
        let mut size = [None; 3];
        for (axis, slot) in size.iter_mut().enumerate() {
            if self.sampling[axis] > 0 && self.cell[axis] > 0.0 {
                *slot = Some(self.cell[axis] / self.sampling[axis] as f32);
            }
        }
        size
    }

    fn to_json(&self) -> Value {
        json!({
            "nx": self.nx,
            "ny": self.ny,
            "nz": self.nz,
            "mode": self.mode_code,
            "nxstart": self.start[0],
            "nystart": self.start[1],
            "nzstart": self.start[2],
            "mx": self.sampling[0],
            "my": self.sampling[1],
            "mz": self.sampling[2],
            "cella": self.cell,
            "cellb": self.angles,
            "mapc": self.axis_map[0],
            "mapr": self.axis_map[1],
            "maps": self.axis_map[2],
            "dmin": self.stats[0],
            "dmax": self.stats[1],
            "dmean": self.stats[2],
            "ispg": self.space_group,
            "nsymbt": self.extended_len,
            "exttyp": self.exttyp,
            "nversion": self.nversion,
            "origin": self.origin,
            "rms": self.rms,
            "labels": self.labels,
        })
    }
}

impl MicroscopyReader for MrcReader {
    fn id(&self) -> &'static str {
        "mrc"
    }

    fn display_name(&self) -> &'static str {
        "MRC Image Stack"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["mrc", "mrcs", "map"]
    }

    fn can_read(&self, data: &[u8]) -> bool {
        data.len() >= HEADER_LEN && &data[MAP_OFFSET..MAP_OFFSET + 4] == b"MAP "
    }

    fn read(&self, data: &[u8]) -> Result<Extracted, ReaderError> {
        let header = Header::parse(data)?;
        let mode = Mode::from_code(header.mode_code).ok_or_else(|| {
            ReaderError::new(format!("unsupported MRC mode {}", header.mode_code))
        })?;

        let overflow = || {
            ReaderError::new(format!(
                "MRC dimensions {}x{}x{} overflow the address space",
                header.nx, header.ny, header.nz
            ))
        };
        let needed = header
            .nx
            .checked_mul(header.ny)
            .and_then(|n| n.checked_mul(header.nz))
            .and_then(|n| n.checked_mul(mode.bytes()))
            .ok_or_else(overflow)?;
        let offset = HEADER_LEN
            .checked_add(header.extended_len)
            .ok_or_else(overflow)?;
        let end = offset.checked_add(needed).ok_or_else(overflow)?;
        let payload = data.get(offset..end).ok_or_else(|| {
            ReaderError::new(format!(
                "MRC data truncated: expected {} bytes after offset {}, file has {}",
                needed,
                offset,
                data.len()
            ))
        })?;

        let values: Vec<f32> = payload
            .chunks_exact(mode.bytes())
            .map(|raw| mode.decode(raw))
            .collect();
        let array = ArrayD::from_shape_vec(IxDyn(&[header.nz, header.ny, header.nx]), values)
            .map_err(|e| ReaderError::new(format!("MRC shape error: {}", e)))?;

        log::debug!(
            "MrcReader: {} frames of {}x{} (mode {})",
            header.nz,
            header.ny,
            header.nx,
            header.mode_code
        );

        let shortlist = json!({
            "format": "mrc",
            "shape": [header.nz, header.ny, header.nx],
            "mode": header.mode_code,
            "pixel_size": header.pixel_size(),
        });
        let full = json!({
            "format": "mrc",
            "header": header.to_json(),
        });

        Ok(Extracted {
            array,
            metadata: ForeignMetadata::new(shortlist, full),
        })
    }

    fn priority(&self) -> i32 {
        10
    }
}
