//! Reader for MNIST IDX image files (`train-images-idx3-ubyte`).

use crate::types::{DatasetError, DatasetResult, DigitSet};
use std::fs;
use std::path::Path;

const IDX3_MAGIC: u32 = 2051;
const HEADER_LEN: usize = 16;

fn read_u32_be(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Load grayscale digits scaled to [0, 1]. `limit` truncates to the first N images.
pub fn load_idx_images(path: &Path, limit: Option<usize>) -> DatasetResult<DigitSet> {
    if !path.exists() {
        return Err(DatasetError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_idx_images(&bytes, limit).map_err(|msg| DatasetError::Format {
        path: path.to_path_buf(),
        msg,
    })
}

pub(crate) fn parse_idx_images(bytes: &[u8], limit: Option<usize>) -> Result<DigitSet, String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!("file too short for an IDX header ({} bytes)", bytes.len()));
    }
    let magic = read_u32_be(bytes, 0);
    if magic != IDX3_MAGIC {
        return Err(format!("bad magic {magic}, expected {IDX3_MAGIC}"));
    }
    let count = read_u32_be(bytes, 4) as usize;
    let rows = read_u32_be(bytes, 8) as usize;
    let cols = read_u32_be(bytes, 12) as usize;
    if rows != cols || rows == 0 {
        return Err(format!("digits must be square, got {rows}x{cols}"));
    }
    let per = rows * cols;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() < count * per {
        return Err(format!(
            "header declares {count} images but payload holds {} bytes",
            payload.len()
        ));
    }
    let take = limit.map_or(count, |l| l.min(count));
    let pixels = payload[..take * per]
        .iter()
        .map(|&b| b as f32 / 255.0)
        .collect();
    DigitSet::new(rows, pixels).map_err(|e| e.to_string())
}

/// Encode digits back into IDX3 bytes. Used to stage fixtures for the builder.
pub fn encode_idx_images(digits: &DigitSet) -> Vec<u8> {
    let side = digits.side as u32;
    let mut out = Vec::with_capacity(HEADER_LEN + digits.pixels.len());
    out.extend_from_slice(&IDX3_MAGIC.to_be_bytes());
    out.extend_from_slice(&(digits.len() as u32).to_be_bytes());
    out.extend_from_slice(&side.to_be_bytes());
    out.extend_from_slice(&side.to_be_bytes());
    out.extend(
        digits
            .pixels
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8),
    );
    out
}
