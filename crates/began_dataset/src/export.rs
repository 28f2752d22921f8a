//! PNG export of image batches.

use crate::types::{DatasetError, DatasetResult, ImageTensor};
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};

/// Map a [-1, 1] value to an 8-bit channel, clamping anything outside.
pub fn to_u8(v: f32) -> u8 {
    if !v.is_finite() {
        return 0;
    }
    (((v + 1.0) * 0.5).clamp(0.0, 1.0) * 255.0).round() as u8
}

pub fn to_rgb_image(images: &ImageTensor, index: usize) -> DatasetResult<RgbImage> {
    if images.channels() != 3 {
        return Err(DatasetError::Shape(format!(
            "expected 3 channels for PNG export, got {}",
            images.channels()
        )));
    }
    let side = images.resolution() as u32;
    let raw: Vec<u8> = images.image(index).iter().map(|&v| to_u8(v)).collect();
    RgbImage::from_raw(side, side, raw)
        .ok_or_else(|| DatasetError::Shape(format!("image {index} has the wrong byte length")))
}

/// Write every image as `<dir>/<prefix><i>.png`, overwriting existing files.
pub fn write_pngs(dir: &Path, prefix: &str, images: &ImageTensor) -> DatasetResult<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|source| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut written = Vec::with_capacity(images.count());
    for i in 0..images.count() {
        let path = dir.join(format!("{prefix}{i}.png"));
        to_rgb_image(images, i)?
            .save(&path)
            .map_err(|source| DatasetError::Image {
                path: path.clone(),
                source,
            })?;
        written.push(path);
    }
    Ok(written)
}
