//! Colourized-digit dataset synthesis: digits inverted over tinted background crops.

use crate::mnist::load_idx_images;
use crate::stats::summarize;
use crate::store::save;
use crate::types::{DatasetError, DatasetResult, DatasetSummary, DigitSet, ImageTensor, Inversion};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, RgbImage};
use rand::{Rng, RngCore, SeedableRng};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

/// Upsampled digit intensity above this marks a foreground pixel.
pub const MASK_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct ColorizeOptions {
    /// Output side length in pixels.
    pub resolution: u32,
    /// Tint each crop with an independent random shift per channel.
    pub recolor: bool,
    pub inversion: Inversion,
}

impl Default for ColorizeOptions {
    fn default() -> Self {
        Self {
            resolution: 64,
            recolor: true,
            inversion: Inversion::Symmetric,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory receiving `<name>.safetensors`.
    pub out_dir: PathBuf,
    /// MNIST IDX image file providing the base digits.
    pub digits_path: PathBuf,
    /// Background photograph the crops are taken from.
    pub background_path: PathBuf,
    /// Use only the first N digits.
    pub limit: Option<usize>,
    pub seed: Option<u64>,
    pub colorize: ColorizeOptions,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub path: PathBuf,
    pub summary: DatasetSummary,
    /// Fraction of pixels that were inverted.
    pub foreground_fraction: f32,
}

/// Synthesize the dataset and persist it as `<out_dir>/<name>.safetensors`.
///
/// Inputs are validated before anything is written; a rebuild overwrites the
/// previous file.
pub fn build(name: &str, opts: &BuildOptions) -> DatasetResult<BuildReport> {
    let background = open_background(&opts.background_path)?;
    check_background(&background, opts.colorize.resolution)?;
    let digits = load_idx_images(&opts.digits_path, opts.limit)?;

    let mut rng: Box<dyn RngCore> = match opts.seed {
        Some(seed) => Box::new(rand::rngs::StdRng::seed_from_u64(seed)),
        None => Box::new(rand::rngs::StdRng::from_rng(&mut rand::rng())),
    };
    let (tensor, foreground_fraction) =
        colorize_with_coverage(&digits, &background, &opts.colorize, rng.as_mut())?;
    let summary = summarize(&tensor);
    let path = save(&opts.out_dir, name, &tensor)?;
    info!(
        "built dataset '{}' -> {} ({} images, {}x{}, range [{:.3}, {:.3}], foreground {:.1}%)",
        name,
        path.display(),
        summary.count,
        summary.resolution,
        summary.resolution,
        summary.min,
        summary.max,
        foreground_fraction * 100.0
    );
    Ok(BuildReport {
        path,
        summary,
        foreground_fraction,
    })
}

fn open_background(path: &Path) -> DatasetResult<RgbImage> {
    if !path.exists() {
        return Err(DatasetError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let img = image::open(path).map_err(|source| DatasetError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

fn check_background(background: &RgbImage, resolution: u32) -> DatasetResult<()> {
    let (width, height) = background.dimensions();
    if resolution == 0 || width < resolution || height < resolution {
        return Err(DatasetError::InvalidDimensions {
            width,
            height,
            resolution,
        });
    }
    Ok(())
}

/// In-memory core of [`build`]: returns an `[N, R, R, 3]` tensor.
pub fn colorize(
    digits: &DigitSet,
    background: &RgbImage,
    opts: &ColorizeOptions,
    rng: &mut dyn RngCore,
) -> DatasetResult<ImageTensor> {
    colorize_with_coverage(digits, background, opts, rng).map(|(t, _)| t)
}

fn colorize_with_coverage(
    digits: &DigitSet,
    background: &RgbImage,
    opts: &ColorizeOptions,
    rng: &mut dyn RngCore,
) -> DatasetResult<(ImageTensor, f32)> {
    check_background(background, opts.resolution)?;
    let res = opts.resolution;
    let side = res as usize;
    let count = digits.len();

    let masks: Vec<Vec<bool>> = (0..count)
        .into_par_iter()
        .map(|i| {
            upsample_digit(digits.digit(i), digits.side as u32, res)
                .into_iter()
                .map(|v| v > MASK_THRESHOLD)
                .collect()
        })
        .collect();

    let (bg_w, bg_h) = background.dimensions();
    let mut data = Vec::with_capacity(count * side * side * 3);
    let mut foreground = 0usize;
    for mask in &masks {
        let x0 = rng.random_range(0..=bg_w - res);
        let y0 = rng.random_range(0..=bg_h - res);
        let crop = imageops::crop_imm(background, x0, y0, res, res).to_image();

        let shifts: [Option<f32>; 3] = if opts.recolor {
            [
                Some(rng.random_range(0.0..1.0)),
                Some(rng.random_range(0.0..1.0)),
                Some(rng.random_range(0.0..1.0)),
            ]
        } else {
            [None; 3]
        };

        for (pixel, &is_fg) in crop.pixels().zip(mask.iter()) {
            if is_fg {
                foreground += 1;
            }
            for c in 0..3 {
                let mut v = pixel[c] as f32 / 127.5 - 1.0;
                if let Some(shift) = shifts[c] {
                    v = (v + shift) / 2.0;
                }
                if is_fg {
                    v = opts.inversion.apply(v);
                }
                data.push(v);
            }
        }
    }

    let total = (count * side * side).max(1);
    let tensor = ImageTensor::new(data, [count, side, side, 3])?;
    Ok((tensor, foreground as f32 / total as f32))
}

/// Smooth (triangle filter) resize of one square grayscale digit.
pub fn upsample_digit(pixels: &[f32], side: u32, target: u32) -> Vec<f32> {
    let src: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(side, side, |x, y| {
            Luma([pixels[(y * side + x) as usize].clamp(0.0, 1.0)])
        });
    let resized = imageops::resize(&src, target, target, FilterType::Triangle);
    resized.into_raw()
}
