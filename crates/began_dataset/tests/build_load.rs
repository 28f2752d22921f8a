//! End-to-end dataset workflows: IDX digits + background photo -> safetensors -> loader.

use began_dataset::mnist::encode_idx_images;
use began_dataset::{
    build, load, summarize, validate_range, BuildOptions, ColorizeOptions, DatasetError,
    DigitSet, Inversion,
};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Stage `count` synthetic 28x28 digits (a filled square) and a background photo.
fn stage_inputs(root: &Path, count: usize, bg_size: (u32, u32)) -> anyhow::Result<(PathBuf, PathBuf)> {
    let mut pixels = Vec::with_capacity(count * 28 * 28);
    for i in 0..count {
        for y in 0..28 {
            for x in 0..28 {
                let inside = (8..20).contains(&x) && (8..20).contains(&y);
                pixels.push(if inside { 1.0 } else { (i % 3) as f32 * 0.1 });
            }
        }
    }
    let digits = DigitSet::new(28, pixels)?;
    let digits_path = root.join("train-images-idx3-ubyte");
    fs::write(&digits_path, encode_idx_images(&digits))?;

    let bg = RgbImage::from_fn(bg_size.0, bg_size.1, |x, y| {
        Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 90])
    });
    let bg_path = root.join("color_img.png");
    bg.save(&bg_path)?;
    Ok((digits_path, bg_path))
}

fn options(root: &Path, digits: PathBuf, background: PathBuf, resolution: u32) -> BuildOptions {
    BuildOptions {
        out_dir: root.join("data"),
        digits_path: digits,
        background_path: background,
        limit: None,
        seed: None,
        colorize: ColorizeOptions {
            resolution,
            recolor: true,
            inversion: Inversion::Symmetric,
        },
    }
}

#[test]
fn build_then_load_preserves_shape_and_reads_are_idempotent() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (digits, bg) = stage_inputs(tmp.path(), 12, (96, 80))?;
    let opts = options(tmp.path(), digits, bg, 32);

    let report = build("mnist_data", &opts)?;
    assert_eq!(report.path, opts.out_dir.join("mnist_data.safetensors"));
    assert!(report.foreground_fraction > 0.05 && report.foreground_fraction < 0.5);

    let first = load(&opts.out_dir, "mnist_data")?;
    assert_eq!(first.shape(), [12, 32, 32, 3]);
    validate_range(&summarize(&first), -1.0, 1.0)?;

    let second = load(&opts.out_dir, "mnist_data")?;
    let a: Vec<u32> = first.as_slice().iter().map(|v| v.to_bits()).collect();
    let b: Vec<u32> = second.as_slice().iter().map(|v| v.to_bits()).collect();
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn rebuild_overwrites_instead_of_appending() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (digits, bg) = stage_inputs(tmp.path(), 4, (40, 40))?;
    let mut opts = options(tmp.path(), digits, bg, 16);
    build("mnist_data", &opts)?;
    opts.limit = Some(2);
    build("mnist_data", &opts)?;
    assert_eq!(load(&opts.out_dir, "mnist_data")?.count(), 2);
    Ok(())
}

#[test]
fn small_background_fails_before_writing() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (digits, bg) = stage_inputs(tmp.path(), 2, (64, 30))?;
    let opts = options(tmp.path(), digits, bg, 32);
    let err = build("mnist_data", &opts).unwrap_err();
    assert!(matches!(err, DatasetError::InvalidDimensions { height: 30, .. }));
    assert!(!opts.out_dir.join("mnist_data.safetensors").exists());
    Ok(())
}

#[test]
fn missing_inputs_are_reported() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (digits, _bg) = stage_inputs(tmp.path(), 2, (40, 40))?;
    let opts = options(tmp.path(), digits, tmp.path().join("nope.png"), 16);
    assert!(matches!(
        build("mnist_data", &opts).unwrap_err(),
        DatasetError::MissingFile { .. }
    ));
    assert!(matches!(
        load(&opts.out_dir, "mnist_data").unwrap_err(),
        DatasetError::MissingFile { .. }
    ));
    Ok(())
}
