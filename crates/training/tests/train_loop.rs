//! Tiny end-to-end runs of the BEGAN loop on the NdArray backend.

use std::path::Path;

use began_dataset::mnist::encode_idx_images;
use began_dataset::{DigitSet, ImageTensor};
use burn::backend::Autodiff;
use burn_ndarray::NdArray;
use image::{Rgb, RgbImage};
use models::BeganConfig;
use training::checkpoint::{self, LATEST_POINTER};
use training::summary::{read_summaries, SUMMARY_FILE};
use training::{ensure_run_dirs, prepare_dataset, train, DivergenceError, TrainConfig};

type B = Autodiff<NdArray<f32>>;

fn tiny_config(root: &Path, batch_size: usize) -> TrainConfig {
    let mut cfg = TrainConfig {
        tag: "0.1".to_string(),
        output_root: root.to_path_buf(),
        epochs: 1,
        seed: Some(7),
        model: BeganConfig {
            image_size: 8,
            noise_dim: 4,
            hidden_dim: 4,
            filters: 4,
            batch_size,
        },
        ..TrainConfig::default()
    };
    cfg.dataset.data_dir = root.join("data");
    cfg
}

fn synthetic_images(count: usize, side: usize) -> ImageTensor {
    let len = count * side * side * 3;
    let data = (0..len)
        .map(|i| ((i * 37 % 200) as f32 / 100.0) - 1.0)
        .collect();
    ImageTensor::new(data, [count, side, side, 3]).unwrap()
}

#[test]
fn one_epoch_runs_every_batch_and_exports_at_step_zero() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cfg = tiny_config(tmp.path(), 10);
    let layout = ensure_run_dirs(&cfg.output_root, &cfg.project_prefix, &cfg.tag)?;
    let dataset = synthetic_images(100, 8);
    let device = Default::default();

    let outcome = train::<B>(&cfg, &dataset, &layout, &device)?;
    assert_eq!(outcome.batches_run, 10);
    assert_eq!(outcome.kt_updates, 10);
    assert_eq!(outcome.checkpoints_written, 1);
    assert_eq!(outcome.sample_exports, 1);
    assert!(outcome.resumed_from.is_none());
    assert!((0.0..=1.0).contains(&outcome.state.kt));
    assert_eq!(outcome.state.global_step, 9);

    assert!(layout.models.join("began-0.bin").is_file());
    assert_eq!(
        std::fs::read_to_string(layout.models.join(LATEST_POINTER))?.trim(),
        "began-0"
    );
    for i in 0..10 {
        assert!(layout.samples.join(format!("train_image{i}.png")).is_file());
        assert!(layout.samples.join(format!("data_image{i}.png")).is_file());
    }
    let summaries = read_summaries(&layout.logs.join(SUMMARY_FILE))?;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].step, 0);
    assert_eq!(summaries[0].learning_rate, cfg.base_lr);
    Ok(())
}

#[test]
fn second_run_restores_the_latest_checkpoint() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cfg = tiny_config(tmp.path(), 5);
    let layout = ensure_run_dirs(&cfg.output_root, &cfg.project_prefix, &cfg.tag)?;
    let dataset = synthetic_images(10, 8);
    let device = Default::default();

    let first = train::<B>(&cfg, &dataset, &layout, &device)?;
    assert!(first.resumed_from.is_none());

    let second = train::<B>(&cfg, &dataset, &layout, &device)?;
    assert_eq!(second.resumed_from, Some(layout.models.join("began-0")));
    // Weights only: kt bookkeeping restarts with the run.
    assert_eq!(second.batches_run, 2);
    assert_eq!(second.kt_updates, 2);
    Ok(())
}

#[test]
fn balance_state_sidecar_resumes_epoch_and_kt() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let mut cfg = tiny_config(tmp.path(), 10);
    cfg.epochs = 2;
    cfg.save_every = 1;
    cfg.persist_balance_state = true;
    let layout = ensure_run_dirs(&cfg.output_root, &cfg.project_prefix, &cfg.tag)?;
    let dataset = synthetic_images(20, 8);
    let device = Default::default();

    let first = train::<B>(&cfg, &dataset, &layout, &device)?;
    assert_eq!(first.batches_run, 4);
    assert_eq!(first.checkpoints_written, 4);
    let stem = checkpoint::latest(&layout.models).expect("latest checkpoint");
    assert_eq!(stem, layout.models.join("began-1"));
    let saved = checkpoint::load_state(&stem)?.expect("state sidecar");
    assert_eq!(saved.epoch, 1);
    assert_eq!(saved.global_step, 3);
    assert_eq!(saved.kt, first.state.kt);

    let resumed = train::<B>(&cfg, &dataset, &layout, &device)?;
    assert_eq!(resumed.batches_run, 2);
    assert_eq!(resumed.state.epoch, 1);
    Ok(())
}

#[test]
fn non_finite_losses_halt_with_divergence_error() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cfg = tiny_config(tmp.path(), 4);
    let layout = ensure_run_dirs(&cfg.output_root, &cfg.project_prefix, &cfg.tag)?;
    let dataset = ImageTensor::new(vec![f32::NAN; 8 * 8 * 8 * 3], [8, 8, 8, 3])?;
    let device = Default::default();

    let err = train::<B>(&cfg, &dataset, &layout, &device).unwrap_err();
    let divergence = err
        .downcast_ref::<DivergenceError>()
        .expect("divergence error");
    assert_eq!(divergence.step, 0);
    assert!(divergence.real_loss.is_nan());
    assert!(checkpoint::latest(&layout.models).is_none());
    Ok(())
}

#[test]
fn dataset_smaller_than_one_batch_is_rejected_before_writes() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cfg = tiny_config(tmp.path(), 10);
    let layout = ensure_run_dirs(&cfg.output_root, &cfg.project_prefix, &cfg.tag)?;
    let dataset = synthetic_images(5, 8);
    let device = Default::default();

    assert!(train::<B>(&cfg, &dataset, &layout, &device).is_err());
    assert_eq!(std::fs::read_dir(&layout.models)?.count(), 0);
    assert_eq!(std::fs::read_dir(&layout.samples)?.count(), 0);
    Ok(())
}

#[test]
fn resolution_mismatch_is_rejected() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cfg = tiny_config(tmp.path(), 2);
    let layout = ensure_run_dirs(&cfg.output_root, &cfg.project_prefix, &cfg.tag)?;
    let dataset = synthetic_images(4, 16);
    let device = Default::default();
    assert!(train::<B>(&cfg, &dataset, &layout, &device).is_err());
    Ok(())
}

#[test]
fn prepare_builds_missing_dataset_then_loads_it() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let mut cfg = tiny_config(tmp.path(), 2);

    let pixels = (0..6 * 28 * 28)
        .map(|i| if (i % 28) > 10 && (i % 28) < 18 { 1.0 } else { 0.0 })
        .collect();
    let digits = DigitSet::new(28, pixels)?;
    cfg.dataset.digits_path = tmp.path().join("train-images-idx3-ubyte");
    std::fs::write(&cfg.dataset.digits_path, encode_idx_images(&digits))?;
    let bg = RgbImage::from_fn(20, 12, |x, y| Rgb([(x * 10) as u8, (y * 20) as u8, 128]));
    cfg.dataset.background_path = tmp.path().join("background.png");
    bg.save(&cfg.dataset.background_path)?;

    let first = prepare_dataset(&cfg)?;
    assert_eq!(first.shape(), [6, 8, 8, 3]);
    assert!(began_dataset::store::exists(&cfg.dataset.data_dir, &cfg.dataset.name));

    // Present now, so the second call only loads.
    std::fs::remove_file(&cfg.dataset.background_path)?;
    let second = prepare_dataset(&cfg)?;
    assert_eq!(second, first);
    Ok(())
}
