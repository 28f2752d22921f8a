//! Whole-model checkpoints (`began-{epoch}.bin`) with a `checkpoint` pointer
//! naming the most recent one, plus the optional balance-state sidecar.

use std::path::{Path, PathBuf};

use anyhow::Context;
use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use models::Began;

use crate::schedule::TrainingState;

pub const CHECKPOINT_PREFIX: &str = "began";
pub const LATEST_POINTER: &str = "checkpoint";
const RECORD_EXTENSION: &str = "bin";

/// Checkpoint path without the record extension the recorder appends.
pub fn checkpoint_stem(models_dir: &Path, epoch: usize) -> PathBuf {
    models_dir.join(format!("{CHECKPOINT_PREFIX}-{epoch}"))
}

pub fn record_path(stem: &Path) -> PathBuf {
    stem.with_extension(RECORD_EXTENSION)
}

pub fn state_path(stem: &Path) -> PathBuf {
    stem.with_extension("state.json")
}

/// Save every parameter of `model` under the epoch's stem and point
/// `checkpoint` at it. Saves within one epoch overwrite each other.
pub fn save<B: Backend>(
    model: &Began<B>,
    models_dir: &Path,
    epoch: usize,
    state: Option<&TrainingState>,
) -> anyhow::Result<PathBuf> {
    let stem = checkpoint_stem(models_dir, epoch);
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(stem.clone(), &recorder)
        .map_err(|e| anyhow::anyhow!("failed to save checkpoint {}: {e}", stem.display()))?;

    if let Some(state) = state {
        let path = state_path(&stem);
        std::fs::write(&path, serde_json::to_string_pretty(state)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let pointer = models_dir.join(LATEST_POINTER);
    let name = stem
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    std::fs::write(&pointer, format!("{name}\n"))
        .with_context(|| format!("failed to write {}", pointer.display()))?;
    Ok(stem)
}

/// Stem of the checkpoint named by the pointer file, if its record exists.
pub fn latest(models_dir: &Path) -> Option<PathBuf> {
    let raw = std::fs::read_to_string(models_dir.join(LATEST_POINTER)).ok()?;
    let name = raw.trim();
    if name.is_empty() {
        return None;
    }
    let stem = models_dir.join(name);
    record_path(&stem).is_file().then_some(stem)
}

/// Load the parameters stored under `stem` into `model`.
pub fn restore<B: Backend>(
    model: Began<B>,
    stem: &Path,
    device: &B::Device,
) -> anyhow::Result<Began<B>> {
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .load_file(stem.to_path_buf(), &recorder, device)
        .map_err(|e| anyhow::anyhow!("failed to load checkpoint {}: {e}", stem.display()))
}

/// Balance-state sidecar for `stem`; `None` when it was never written.
pub fn load_state(stem: &Path) -> anyhow::Result<Option<TrainingState>> {
    let path = state_path(stem);
    if !path.is_file() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let state = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Tensor;
    use burn_ndarray::NdArray;
    use models::BeganConfig;

    type B = NdArray<f32>;

    fn tiny() -> BeganConfig {
        BeganConfig {
            image_size: 8,
            noise_dim: 3,
            hidden_dim: 3,
            filters: 2,
            batch_size: 2,
        }
    }

    #[test]
    fn stems_and_sidecars_are_named_by_epoch() {
        let dir = Path::new("/runs/models_1.0");
        let stem = checkpoint_stem(dir, 7);
        assert_eq!(stem, PathBuf::from("/runs/models_1.0/began-7"));
        assert_eq!(record_path(&stem), PathBuf::from("/runs/models_1.0/began-7.bin"));
        assert_eq!(
            state_path(&stem),
            PathBuf::from("/runs/models_1.0/began-7.state.json")
        );
    }

    #[test]
    fn latest_is_none_without_pointer_or_record() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(latest(tmp.path()).is_none());
        std::fs::write(tmp.path().join(LATEST_POINTER), "began-3\n").unwrap();
        assert!(latest(tmp.path()).is_none());
    }

    #[test]
    fn save_then_restore_reproduces_generator_output() {
        let tmp = tempfile::tempdir().unwrap();
        let device = Default::default();
        let cfg = tiny();
        let model = Began::<B>::new(&cfg, &device).unwrap();
        let state = TrainingState {
            kt: 0.25,
            global_step: 40,
            epoch: 2,
        };
        let stem = save(&model, tmp.path(), 2, Some(&state)).unwrap();
        assert!(record_path(&stem).is_file());
        assert_eq!(latest(tmp.path()), Some(stem.clone()));
        assert_eq!(load_state(&stem).unwrap(), Some(state));

        let noise = Tensor::<B, 2>::ones([1, cfg.noise_dim], &device);
        let expected = model.generator.forward(noise.clone()).into_data();
        let fresh = Began::<B>::new(&cfg, &device).unwrap();
        let restored = restore(fresh, &stem, &device).unwrap();
        let got = restored.generator.forward(noise).into_data();
        assert_eq!(got.to_vec::<f32>().unwrap(), expected.to_vec::<f32>().unwrap());
    }

    #[test]
    fn weights_only_save_writes_no_sidecar() {
        let tmp = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model = Began::<B>::new(&tiny(), &device).unwrap();
        let stem = save(&model, tmp.path(), 0, None).unwrap();
        assert_eq!(load_state(&stem).unwrap(), None);
    }
}
