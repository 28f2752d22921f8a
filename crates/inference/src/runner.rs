use std::path::{Path, PathBuf};

use began_dataset::{from_device, write_pngs, DatasetError};
use burn::tensor::backend::Backend;
use models::{Began, BeganConfig, Sampler};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{info, warn};
use training::checkpoint;
use training::RunLayout;

pub const TEST_SAMPLE_PREFIX: &str = "test_image";

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("no checkpoint found in {dir}; train first or allow untrained sampling")]
    NoCheckpoint { dir: PathBuf },
    #[error("checkpoint {path} is missing")]
    MissingCheckpoint { path: PathBuf },
    #[error("failed to load checkpoint {path}: {message}")]
    Load { path: PathBuf, message: String },
    #[error("invalid model config: {0}")]
    Config(String),
    #[error("run directories: {0}")]
    RunDirs(String),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

pub type InferenceResult<T> = Result<T, InferenceError>;

/// Which parameters the sampled generator runs with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ParamSource {
    /// Whatever the run's `checkpoint` pointer names.
    #[default]
    LatestCheckpoint,
    /// A specific checkpoint stem (`.../began-3`) or record (`.../began-3.bin`).
    Checkpoint(PathBuf),
    /// Fresh random parameters, requested explicitly.
    Untrained,
}

#[derive(Debug, Clone, Default)]
pub struct InferenceOptions {
    pub params: ParamSource,
    /// Fall back to fresh parameters when `LatestCheckpoint` finds nothing.
    pub allow_untrained: bool,
    pub seed: Option<u64>,
}

/// Sample one batch and write `test_image{i}.png` into the run's samples dir.
pub fn run_inference<B: Backend>(
    model_cfg: &BeganConfig,
    layout: &RunLayout,
    options: &InferenceOptions,
    device: &B::Device,
) -> InferenceResult<Vec<PathBuf>> {
    layout
        .ensure()
        .map_err(|e| InferenceError::RunDirs(format!("{e:#}")))?;
    let fresh = Began::<B>::new(model_cfg, device).map_err(InferenceError::Config)?;
    let model = bind_params(fresh, layout, options, device)?;

    let sampler = Sampler::bind(model.generator, model_cfg.batch_size);
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let images = from_device(sampler.sample(&mut rng, device))?;
    let written = write_pngs(&layout.samples, TEST_SAMPLE_PREFIX, &images)?;
    info!(
        "wrote {} samples to {}",
        written.len(),
        layout.samples.display()
    );
    Ok(written)
}

fn bind_params<B: Backend>(
    fresh: Began<B>,
    layout: &RunLayout,
    options: &InferenceOptions,
    device: &B::Device,
) -> InferenceResult<Began<B>> {
    let stem = match &options.params {
        ParamSource::Untrained => {
            info!("sampling with untrained parameters");
            return Ok(fresh);
        }
        ParamSource::Checkpoint(path) => {
            let stem = strip_record_extension(path);
            if !checkpoint::record_path(&stem).is_file() {
                return Err(InferenceError::MissingCheckpoint { path: path.clone() });
            }
            stem
        }
        ParamSource::LatestCheckpoint => match checkpoint::latest(&layout.models) {
            Some(stem) => stem,
            None if options.allow_untrained => {
                warn!(
                    "no checkpoint in {}; sampling with untrained parameters",
                    layout.models.display()
                );
                return Ok(fresh);
            }
            None => {
                return Err(InferenceError::NoCheckpoint {
                    dir: layout.models.clone(),
                })
            }
        },
    };
    let model =
        checkpoint::restore(fresh, &stem, device).map_err(|e| InferenceError::Load {
            path: stem.clone(),
            message: format!("{e:#}"),
        })?;
    info!("restored parameters from {}", stem.display());
    Ok(model)
}

fn strip_record_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "bin") {
        path.with_extension("")
    } else {
        path.to_path_buf()
    }
}
