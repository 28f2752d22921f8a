use std::path::PathBuf;

use clap::Parser;
use cli_support::RunArgs;
use training::util::{base_config, validate_backend_choice};
use training::RunLayout;

use crate::runner::{run_inference, InferenceOptions, ParamSource};
use crate::InferenceBackend;

#[derive(Parser, Debug)]
#[command(name = "sample", about = "Write one batch of generated images for a run")]
pub struct SampleArgs {
    #[command(flatten)]
    pub run: RunArgs,
    /// Sample from this checkpoint instead of the run's latest.
    #[arg(long, conflicts_with = "untrained")]
    pub checkpoint: Option<PathBuf>,
    /// Sample from fresh, untrained parameters.
    #[arg(long, default_value_t = false)]
    pub untrained: bool,
    /// Fall back to untrained parameters when the run has no checkpoint.
    #[arg(long, default_value_t = false)]
    pub allow_untrained: bool,
    /// Images to generate.
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Image size the checkpoint was trained at.
    #[arg(long)]
    pub image_size: Option<usize>,
    #[arg(long)]
    pub seed: Option<u64>,
}

impl SampleArgs {
    pub fn params(&self) -> ParamSource {
        match (&self.checkpoint, self.untrained) {
            (Some(path), _) => ParamSource::Checkpoint(path.clone()),
            (None, true) => ParamSource::Untrained,
            (None, false) => ParamSource::LatestCheckpoint,
        }
    }
}

pub fn run_sample(args: SampleArgs) -> anyhow::Result<Vec<PathBuf>> {
    validate_backend_choice(args.run.backend)?;
    let mut cfg = base_config(&args.run)?;
    if let Some(v) = args.batch_size {
        cfg.model.batch_size = v;
    }
    if let Some(v) = args.image_size {
        cfg.model.image_size = v;
    }
    let layout = RunLayout::for_tag(&cfg.output_root, &cfg.project_prefix, &cfg.tag);
    let options = InferenceOptions {
        params: args.params(),
        allow_untrained: args.allow_untrained,
        seed: args.seed.or(cfg.seed),
    };
    let device = <InferenceBackend as burn::tensor::backend::Backend>::Device::default();
    let written = run_inference::<InferenceBackend>(&cfg.model, &layout, &options, &device)?;
    Ok(written)
}
