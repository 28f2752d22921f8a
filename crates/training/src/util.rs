use std::path::PathBuf;

use began_dataset::{BuildReport, Inversion};
use burn::backend::Autodiff;
use clap::Parser;
use cli_support::{BackendKind, RunArgs};
use tracing::{info, warn};

use crate::config::TrainConfig;
use crate::data::prepare_dataset;
use crate::run_dirs::ensure_run_dirs;
use crate::trainer::{train, TrainOutcome};
use crate::TrainBackend;

#[derive(Parser, Debug)]
#[command(name = "train", about = "Train a BEGAN on the colourized-digit dataset")]
pub struct TrainArgs {
    #[command(flatten)]
    pub run: RunArgs,
    /// Number of epochs.
    #[arg(long)]
    pub epochs: Option<usize>,
    /// Images per batch.
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Square image size (8 * 2^k); also the dataset build resolution.
    #[arg(long)]
    pub image_size: Option<usize>,
    /// Learning rate before any decay.
    #[arg(long)]
    pub base_lr: Option<f64>,
    /// Epochs per learning-rate drop.
    #[arg(long)]
    pub epoch_drop: Option<usize>,
    /// Proportional gain of the kt controller.
    #[arg(long)]
    pub lambda_kt: Option<f32>,
    /// Target ratio of fake to real reconstruction loss.
    #[arg(long)]
    pub gamma: Option<f32>,
    /// Global steps between checkpoints, samples and summaries.
    #[arg(long)]
    pub save_every: Option<usize>,
    /// Seed for dataset building, batch order and noise.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Directory holding the dataset container.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Save kt/epoch beside checkpoints and resume from them.
    #[arg(long, default_value_t = false)]
    pub persist_balance_state: bool,
    /// Keep training through non-finite losses.
    #[arg(long, default_value_t = false)]
    pub allow_divergence: bool,
}

impl TrainArgs {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn resolve(&self) -> anyhow::Result<TrainConfig> {
        let mut cfg = base_config(&self.run)?;
        if let Some(v) = self.epochs {
            cfg.epochs = v;
        }
        if let Some(v) = self.batch_size {
            cfg.model.batch_size = v;
        }
        if let Some(v) = self.image_size {
            cfg.model.image_size = v;
        }
        if let Some(v) = self.base_lr {
            cfg.base_lr = v;
        }
        if let Some(v) = self.epoch_drop {
            cfg.epoch_drop = v;
        }
        if let Some(v) = self.lambda_kt {
            cfg.lambda_kt = v;
        }
        if let Some(v) = self.gamma {
            cfg.gamma = v;
        }
        if let Some(v) = self.save_every {
            cfg.save_every = v;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        if let Some(dir) = &self.data_dir {
            cfg.dataset.data_dir = dir.clone();
        }
        if self.persist_balance_state {
            cfg.persist_balance_state = true;
        }
        if self.allow_divergence {
            cfg.halt_on_divergence = false;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Load `--config` when given, then apply the run identity flags.
pub fn base_config(run: &RunArgs) -> anyhow::Result<TrainConfig> {
    let mut cfg = match &run.config {
        Some(path) => TrainConfig::from_path(path)?,
        None => TrainConfig::default(),
    };
    if let Some(tag) = &run.tag {
        cfg.tag = tag.clone();
    }
    if let Some(root) = &run.output_root {
        cfg.output_root = root.clone();
    }
    if let Some(prefix) = &run.project_prefix {
        cfg.project_prefix = prefix.clone();
    }
    Ok(cfg)
}

pub fn run_train(args: TrainArgs) -> anyhow::Result<TrainOutcome> {
    validate_backend_choice(args.run.backend)?;
    let cfg = args.resolve()?;

    let layout = ensure_run_dirs(&cfg.output_root, &cfg.project_prefix, &cfg.tag)?;
    let dataset = prepare_dataset(&cfg)?;
    let device = <ADBackend as burn::tensor::backend::Backend>::Device::default();
    let outcome = train::<ADBackend>(&cfg, &dataset, &layout, &device)?;

    info!(
        "run {} complete: {} batches, final kt {:.4}",
        layout.root.display(),
        outcome.batches_run,
        outcome.state.kt
    );
    Ok(outcome)
}

type ADBackend = Autodiff<TrainBackend>;

pub fn validate_backend_choice(kind: BackendKind) -> anyhow::Result<()> {
    let built_wgpu = cfg!(feature = "backend-wgpu");
    match (kind, built_wgpu) {
        (BackendKind::Wgpu, false) => {
            anyhow::bail!("backend-wgpu feature not enabled; rebuild with --features backend-wgpu or choose ndarray backend")
        }
        (BackendKind::NdArray, true) => {
            warn!("built with backend-wgpu; the WGPU backend is used despite --backend ndarray");
        }
        _ => {}
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(
    name = "prep_data",
    about = "Build the colourized-digit dataset container"
)]
pub struct PrepArgs {
    #[command(flatten)]
    pub run: RunArgs,
    /// Dataset name (file stem and array key).
    #[arg(long)]
    pub name: Option<String>,
    /// Output directory for the container.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// MNIST train-images-idx3-ubyte file.
    #[arg(long)]
    pub digits: Option<PathBuf>,
    /// Background photograph.
    #[arg(long)]
    pub background: Option<PathBuf>,
    /// Output resolution.
    #[arg(long)]
    pub image_size: Option<usize>,
    /// Use only the first N digits.
    #[arg(long)]
    pub limit: Option<usize>,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Skip the per-channel tint.
    #[arg(long, default_value_t = false)]
    pub no_recolor: bool,
    /// Invert foreground as `1 - v` instead of `-v`.
    #[arg(long, default_value_t = false)]
    pub literal_inversion: bool,
}

impl PrepArgs {
    pub fn resolve(&self) -> anyhow::Result<TrainConfig> {
        let mut cfg = base_config(&self.run)?;
        if let Some(name) = &self.name {
            cfg.dataset.name = name.clone();
        }
        if let Some(dir) = &self.data_dir {
            cfg.dataset.data_dir = dir.clone();
        }
        if let Some(path) = &self.digits {
            cfg.dataset.digits_path = path.clone();
        }
        if let Some(path) = &self.background {
            cfg.dataset.background_path = path.clone();
        }
        if let Some(v) = self.image_size {
            cfg.model.image_size = v;
        }
        if self.limit.is_some() {
            cfg.dataset.limit = self.limit;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        if self.no_recolor {
            cfg.dataset.recolor = false;
        }
        if self.literal_inversion {
            cfg.dataset.inversion = Inversion::Literal;
        }
        cfg.model.levels().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

pub fn run_prep(args: PrepArgs) -> anyhow::Result<BuildReport> {
    let cfg = args.resolve()?;
    let report = began_dataset::build(&cfg.dataset.name, &cfg.build_options())?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_defaults() {
        let args = TrainArgs::parse_from([
            "train",
            "--tag",
            "3.1",
            "--epochs",
            "2",
            "--batch-size",
            "4",
            "--image-size",
            "16",
            "--gamma",
            "0.7",
            "--seed",
            "11",
            "--allow-divergence",
        ]);
        let cfg = args.resolve().unwrap();
        assert_eq!(cfg.tag, "3.1");
        assert_eq!(cfg.epochs, 2);
        assert_eq!(cfg.model.batch_size, 4);
        assert_eq!(cfg.model.image_size, 16);
        assert_eq!(cfg.gamma, 0.7);
        assert_eq!(cfg.seed, Some(11));
        assert!(!cfg.halt_on_divergence);
        assert_eq!(cfg.base_lr, 8e-5);
    }

    #[test]
    fn config_file_is_read_before_flags() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("began.toml");
        std::fs::write(&path, "tag = \"from-file\"\nepochs = 9\nsave_every = 50\n").unwrap();
        let args = TrainArgs::parse_from([
            "train",
            "--config",
            path.to_str().unwrap(),
            "--epochs",
            "3",
        ]);
        let cfg = args.resolve().unwrap();
        assert_eq!(cfg.tag, "from-file");
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.save_every, 50);
    }

    #[test]
    fn invalid_overrides_fail_before_running() {
        let args = TrainArgs::parse_from(["train", "--image-size", "40"]);
        assert!(args.resolve().is_err());
        let args = TrainArgs::parse_from(["train", "--epoch-drop", "0"]);
        assert!(args.resolve().is_err());
    }

    #[test]
    fn wgpu_requires_the_feature() {
        let result = validate_backend_choice(BackendKind::Wgpu);
        assert_eq!(result.is_ok(), cfg!(feature = "backend-wgpu"));
        assert!(validate_backend_choice(BackendKind::NdArray).is_ok());
    }

    #[test]
    fn prep_flags_select_literal_inversion() {
        let args = PrepArgs::parse_from([
            "prep_data",
            "--name",
            "digits",
            "--image-size",
            "32",
            "--literal-inversion",
            "--no-recolor",
        ]);
        let cfg = args.resolve().unwrap();
        let opts = cfg.build_options();
        assert_eq!(cfg.dataset.name, "digits");
        assert_eq!(opts.colorize.resolution, 32);
        assert_eq!(opts.colorize.inversion, Inversion::Literal);
        assert!(!opts.colorize.recolor);
    }
}
