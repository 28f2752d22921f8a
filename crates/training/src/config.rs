use std::path::{Path, PathBuf};

use anyhow::Context;
use began_dataset::{BuildOptions, ColorizeOptions, Inversion};
use models::BeganConfig;
use serde::{Deserialize, Serialize};

use crate::schedule::{BalanceControl, LrSchedule};

/// Where the colourized-digit dataset lives and how it is built when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSection {
    /// Container file stem and array key.
    pub name: String,
    pub data_dir: PathBuf,
    /// MNIST `train-images-idx3-ubyte`.
    pub digits_path: PathBuf,
    pub background_path: PathBuf,
    pub recolor: bool,
    pub inversion: Inversion,
    pub limit: Option<usize>,
}

impl Default for DatasetSection {
    fn default() -> Self {
        Self {
            name: "mnist_data".to_string(),
            data_dir: PathBuf::from("data"),
            digits_path: PathBuf::from("data/mnist/train-images-idx3-ubyte"),
            background_path: PathBuf::from("data/background.jpg"),
            recolor: true,
            inversion: Inversion::default(),
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Run/version tag; keys every run directory.
    pub tag: String,
    pub output_root: PathBuf,
    pub project_prefix: String,
    pub epochs: usize,
    pub base_lr: f64,
    /// Multiplier applied once per `epoch_drop` epochs.
    pub lr_drop: f64,
    pub epoch_drop: usize,
    pub lambda_kt: f32,
    pub gamma: f32,
    pub adam_beta1: f32,
    pub adam_beta2: f32,
    /// Checkpoint/sample/summary cadence in global steps.
    pub save_every: usize,
    pub seed: Option<u64>,
    pub halt_on_divergence: bool,
    /// Write and resume from a `{kt, global_step, epoch}` sidecar.
    pub persist_balance_state: bool,
    pub dataset: DatasetSection,
    pub model: BeganConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            tag: "1.0".to_string(),
            output_root: PathBuf::from("."),
            project_prefix: "began".to_string(),
            epochs: 100,
            base_lr: 8e-5,
            lr_drop: 0.2,
            epoch_drop: 3,
            lambda_kt: 1e-3,
            gamma: 0.5,
            adam_beta1: 0.5,
            adam_beta2: 0.999,
            save_every: 500,
            seed: None,
            halt_on_divergence: true,
            persist_balance_state: false,
            dataset: DatasetSection::default(),
            model: BeganConfig::default(),
        }
    }
}

impl TrainConfig {
    /// Parse a TOML file; omitted keys keep their defaults and path values
    /// get `~` / `${VAR}` expansion.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut cfg: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        cfg.expand_paths();
        Ok(cfg)
    }

    fn expand_paths(&mut self) {
        self.output_root = expand_path(&self.output_root);
        self.dataset.data_dir = expand_path(&self.dataset.data_dir);
        self.dataset.digits_path = expand_path(&self.dataset.digits_path);
        self.dataset.background_path = expand_path(&self.dataset.background_path);
    }

    /// Reject values the loop cannot run with, before anything is written.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.model.levels().map_err(anyhow::Error::msg)?;
        if self.tag.trim().is_empty() {
            anyhow::bail!("tag must not be empty");
        }
        if self.epoch_drop == 0 {
            anyhow::bail!("epoch_drop must be positive");
        }
        if self.save_every == 0 {
            anyhow::bail!("save_every must be positive");
        }
        if !(self.base_lr.is_finite() && self.base_lr > 0.0) {
            anyhow::bail!("base_lr must be a positive number, got {}", self.base_lr);
        }
        if !self.gamma.is_finite() || !self.lambda_kt.is_finite() {
            anyhow::bail!("gamma and lambda_kt must be finite");
        }
        Ok(())
    }

    pub fn schedule(&self) -> LrSchedule {
        LrSchedule {
            base_lr: self.base_lr,
            drop: self.lr_drop,
            epoch_drop: self.epoch_drop,
        }
    }

    pub fn balance(&self) -> BalanceControl {
        BalanceControl {
            lambda_kt: self.lambda_kt,
            gamma: self.gamma,
        }
    }

    /// Builder options for the dataset section; resolution follows the model.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            out_dir: self.dataset.data_dir.clone(),
            digits_path: self.dataset.digits_path.clone(),
            background_path: self.dataset.background_path.clone(),
            limit: self.dataset.limit,
            seed: self.seed,
            colorize: ColorizeOptions {
                resolution: self.model.image_size as u32,
                recolor: self.dataset.recolor,
                inversion: self.dataset.inversion,
            },
        }
    }
}

fn expand_path(raw: &Path) -> PathBuf {
    let mut out = raw.to_string_lossy().into_owned();
    if let Some(stripped) = out.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

fn expand_env(input: &str) -> String {
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match std::env::var(key) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => out.push_str(&format!("${{{key}}}")),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
