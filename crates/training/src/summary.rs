use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const SUMMARY_FILE: &str = "summaries.jsonl";

/// Scalars exported at each periodic save, keyed by global step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarSummary {
    pub step: usize,
    pub epoch: usize,
    pub convergence: f32,
    pub kt: f32,
    pub learning_rate: f64,
    pub elapsed_secs: f64,
}

/// Append-only JSON-lines sink under the run's logs directory.
#[derive(Debug, Clone)]
pub struct SummaryWriter {
    path: PathBuf,
}

impl SummaryWriter {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            path: logs_dir.join(SUMMARY_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, summary: &ScalarSummary) -> anyhow::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let line = serde_json::to_string(summary)?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        Ok(())
    }
}

/// Read every summary line back; blank lines are skipped.
pub fn read_summaries(path: &Path) -> anyhow::Result<Vec<ScalarSummary>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    raw.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).with_context(|| format!("bad summary line: {l}")))
        .collect()
}
