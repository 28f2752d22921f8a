use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

/// On-disk layout of one tagged run:
/// `{output_root}/{prefix}_{tag}/{logs_{tag}, results_{tag}, models_{tag}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub root: PathBuf,
    /// Scalar summaries.
    pub logs: PathBuf,
    /// Exported PNG samples.
    pub samples: PathBuf,
    /// Checkpoints and the latest-checkpoint pointer.
    pub models: PathBuf,
}

impl RunLayout {
    /// Derive the paths without touching the filesystem.
    pub fn for_tag(output_root: &Path, prefix: &str, tag: &str) -> Self {
        let root = output_root.join(format!("{prefix}_{tag}"));
        Self {
            logs: root.join(format!("logs_{tag}")),
            samples: root.join(format!("results_{tag}")),
            models: root.join(format!("models_{tag}")),
            root,
        }
    }

    pub fn dirs(&self) -> [&Path; 4] {
        [&self.root, &self.logs, &self.samples, &self.models]
    }

    /// Create whichever of the four directories are missing.
    pub fn ensure(&self) -> anyhow::Result<()> {
        for dir in self.dirs() {
            if !dir.is_dir() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
                debug!("created {}", dir.display());
            }
        }
        Ok(())
    }
}

pub fn ensure_run_dirs(output_root: &Path, prefix: &str, tag: &str) -> anyhow::Result<RunLayout> {
    let layout = RunLayout::for_tag(output_root, prefix, tag);
    layout.ensure()?;
    Ok(layout)
}
