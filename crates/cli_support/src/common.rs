use clap::{Args, ValueEnum};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    NdArray,
    Wgpu,
}

/// Run identity and config location shared by train/sample binaries.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Optional TOML config; CLI flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Run/version tag; keys the run directory tree.
    #[arg(long)]
    pub tag: Option<String>,
    /// Directory the run tree is created under.
    #[arg(long)]
    pub output_root: Option<PathBuf>,
    /// Run directory prefix ("<prefix>_<tag>").
    #[arg(long)]
    pub project_prefix: Option<String>,
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    pub backend: BackendKind,
    /// Emit debug-level logs.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

/// Install the global fmt subscriber (INFO, or DEBUG when verbose).
pub fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
