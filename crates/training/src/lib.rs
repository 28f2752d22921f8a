//! BEGAN training: configuration, run directories, the adversarial loop,
//! checkpoints and scalar summaries.

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod run_dirs;
pub mod schedule;
pub mod step;
pub mod summary;
pub mod trainer;
pub mod util;

pub use config::{DatasetSection, TrainConfig};
pub use data::prepare_dataset;
pub use run_dirs::{ensure_run_dirs, RunLayout};
pub use schedule::{BalanceControl, LrSchedule, TrainingState};
pub use step::{discriminator_step, generator_step};
pub use summary::{ScalarSummary, SummaryWriter};
pub use trainer::{train, DivergenceError, TrainOutcome};
pub use util::{run_prep, run_train, validate_backend_choice, PrepArgs, TrainArgs};

/// Backend alias for training/sampling (NdArray by default; WGPU if enabled).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = burn_ndarray::NdArray<f32>;
