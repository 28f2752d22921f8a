//! Dataset preparation, storage, and burn-compatible batching for BEGAN training.
//!
//! This crate provides utilities for:
//! - Reading MNIST IDX digit files
//! - Synthesizing the colourized-digit dataset over background crops
//! - Persisting/loading the dataset as a single named safetensors array
//! - Per-epoch ordering and batch upload to burn tensors
//! - PNG export of image batches

pub mod batch;
pub mod builder;
pub mod export;
pub mod mnist;
pub mod stats;
pub mod store;
pub mod types;

pub use batch::EpochOrder;
pub use builder::{build, colorize, BuildOptions, BuildReport, ColorizeOptions};
pub use export::write_pngs;
pub use mnist::load_idx_images;
pub use stats::{summarize, validate_range};
pub use store::{dataset_path, load, save};
pub use types::*;

#[cfg(feature = "burn-runtime")]
pub use batch::{from_device, next_batch, to_device};
