//! Generate images from trained (or explicitly untrained) BEGAN parameters.

pub mod runner;
pub mod util;

#[cfg(feature = "backend-wgpu")]
pub type InferenceBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type InferenceBackend = burn_ndarray::NdArray<f32>;

pub use runner::{run_inference, InferenceError, InferenceOptions, InferenceResult, ParamSource};
pub use util::{run_sample, SampleArgs};

pub mod prelude {
    pub use crate::runner::{
        run_inference, InferenceError, InferenceOptions, ParamSource, TEST_SAMPLE_PREFIX,
    };
    pub use crate::InferenceBackend;
}
