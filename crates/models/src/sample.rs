use crate::Generator;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use rand::Rng;

/// `[batch, dim]` noise drawn uniformly from [-1, 1].
pub fn uniform_noise<B: Backend, R: Rng + ?Sized>(
    rng: &mut R,
    batch: usize,
    dim: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let values: Vec<f32> = (0..batch * dim)
        .map(|_| rng.random_range(-1.0f32..=1.0))
        .collect();
    Tensor::from_data(TensorData::new(values, [batch, dim]), device)
}

/// Sampling bound to one generator parameter set.
///
/// Building a generator (fresh, or restored from a checkpoint) and binding it
/// for sampling are separate steps, so the caller always decides which
/// parameters produce the samples.
pub struct Sampler<B: Backend> {
    generator: Generator<B>,
    batch_size: usize,
}

impl<B: Backend> Sampler<B> {
    pub fn bind(generator: Generator<B>, batch_size: usize) -> Self {
        Self {
            generator,
            batch_size,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// One `[batch_size, 3, side, side]` batch from fresh noise.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, device: &B::Device) -> Tensor<B, 4> {
        let noise = uniform_noise::<B, R>(rng, self.batch_size, self.generator.noise_dim(), device);
        self.generator.forward(noise)
    }

    pub fn into_generator(self) -> Generator<B> {
        self.generator
    }
}
