//! Burn BEGAN modules for the colourized-digit trainer.
//!
//! - `Generator`: noise -> image decoder.
//! - `Discriminator`: image auto-encoder; its reconstruction error is the
//!   adversarial signal.
//! - `Began`: both halves in one record, so a checkpoint captures every
//!   trainable parameter.
//!
//! Optimizer steps live in the `training` crate; these are plain modules.

pub mod blocks;
pub mod sample;

use blocks::{Decoder, Encoder, BASE_SIDE};
use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

pub use sample::{uniform_noise, Sampler};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeganConfig {
    /// Square output resolution; must be 8 * 2^k.
    pub image_size: usize,
    pub noise_dim: usize,
    /// Width of the discriminator's bottleneck code.
    pub hidden_dim: usize,
    /// Convolution channels at every level.
    pub filters: usize,
    pub batch_size: usize,
}

impl Default for BeganConfig {
    fn default() -> Self {
        Self {
            image_size: 64,
            noise_dim: 64,
            hidden_dim: 64,
            filters: 64,
            batch_size: 16,
        }
    }
}

impl BeganConfig {
    /// Number of resolution stages from 8x8 up to `image_size`.
    pub fn levels(&self) -> Result<usize, String> {
        let ratio = self.image_size / BASE_SIDE;
        if self.image_size % BASE_SIDE != 0 || ratio == 0 || !ratio.is_power_of_two() {
            return Err(format!(
                "image_size {} must be {BASE_SIDE} times a power of two",
                self.image_size
            ));
        }
        if self.noise_dim == 0 || self.hidden_dim == 0 || self.filters == 0 {
            return Err("noise_dim, hidden_dim and filters must be positive".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be positive".to_string());
        }
        Ok(ratio.trailing_zeros() as usize + 1)
    }
}

#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    decoder: Decoder<B>,
    noise_dim: usize,
}

impl<B: Backend> Generator<B> {
    pub fn new(cfg: &BeganConfig, levels: usize, device: &B::Device) -> Self {
        Self {
            decoder: Decoder::new(cfg.noise_dim, cfg.filters, levels, device),
            noise_dim: cfg.noise_dim,
        }
    }

    pub fn noise_dim(&self) -> usize {
        self.noise_dim
    }

    pub fn forward(&self, noise: Tensor<B, 2>) -> Tensor<B, 4> {
        self.decoder.forward(noise)
    }
}

#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    encoder: Encoder<B>,
    decoder: Decoder<B>,
}

impl<B: Backend> Discriminator<B> {
    pub fn new(cfg: &BeganConfig, levels: usize, device: &B::Device) -> Self {
        Self {
            encoder: Encoder::new(cfg.hidden_dim, cfg.filters, levels, device),
            decoder: Decoder::new(cfg.hidden_dim, cfg.filters, levels, device),
        }
    }

    /// Reconstruction of `images`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        self.decoder.forward(self.encoder.forward(images))
    }
}

/// The four scalar losses of one forward pass, each of shape `[1]`.
#[derive(Debug, Clone)]
pub struct BeganLosses<B: Backend> {
    /// `d_real - kt * d_fake`
    pub d_loss: Tensor<B, 1>,
    /// `d_fake`, minimized by the generator.
    pub g_loss: Tensor<B, 1>,
    /// Mean absolute reconstruction error on real images.
    pub d_real: Tensor<B, 1>,
    /// Mean absolute reconstruction error on generated images.
    pub d_fake: Tensor<B, 1>,
}

#[derive(Module, Debug)]
pub struct Began<B: Backend> {
    pub generator: Generator<B>,
    pub discriminator: Discriminator<B>,
}

impl<B: Backend> Began<B> {
    /// Fresh, randomly initialised parameters.
    pub fn new(cfg: &BeganConfig, device: &B::Device) -> Result<Self, String> {
        let levels = cfg.levels()?;
        Ok(Self {
            generator: Generator::new(cfg, levels, device),
            discriminator: Discriminator::new(cfg, levels, device),
        })
    }

    pub fn losses(&self, images: Tensor<B, 4>, noise: Tensor<B, 2>, kt: f32) -> BeganLosses<B> {
        let fake = self.generator.forward(noise);
        let real_recon = self.discriminator.forward(images.clone());
        let fake_recon = self.discriminator.forward(fake.clone());

        let d_real = reconstruction_loss(images, real_recon);
        let d_fake = reconstruction_loss(fake, fake_recon);
        let d_loss = d_real.clone() - d_fake.clone().mul_scalar(kt);
        BeganLosses {
            d_loss,
            g_loss: d_fake.clone(),
            d_real,
            d_fake,
        }
    }
}

/// Mean L1 distance between an image batch and its reconstruction.
pub fn reconstruction_loss<B: Backend>(
    images: Tensor<B, 4>,
    reconstruction: Tensor<B, 4>,
) -> Tensor<B, 1> {
    (images - reconstruction).abs().mean()
}

pub mod prelude {
    pub use super::{
        reconstruction_loss, uniform_noise, Began, BeganConfig, BeganLosses, Discriminator,
        Generator, Sampler,
    };
}
