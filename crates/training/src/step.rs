//! One adversarial update, split into its two optimizer steps.
//!
//! Each step differentiates the full BEGAN forward pass but applies gradients
//! only to its own sub-module, so the other half is left untouched.

use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};
use models::{Began, Discriminator, Generator};

/// Minimize `d_real - kt * d_fake` over the discriminator.
///
/// Returns the real-image loss measured before the update.
pub fn discriminator_step<B, O>(
    mut model: Began<B>,
    optim: &mut O,
    images: Tensor<B, 4>,
    noise: Tensor<B, 2>,
    lr: f64,
    kt: f32,
) -> (Began<B>, f32)
where
    B: AutodiffBackend,
    O: Optimizer<Discriminator<B>, B>,
{
    let losses = model.losses(images, noise, kt);
    let real_loss = scalar(losses.d_real);
    let grads = losses.d_loss.backward();
    let grads = GradientsParams::from_grads(grads, &model.discriminator);
    model.discriminator = optim.step(lr, model.discriminator, grads);
    (model, real_loss)
}

/// Minimize `d_fake` over the generator.
///
/// Returns the fake-image loss, evaluated against the discriminator as it
/// stands when called (i.e. after `discriminator_step`).
pub fn generator_step<B, O>(
    mut model: Began<B>,
    optim: &mut O,
    images: Tensor<B, 4>,
    noise: Tensor<B, 2>,
    lr: f64,
    kt: f32,
) -> (Began<B>, f32)
where
    B: AutodiffBackend,
    O: Optimizer<Generator<B>, B>,
{
    let losses = model.losses(images, noise, kt);
    let fake_loss = scalar(losses.d_fake);
    let grads = losses.g_loss.backward();
    let grads = GradientsParams::from_grads(grads, &model.generator);
    model.generator = optim.step(lr, model.generator, grads);
    (model, fake_loss)
}

fn scalar<B: AutodiffBackend>(loss: Tensor<B, 1>) -> f32 {
    loss.detach().into_scalar().elem::<f32>()
}
