use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d};
use burn::tensor::activation::tanh;
use burn::tensor::backend::Backend;
use burn::tensor::module::interpolate;
use burn::tensor::ops::{InterpolateMode, InterpolateOptions};
use burn::tensor::Tensor;

/// Spatial size of the innermost feature map.
pub const BASE_SIDE: usize = 8;

/// Exponential linear unit with alpha = 1.
pub fn elu<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    let pos = x.clone().clamp_min(0.0);
    let neg = x.clamp_max(0.0).exp().sub_scalar(1.0);
    pos + neg
}

/// Nearest-neighbour 2x upsampling.
pub fn upsample<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    let [_, _, h, w] = x.dims();
    interpolate(
        x,
        [h * 2, w * 2],
        InterpolateOptions::new(InterpolateMode::Nearest),
    )
}

fn conv3x3<B: Backend>(channels_in: usize, channels_out: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([channels_in, channels_out], [3, 3])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

fn conv3x3_stride2<B: Backend>(channels: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([channels, channels], [3, 3])
        .with_stride([2, 2])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

/// Latent vector -> `[batch, 3, side, side]` image in [-1, 1].
///
/// Projects to an 8x8 feature map, then runs `levels` stages of two 3x3
/// convolutions, doubling the resolution between stages.
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    project: Linear<B>,
    blocks: Vec<Conv2d<B>>,
    to_rgb: Conv2d<B>,
    filters: usize,
}

impl<B: Backend> Decoder<B> {
    pub fn new(input_dim: usize, filters: usize, levels: usize, device: &B::Device) -> Self {
        let project =
            LinearConfig::new(input_dim, filters * BASE_SIDE * BASE_SIDE).init(device);
        let blocks = (0..levels * 2)
            .map(|_| conv3x3(filters, filters, device))
            .collect();
        let to_rgb = conv3x3(filters, 3, device);
        Self {
            project,
            blocks,
            to_rgb,
            filters,
        }
    }

    pub fn forward(&self, latent: Tensor<B, 2>) -> Tensor<B, 4> {
        let batch = latent.dims()[0];
        let mut x = self
            .project
            .forward(latent)
            .reshape([batch, self.filters, BASE_SIDE, BASE_SIDE]);
        for (level, pair) in self.blocks.chunks(2).enumerate() {
            if level > 0 {
                x = upsample(x);
            }
            for conv in pair {
                x = elu(conv.forward(x));
            }
        }
        tanh(self.to_rgb.forward(x))
    }
}

/// `[batch, 3, side, side]` image -> `[batch, embed_dim]` code.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    stem: Conv2d<B>,
    blocks: Vec<Conv2d<B>>,
    downs: Vec<Conv2d<B>>,
    embed: Linear<B>,
    filters: usize,
}

impl<B: Backend> Encoder<B> {
    pub fn new(embed_dim: usize, filters: usize, levels: usize, device: &B::Device) -> Self {
        let stem = conv3x3(3, filters, device);
        let blocks = (0..levels).map(|_| conv3x3(filters, filters, device)).collect();
        let downs = (0..levels.saturating_sub(1))
            .map(|_| conv3x3_stride2(filters, device))
            .collect();
        let embed = LinearConfig::new(filters * BASE_SIDE * BASE_SIDE, embed_dim).init(device);
        Self {
            stem,
            blocks,
            downs,
            embed,
            filters,
        }
    }

    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let batch = images.dims()[0];
        let mut x = elu(self.stem.forward(images));
        for (level, conv) in self.blocks.iter().enumerate() {
            x = elu(conv.forward(x));
            if let Some(down) = self.downs.get(level) {
                x = elu(down.forward(x));
            }
        }
        let flat = x.reshape([batch, self.filters * BASE_SIDE * BASE_SIDE]);
        self.embed.forward(flat)
    }
}
