use burn::tensor::{ElementConversion, Tensor};
use burn_ndarray::NdArray;
use models::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

type B = NdArray<f32>;

fn tiny_config() -> BeganConfig {
    BeganConfig {
        image_size: 16,
        noise_dim: 6,
        hidden_dim: 6,
        filters: 4,
        batch_size: 3,
    }
}

fn scalar(t: Tensor<B, 1>) -> f32 {
    t.into_scalar().elem::<f32>()
}

#[test]
fn config_levels_follow_resolution() {
    let mut cfg = BeganConfig::default();
    assert_eq!(cfg.levels(), Ok(4));
    cfg.image_size = 8;
    assert_eq!(cfg.levels(), Ok(1));
    cfg.image_size = 48;
    assert!(cfg.levels().is_err());
    cfg.image_size = 0;
    assert!(cfg.levels().is_err());
}

#[test]
fn losses_combine_with_kt() {
    let device = Default::default();
    let cfg = tiny_config();
    let model = Began::<B>::new(&cfg, &device).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let images = Tensor::<B, 4>::zeros([3, 3, 16, 16], &device);
    let noise = uniform_noise::<B, _>(&mut rng, 3, cfg.noise_dim, &device);

    let losses = model.losses(images, noise, 0.5);
    let real = scalar(losses.d_real);
    let fake = scalar(losses.d_fake);
    let d = scalar(losses.d_loss);
    let g = scalar(losses.g_loss);
    assert!(real.is_finite() && fake.is_finite());
    assert!(real >= 0.0 && fake >= 0.0);
    assert!((d - (real - 0.5 * fake)).abs() < 1e-5);
    assert_eq!(g, fake);
}

#[test]
fn sampler_produces_one_batch_in_tanh_range() {
    let device = Default::default();
    let cfg = tiny_config();
    let model = Began::<B>::new(&cfg, &device).unwrap();
    let sampler = Sampler::bind(model.generator, cfg.batch_size);
    let mut rng = StdRng::seed_from_u64(1);
    let images = sampler.sample(&mut rng, &device);
    assert_eq!(images.dims(), [3, 3, 16, 16]);
    let values = images.into_data().to_vec::<f32>().unwrap();
    assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
}

#[test]
fn noise_is_uniform_in_unit_box() {
    let device = Default::default();
    let mut rng = StdRng::seed_from_u64(2);
    let noise = uniform_noise::<B, _>(&mut rng, 8, 16, &device);
    assert_eq!(noise.dims(), [8, 16]);
    let values = noise.into_data().to_vec::<f32>().unwrap();
    assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
    assert!(values.iter().any(|v| *v < 0.0) && values.iter().any(|v| *v > 0.0));
}
