use std::path::{Path, PathBuf};
use std::time::Instant;

use began_dataset::{from_device, next_batch, write_pngs, EpochOrder, ImageTensor};
use burn::module::AutodiffModule;
use burn::optim::AdamConfig;
use burn::tensor::backend::AutodiffBackend;
use models::{uniform_noise, Began, Discriminator, Generator, Sampler};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info};

use crate::checkpoint;
use crate::config::TrainConfig;
use crate::data::check_compatible;
use crate::run_dirs::RunLayout;
use crate::schedule::TrainingState;
use crate::step::{discriminator_step, generator_step};
use crate::summary::{ScalarSummary, SummaryWriter};

pub const TRAIN_SAMPLE_PREFIX: &str = "train_image";
pub const DATA_SAMPLE_PREFIX: &str = "data_image";

/// A loss went non-finite while the divergence guard was on.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("training diverged at step {step}: real loss {real_loss}, fake loss {fake_loss}")]
pub struct DivergenceError {
    pub step: usize,
    pub real_loss: f32,
    pub fake_loss: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainOutcome {
    pub state: TrainingState,
    pub batches_run: usize,
    pub kt_updates: usize,
    pub checkpoints_written: usize,
    pub sample_exports: usize,
    /// Checkpoint the run's parameters were restored from.
    pub resumed_from: Option<PathBuf>,
}

/// Run the BEGAN loop over `dataset` for `cfg.epochs` epochs.
///
/// `layout` must already exist (see `ensure_run_dirs`). Parameters are
/// restored from the latest checkpoint in `layout.models` when there is one.
pub fn train<B: AutodiffBackend>(
    cfg: &TrainConfig,
    dataset: &ImageTensor,
    layout: &RunLayout,
    device: &B::Device,
) -> anyhow::Result<TrainOutcome> {
    cfg.validate()?;
    check_compatible(dataset, &cfg.model)?;

    let batch_size = cfg.model.batch_size;
    let mut order = EpochOrder::new(dataset.count(), cfg.seed);
    let batches = order.batches_per_epoch(batch_size);
    if batches == 0 {
        anyhow::bail!(
            "dataset of {} images is smaller than one batch of {batch_size}",
            dataset.count()
        );
    }
    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let mut model = Began::<B>::new(&cfg.model, device).map_err(anyhow::Error::msg)?;
    let mut state = TrainingState::default();
    let resumed_from = checkpoint::latest(&layout.models);
    match &resumed_from {
        Some(stem) => {
            model = checkpoint::restore(model, stem, device)?;
            info!("restored parameters from {}", stem.display());
            if cfg.persist_balance_state {
                if let Some(saved) = checkpoint::load_state(stem)? {
                    info!(
                        "resuming at epoch {} with kt {:.4}",
                        saved.epoch, saved.kt
                    );
                    state = saved;
                }
            }
        }
        None => info!(
            "no checkpoint in {}; starting from fresh parameters",
            layout.models.display()
        ),
    }

    let mut optim_d = AdamConfig::new()
        .with_beta_1(cfg.adam_beta1)
        .with_beta_2(cfg.adam_beta2)
        .init::<B, Discriminator<B>>();
    let mut optim_g = AdamConfig::new()
        .with_beta_1(cfg.adam_beta1)
        .with_beta_2(cfg.adam_beta2)
        .init::<B, Generator<B>>();

    let schedule = cfg.schedule();
    let balance = cfg.balance();
    let summaries = SummaryWriter::new(&layout.logs);
    let started = Instant::now();
    let mut outcome = TrainOutcome {
        resumed_from,
        ..TrainOutcome::default()
    };

    info!(
        "training {} epochs x {batches} batches (batch size {batch_size}, {} images)",
        cfg.epochs,
        dataset.count()
    );
    let first_epoch = state.epoch;
    for epoch in first_epoch..cfg.epochs {
        state.epoch = epoch;
        order.shuffle();
        let lr = schedule.rate(epoch);
        debug!("epoch {epoch}: learning rate {lr:.3e}");

        for batch_idx in 0..batches {
            let global_step = epoch * batches + batch_idx;
            state.global_step = global_step;

            let (host_batch, images) =
                next_batch::<B>(dataset, &order, batch_idx, batch_size, device)?;
            let noise = uniform_noise::<B, _>(&mut rng, batch_size, cfg.model.noise_dim, device);

            let (next, real_loss) = discriminator_step(
                model,
                &mut optim_d,
                images.clone(),
                noise.clone(),
                lr,
                state.kt,
            );
            let (next, fake_loss) =
                generator_step(next, &mut optim_g, images, noise, lr, state.kt);
            model = next;
            outcome.batches_run += 1;

            if cfg.halt_on_divergence && !(real_loss.is_finite() && fake_loss.is_finite()) {
                return Err(DivergenceError {
                    step: global_step,
                    real_loss,
                    fake_loss,
                }
                .into());
            }

            state.kt = balance.update(state.kt, real_loss, fake_loss);
            outcome.kt_updates += 1;
            let convergence = balance.convergence(real_loss, fake_loss);
            info!(
                "Time: {} Epoch: {epoch} {batch_idx}/{batches} convergence: {convergence:.4} kt: {:.4}",
                started.elapsed().as_secs(),
                state.kt
            );

            if global_step % cfg.save_every == 0 {
                summaries.append(&ScalarSummary {
                    step: global_step,
                    epoch,
                    convergence,
                    kt: state.kt,
                    learning_rate: lr,
                    elapsed_secs: started.elapsed().as_secs_f64(),
                })?;
                let sidecar = cfg.persist_balance_state.then_some(&state);
                let stem = checkpoint::save(&model, &layout.models, epoch, sidecar)?;
                outcome.checkpoints_written += 1;
                debug!("saved checkpoint {}", stem.display());

                export_samples(&model, &host_batch, &layout.samples, &mut rng, device)?;
                outcome.sample_exports += 1;
            }
        }
    }

    info!(
        "finished {} batches; kt {:.4}, {} checkpoints",
        outcome.batches_run, state.kt, outcome.checkpoints_written
    );
    outcome.state = state;
    Ok(outcome)
}

/// Write one fresh generator batch and the real batch it trained on.
fn export_samples<B: AutodiffBackend, R: Rng + ?Sized>(
    model: &Began<B>,
    real: &ImageTensor,
    samples_dir: &Path,
    rng: &mut R,
    device: &B::Device,
) -> anyhow::Result<()> {
    let sampler = Sampler::bind(model.generator.valid(), real.count());
    let generated = from_device(sampler.sample(rng, device))?;
    write_pngs(samples_dir, TRAIN_SAMPLE_PREFIX, &generated)?;
    write_pngs(samples_dir, DATA_SAMPLE_PREFIX, real)?;
    Ok(())
}
