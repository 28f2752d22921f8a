//! Learning-rate schedule and the `kt` equilibrium controller.

use serde::{Deserialize, Serialize};

/// Step decay: `base_lr * drop^floor((epoch + 1) / epoch_drop)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LrSchedule {
    pub base_lr: f64,
    pub drop: f64,
    pub epoch_drop: usize,
}

impl LrSchedule {
    pub fn rate(&self, epoch: usize) -> f64 {
        let drops = (epoch + 1) / self.epoch_drop.max(1);
        self.base_lr * self.drop.powi(drops as i32)
    }
}

/// Proportional control of the discriminator's fake-loss weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceControl {
    pub lambda_kt: f32,
    pub gamma: f32,
}

impl BalanceControl {
    /// `clamp(kt + lambda_kt * (gamma * real - fake), 0, 1)`.
    ///
    /// A NaN update leaves `kt` where it was.
    pub fn update(&self, kt: f32, real_loss: f32, fake_loss: f32) -> f32 {
        let next = kt + self.lambda_kt * (self.gamma * real_loss - fake_loss);
        if next.is_nan() {
            return kt.clamp(0.0, 1.0);
        }
        next.clamp(0.0, 1.0)
    }

    /// `real + |gamma * real - fake|`; lower is better.
    pub fn convergence(&self, real_loss: f32, fake_loss: f32) -> f32 {
        real_loss + (self.gamma * real_loss - fake_loss).abs()
    }
}

/// Loop bookkeeping passed explicitly between steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    pub kt: f32,
    pub global_step: usize,
    pub epoch: usize,
}
