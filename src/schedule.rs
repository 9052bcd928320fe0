//! Learning-rate schedules.
//!
//! A schedule is a pure function from the optimizer step counter (0-based) to a step size.
//! It holds no state, so one schedule value can be shared by any number of training runs.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LrSchedule {
    /// Same rate at every step.
    Constant { lr: f32 },
    /// `initial * decay_factor^(step / decay_steps)`, decaying smoothly between whole periods.
    ExponentialDecay {
        initial: f32,
        decay_factor: f32,
        decay_steps: usize,
    },
}

impl Default for LrSchedule {
    fn default() -> Self {
        LrSchedule::Constant { lr: 0.01 }
    }
}

impl LrSchedule {
    pub fn constant(lr: f32) -> Self {
        LrSchedule::Constant { lr }
    }

    /// Exponential decay that starts at `initial` and reaches `final_lr` after `steps` steps.
    pub fn decay_between(initial: f32, final_lr: f32, steps: usize) -> Result<Self> {
        if !(initial.is_finite() && initial > 0.0 && final_lr.is_finite() && final_lr > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "decay endpoints must be finite and > 0, got {initial} -> {final_lr}"
            )));
        }
        let schedule = LrSchedule::ExponentialDecay {
            initial,
            decay_factor: final_lr / initial,
            decay_steps: steps,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(self) -> Result<()> {
        match self {
            LrSchedule::Constant { lr } => {
                if !(lr.is_finite() && lr > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "learning rate must be finite and > 0, got {lr}"
                    )));
                }
            }
            LrSchedule::ExponentialDecay {
                initial,
                decay_factor,
                decay_steps,
            } => {
                if !(initial.is_finite() && initial > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "initial learning rate must be finite and > 0, got {initial}"
                    )));
                }
                if !(decay_factor.is_finite() && decay_factor > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "decay_factor must be finite and > 0, got {decay_factor}"
                    )));
                }
                if decay_steps == 0 {
                    return Err(Error::InvalidConfig("decay_steps must be > 0".to_owned()));
                }
            }
        }
        Ok(())
    }

    /// Learning rate for the 0-based optimizer step `step`.
    ///
    /// Decayed rates are clamped to `[f32::MIN_POSITIVE, f32::MAX]`, so a run far past
    /// `decay_steps` keeps a tiny positive rate instead of underflowing to 0 (or overflowing to
    /// infinity when `decay_factor > 1`).
    pub fn rate(self, step: usize) -> f32 {
        match self {
            LrSchedule::Constant { lr } => lr,
            LrSchedule::ExponentialDecay {
                initial,
                decay_factor,
                decay_steps,
            } => (initial * decay_factor.powf(step as f32 / decay_steps as f32))
                .clamp(f32::MIN_POSITIVE, f32::MAX),
        }
    }
}
