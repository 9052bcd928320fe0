//! Optimizers.
//!
//! Given a network and its gradients, an optimizer replaces every parameter matrix with an
//! updated one:
//!
//! - `Sgd`: `param = param - lr * grad`
//! - `SgdMomentum`: `v = momentum * v + grad; param = param - lr * v`
//!
//! Design notes:
//! - Optimizer *state* (velocities) lives outside the network, in [`OptimizerState`], addressed
//!   by parameter position (weights then bias, layer by layer).
//! - The learning rate comes from an [`LrSchedule`] evaluated at the step passed to `update`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Gradients, LrSchedule, Matrix, Network, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// Optimizer choice for training.
pub enum Optimizer {
    /// Plain gradient descent.
    #[default]
    Sgd,
    /// Gradient descent with a per-parameter velocity.
    SgdMomentum { momentum: f32 },
}

impl Optimizer {
    /// Validate optimizer hyperparameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Optimizer::Sgd => Ok(()),
            Optimizer::SgdMomentum { momentum } => {
                if !(momentum.is_finite() && (0.0..1.0).contains(&momentum)) {
                    return Err(Error::InvalidConfig(format!(
                        "momentum must be finite and in [0,1), got {momentum}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Allocate optimizer state for `network`, driven by `schedule`.
    pub fn state(self, network: &Network, schedule: LrSchedule) -> Result<OptimizerState> {
        self.validate()?;
        schedule.validate()?;

        let rule = match self {
            Optimizer::Sgd => UpdateRule::Sgd,
            Optimizer::SgdMomentum { momentum } => UpdateRule::SgdMomentum {
                momentum,
                velocities: network.params().into_iter().map(Matrix::zeros_like).collect(),
            },
        };
        Ok(OptimizerState { rule, schedule })
    }
}

#[derive(Debug, Clone)]
enum UpdateRule {
    Sgd,
    SgdMomentum {
        momentum: f32,
        velocities: Vec<Matrix>,
    },
}

#[derive(Debug, Clone)]
/// Owned optimizer state for one network.
pub struct OptimizerState {
    rule: UpdateRule,
    schedule: LrSchedule,
}

impl OptimizerState {
    #[inline]
    pub fn schedule(&self) -> LrSchedule {
        self.schedule
    }

    /// Velocity accumulators in parameter order; empty for plain SGD.
    pub fn velocities(&self) -> &[Matrix] {
        match &self.rule {
            UpdateRule::Sgd => &[],
            UpdateRule::SgdMomentum { velocities, .. } => velocities.as_slice(),
        }
    }

    /// Apply one optimizer step at 0-based step `step`; returns the learning rate used.
    ///
    /// Panics if `grads` was not produced by a network of the same shape.
    pub fn update(&mut self, network: &mut Network, grads: &Gradients, step: usize) -> f32 {
        let lr = self.schedule.rate(step);
        assert!(lr.is_finite() && lr > 0.0, "lr must be finite and > 0");
        assert_eq!(
            grads.num_layers(),
            network.num_layers(),
            "grads has {} layers, network has {} layers",
            grads.num_layers(),
            network.num_layers()
        );

        match &mut self.rule {
            UpdateRule::Sgd => {
                for (param, grad) in network.params_mut().zip(grads.iter()) {
                    *param = param.sub(&grad.scale(lr));
                }
            }
            UpdateRule::SgdMomentum {
                momentum,
                velocities,
            } => {
                for ((param, grad), v) in network
                    .params_mut()
                    .zip(grads.iter())
                    .zip(velocities.iter_mut())
                {
                    *v = v.scale(*momentum).add(grad);
                    *param = param.sub(&v.scale(lr));
                }
            }
        }
        lr
    }
}
