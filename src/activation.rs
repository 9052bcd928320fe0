//! Activation functions.
//!
//! A dense layer computes a pre-activation value `z = x W + b` and then applies an
//! activation function element-wise: `y = activation(z)`.
//!
//! Each variant supplies a matched (value, derivative) pair. Both are evaluated at the same
//! point, the pre-activation `z`, which the layer caches during the forward pass. Backprop then
//! computes `dL/dz = dL/dy * activation'(z)`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Matrix;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Element-wise activation function.
pub enum Activation {
    /// Identity: `y = z`.
    #[default]
    Linear,
    /// Logistic sigmoid: `y = 1 / (1 + e^-z)`.
    Sigmoid,
    /// Hyperbolic tangent.
    Tanh,
}

impl Activation {
    /// Apply the activation to a pre-activation matrix.
    pub fn forward(self, z: &Matrix) -> Matrix {
        match self {
            Activation::Linear => z.clone(),
            Activation::Sigmoid => z.sigmoid(),
            Activation::Tanh => z.tanh(),
        }
    }

    /// Derivative `dy/dz`, evaluated element-wise at the pre-activation `z`.
    pub fn derivative(self, z: &Matrix) -> Matrix {
        match self {
            Activation::Linear => Matrix::ones_like(z),
            Activation::Sigmoid => z.sigmoid_derivative(),
            Activation::Tanh => z.tanh_derivative(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Activation::Linear => "linear",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
        }
    }
}
