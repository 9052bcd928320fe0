use rand::Rng;

use crate::{Activation, Axis, Error, Init, Matrix, Result};

/// Dense (fully connected) layer: `output = activation(input · W + b)`.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Shape `(in_dim, out_dim)`.
    weights: Matrix,
    /// Shape `(1, out_dim)`, broadcast over the batch.
    bias: Matrix,
    activation: Activation,
}

/// Values a layer's forward pass keeps for its backward pass.
///
/// Produced by [`Layer::forward`] and consumed by [`Layer::backward`], so every backward call
/// is matched by exactly one forward call for the same batch.
#[derive(Debug, Clone)]
pub struct LayerCache {
    input: Matrix,
    pre_activation: Matrix,
    output: Matrix,
}

impl LayerCache {
    /// The post-activation output of the forward pass (shape `(batch, out_dim)`).
    #[inline]
    pub fn output(&self) -> &Matrix {
        &self.output
    }

    #[inline]
    pub fn input(&self) -> &Matrix {
        &self.input
    }

    #[inline]
    pub fn pre_activation(&self) -> &Matrix {
        &self.pre_activation
    }

    pub fn into_output(self) -> Matrix {
        self.output
    }
}

/// Parameter gradients of a single layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradients {
    pub d_weights: Matrix,
    pub d_bias: Matrix,
}

impl Layer {
    /// Create a layer with parameters drawn from `init`.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        init: Init,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }
        init.validate()?;

        let weights = init.sample(in_dim, out_dim, in_dim, out_dim, rng);
        let bias = init.sample(1, out_dim, in_dim, out_dim, rng);
        Ok(Self {
            weights,
            bias,
            activation,
        })
    }

    /// Build a layer from explicit parameters.
    ///
    /// `weights` must be `(in_dim, out_dim)` and `bias` `(1, out_dim)`, all values finite.
    pub fn from_parts(weights: Matrix, bias: Matrix, activation: Activation) -> Result<Self> {
        if weights.rows() == 0 || weights.cols() == 0 {
            return Err(Error::InvalidShape(format!(
                "weights must be non-empty, got shape {:?}",
                weights.shape()
            )));
        }
        if bias.shape() != (1, weights.cols()) {
            return Err(Error::InvalidShape(format!(
                "bias shape {:?} does not match (1, {})",
                bias.shape(),
                weights.cols()
            )));
        }
        if !weights.is_finite() || !bias.is_finite() {
            return Err(Error::InvalidData(
                "layer parameters must contain only finite values".to_owned(),
            ));
        }
        Ok(Self {
            weights,
            bias,
            activation,
        })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.weights.rows()
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.weights.cols()
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    #[inline]
    pub fn bias(&self) -> &Matrix {
        &self.bias
    }

    /// Replace both parameters. Shapes must stay the same.
    pub fn set_params(&mut self, weights: Matrix, bias: Matrix) {
        assert_eq!(
            weights.shape(),
            self.weights.shape(),
            "new weights shape {:?} does not match {:?}",
            weights.shape(),
            self.weights.shape()
        );
        assert_eq!(
            bias.shape(),
            self.bias.shape(),
            "new bias shape {:?} does not match {:?}",
            bias.shape(),
            self.bias.shape()
        );
        self.weights = weights;
        self.bias = bias;
    }

    /// Mutable `[weights, bias]`, in parameter order.
    pub(crate) fn params_mut(&mut self) -> [&mut Matrix; 2] {
        [&mut self.weights, &mut self.bias]
    }

    /// Number of trainable scalars (weights + biases).
    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    fn pre_activation(&self, input: &Matrix) -> Matrix {
        assert_eq!(
            input.cols(),
            self.in_dim(),
            "input width {} does not match layer in_dim {}",
            input.cols(),
            self.in_dim()
        );
        input.dot(&self.weights).add_row(&self.bias)
    }

    /// Training-mode forward pass for a batch `(batch, in_dim)`.
    ///
    /// Computes:
    /// - `z = input · W + b` (bias broadcast over rows)
    /// - `output = activation(z)`
    ///
    /// The returned cache holds `input`, `z` and `output` for the matching `backward` call.
    pub fn forward(&self, input: Matrix) -> LayerCache {
        let pre_activation = self.pre_activation(&input);
        let output = self.activation.forward(&pre_activation);
        LayerCache {
            input,
            pre_activation,
            output,
        }
    }

    /// Inference-mode forward pass: no cache is kept.
    pub fn predict(&self, input: &Matrix) -> Matrix {
        self.activation.forward(&self.pre_activation(input))
    }

    /// Backward pass for the batch recorded in `cache`.
    ///
    /// Given `d_output = dL/d(output)`:
    /// - `dL/dz = d_output ⊙ activation'(z)`
    /// - `dL/dW = input^T · dL/dz`
    /// - `dL/db = column sums of dL/dz` (the bias is broadcast over the batch)
    /// - `dL/d(input) = dL/dz · W^T`, returned for the previous layer.
    ///
    /// Panics if the cache was not produced by a layer of this shape or if `d_output` does not
    /// match the cached output shape.
    pub fn backward(&self, cache: LayerCache, d_output: &Matrix) -> (Matrix, LayerGradients) {
        assert!(
            cache.input.cols() == self.in_dim() && cache.output.cols() == self.out_dim(),
            "cache with input width {} / output width {} does not belong to a {}x{} layer",
            cache.input.cols(),
            cache.output.cols(),
            self.in_dim(),
            self.out_dim()
        );
        assert_eq!(
            d_output.shape(),
            cache.output.shape(),
            "d_output shape {:?} does not match cached output shape {:?}",
            d_output.shape(),
            cache.output.shape()
        );

        let d_pre = d_output.hadamard(&self.activation.derivative(&cache.pre_activation));
        let d_weights = cache.input.dot_tn(&d_pre);
        let d_bias = d_pre.sum_axis(Axis::Rows);
        let d_input = d_pre.dot_nt(&self.weights);

        (
            d_input,
            LayerGradients {
                d_weights,
                d_bias,
            },
        )
    }
}
