//! Loss functions.
//!
//! A loss turns a batch of predictions `(batch, out_dim)` and matching targets into a scalar,
//! and produces `dL/d(prediction)` to seed the network's backward pass:
//!
//! - run `network.forward(...)`
//! - compute loss + `d_output` via [`Loss::backward`]
//! - run `network.backward(...)`
//! - update parameters with an optimizer
//!
//! Gradients are normalized by the batch size here, so their magnitude does not depend on how
//! many rows a batch has.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Matrix;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Supported loss functions.
pub enum Loss {
    /// Mean squared error.
    #[default]
    MeanSquaredError,
    /// Softmax cross-entropy.
    ///
    /// This expects raw logits as predictions and one-hot target rows.
    /// In most cases you should use a `Linear` activation on the output layer.
    SoftmaxCrossEntropy,
}

impl Loss {
    pub fn name(self) -> &'static str {
        match self {
            Loss::MeanSquaredError => "mse",
            Loss::SoftmaxCrossEntropy => "softmax_cross_entropy",
        }
    }

    /// Compute the loss value.
    ///
    /// Shape contract: `pred.shape() == target.shape()`.
    pub fn forward(self, pred: &Matrix, target: &Matrix) -> f32 {
        match self {
            Loss::MeanSquaredError => mse(pred, target),
            Loss::SoftmaxCrossEntropy => softmax_cross_entropy(pred, target),
        }
    }

    /// Compute the loss and its gradient with respect to `pred`.
    pub fn backward(self, pred: &Matrix, target: &Matrix) -> (f32, Matrix) {
        match self {
            Loss::MeanSquaredError => mse_backward(pred, target),
            Loss::SoftmaxCrossEntropy => softmax_cross_entropy_backward(pred, target),
        }
    }

    /// Map raw network output to the space the loss compares against targets in:
    /// softmax probabilities for cross-entropy, the output itself for MSE.
    pub fn output(self, pred: &Matrix) -> Matrix {
        match self {
            Loss::MeanSquaredError => pred.clone(),
            Loss::SoftmaxCrossEntropy => softmax(pred),
        }
    }
}

fn assert_pair(pred: &Matrix, target: &Matrix) {
    assert_eq!(
        pred.shape(),
        target.shape(),
        "pred shape {:?} does not match target shape {:?}",
        pred.shape(),
        target.shape()
    );
}

/// Mean squared error: `mean((target - pred)^2)` over all elements.
pub fn mse(pred: &Matrix, target: &Matrix) -> f32 {
    assert_pair(pred, target);
    if pred.is_empty() {
        return 0.0;
    }
    target.sub(pred).powi(2).mean()
}

/// MSE loss + gradient w.r.t. `pred`.
///
/// The gradient is `-2 * (target - pred) / batch_size`, with `batch_size = pred.rows()`.
/// The loss averages over all `rows * cols` elements, so with more than one output column the
/// gradient is `cols` times the derivative of the returned loss.
pub fn mse_backward(pred: &Matrix, target: &Matrix) -> (f32, Matrix) {
    assert_pair(pred, target);
    if pred.is_empty() {
        return (0.0, Matrix::zeros_like(pred));
    }
    let diff = target.sub(pred);
    let loss = diff.powi(2).mean();
    let d_pred = diff.scale(-2.0 / pred.rows() as f32);
    (loss, d_pred)
}

/// Row-wise softmax, stabilized by subtracting each row's maximum before exponentiating.
pub fn softmax(logits: &Matrix) -> Matrix {
    let mut out = Matrix::zeros_like(logits);
    for r in 0..logits.rows() {
        let max = (0..logits.cols())
            .map(|c| logits.get(r, c))
            .fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0_f32;
        for c in 0..logits.cols() {
            let e = (logits.get(r, c) - max).exp();
            out.set(r, c, e);
            sum += e;
        }
        for c in 0..logits.cols() {
            out.set(r, c, out.get(r, c) / sum);
        }
    }
    out
}

/// Softmax cross-entropy, averaged over the batch.
///
/// Per row: `-sum_i t_i * log softmax(x)_i`, computed via log-sum-exp so very confident
/// logits give a loss close to 0 instead of `log(0)`.
pub fn softmax_cross_entropy(logits: &Matrix, target: &Matrix) -> f32 {
    assert_pair(logits, target);
    assert!(
        logits.cols() > 0,
        "softmax_cross_entropy requires at least 1 class"
    );
    if logits.rows() == 0 {
        return 0.0;
    }

    let mut total = 0.0_f32;
    for r in 0..logits.rows() {
        let lse = log_sum_exp(logits, r);
        for c in 0..logits.cols() {
            let t = target.get(r, c);
            if t != 0.0 {
                total -= t * (logits.get(r, c) - lse);
            }
        }
    }
    total / logits.rows() as f32
}

/// Softmax cross-entropy + gradient w.r.t. the logits.
///
/// Uses the closed form `(softmax(logits) - target) / batch_size` directly rather than
/// chaining the softmax Jacobian with the cross-entropy derivative.
pub fn softmax_cross_entropy_backward(logits: &Matrix, target: &Matrix) -> (f32, Matrix) {
    let loss = softmax_cross_entropy(logits, target);
    if logits.rows() == 0 {
        return (loss, Matrix::zeros_like(logits));
    }
    let d_logits = softmax(logits)
        .sub(target)
        .scale(1.0 / logits.rows() as f32);
    (loss, d_logits)
}

fn log_sum_exp(m: &Matrix, row: usize) -> f32 {
    let max = (0..m.cols())
        .map(|c| m.get(row, c))
        .fold(f32::NEG_INFINITY, f32::max);
    let sum: f32 = (0..m.cols()).map(|c| (m.get(row, c) - max).exp()).sum();
    max + sum.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mse_is_zero_when_equal() {
        let pred = Matrix::from_array(&[[1.0, -2.0], [0.5, 3.0]]);
        assert_eq!(mse(&pred, &pred), 0.0);
    }

    #[test]
    fn mse_backward_matches_expected_gradient() {
        let pred = Matrix::from_array(&[[1.0], [3.0]]);
        let target = Matrix::from_array(&[[2.0], [1.0]]);
        let (loss, d_pred) = mse_backward(&pred, &target);

        // L = mean([1, 4]) = 2.5
        assert!((loss - 2.5).abs() < 1e-6);
        // dL/dpred = -2 * (target - pred) / 2
        assert_eq!(d_pred, Matrix::from_array(&[[-1.0], [2.0]]));
    }

    #[test]
    fn mse_gradient_is_batch_size_invariant() {
        // Repeating the same rows must not change the per-row gradient scale in aggregate.
        let pred = Matrix::from_array(&[[0.0]]);
        let target = Matrix::from_array(&[[1.0]]);
        let (_, g1) = mse_backward(&pred, &target);

        let pred4 = Matrix::zeros(4, 1);
        let target4 = Matrix::ones(4, 1);
        let (_, g4) = mse_backward(&pred4, &target4);

        assert!((g1.sum() - g4.sum()).abs() < 1e-6);
    }

    #[test]
    fn multi_column_mse_gradient_is_cols_times_mean_derivative() {
        let pred = Matrix::from_array(&[[0.5, -1.0, 2.0], [1.5, 0.0, -0.5]]);
        let target = Matrix::from_array(&[[1.0, 0.0, 1.0], [0.0, 1.0, 0.0]]);
        let (_, d) = mse_backward(&pred, &target);
        let cols = pred.cols() as f32;
        let eps = 1e-2_f32;
        for r in 0..2 {
            for c in 0..3 {
                let mut plus = pred.clone();
                plus.set(r, c, pred.get(r, c) + eps);
                let mut minus = pred.clone();
                minus.set(r, c, pred.get(r, c) - eps);
                let numeric = (mse(&plus, &target) - mse(&minus, &target)) / (2.0 * eps);
                assert!(
                    (d.get(r, c) - cols * numeric).abs() < 1e-3,
                    "({r},{c}) analytic={} numeric={numeric}",
                    d.get(r, c)
                );
            }
        }
        // Row normalization only: -2 * (1.0 - 0.5) / 2
        assert!((d.get(0, 0) + 0.5).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "does not match target shape")]
    fn mse_panics_on_shape_mismatch() {
        let _ = mse(&Matrix::zeros(2, 1), &Matrix::zeros(3, 1));
    }

    #[test]
    fn softmax_rows_sum_to_one_and_survive_large_logits() {
        let logits = Matrix::from_array(&[[1000.0, 1001.0, 999.0], [-5.0, 0.0, 5.0]]);
        let p = softmax(&logits);
        assert!(p.is_finite());
        for r in 0..2 {
            let s: f32 = (0..3).map(|c| p.get(r, c)).sum();
            assert!((s - 1.0).abs() < 1e-6);
        }
        assert_eq!(p.argmax_rows(), vec![1, 2]);
    }

    #[test]
    fn cross_entropy_of_confident_correct_logits_is_near_zero() {
        let logits = Matrix::from_array(&[[50.0, 0.0, 0.0], [0.0, 0.0, 50.0]]);
        let target = Matrix::from_array(&[[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let loss = softmax_cross_entropy(&logits, &target);
        assert!(loss >= 0.0 && loss < 1e-6, "loss={loss}");
    }

    #[test]
    fn cross_entropy_of_uniform_logits_is_ln_classes() {
        let classes = 10;
        let logits = Matrix::filled(3, classes, 0.7);
        let mut target = Matrix::zeros(3, classes);
        target.set(0, 2, 1.0);
        target.set(1, 5, 1.0);
        target.set(2, 9, 1.0);
        let loss = softmax_cross_entropy(&logits, &target);
        assert!((loss - (classes as f32).ln()).abs() < 1e-5, "loss={loss}");
    }

    #[test]
    fn cross_entropy_gradient_is_softmax_minus_target_over_batch() {
        let logits = Matrix::from_array(&[[0.0, 0.0], [2.0, -1.0]]);
        let target = Matrix::from_array(&[[1.0, 0.0], [0.0, 1.0]]);
        let (_, d) = softmax_cross_entropy_backward(&logits, &target);
        let expected = softmax(&logits).sub(&target).scale(0.5);
        assert_eq!(d, expected);
        // Each row of softmax - one_hot sums to zero.
        for r in 0..2 {
            assert!((d.get(r, 0) + d.get(r, 1)).abs() < 1e-6);
        }
    }

    #[test]
    fn cross_entropy_gradient_matches_finite_differences() {
        let logits = Matrix::from_array(&[[0.3, -1.2, 0.8], [1.5, 0.1, -0.4]]);
        let target = Matrix::from_array(&[[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]]);
        let (_, d) = softmax_cross_entropy_backward(&logits, &target);
        let eps = 1e-2_f32;
        for r in 0..2 {
            for c in 0..3 {
                let mut plus = logits.clone();
                plus.set(r, c, logits.get(r, c) + eps);
                let mut minus = logits.clone();
                minus.set(r, c, logits.get(r, c) - eps);
                let numeric = (softmax_cross_entropy(&plus, &target)
                    - softmax_cross_entropy(&minus, &target))
                    / (2.0 * eps);
                assert!(
                    (numeric - d.get(r, c)).abs() < 1e-3,
                    "({r},{c}) numeric={numeric} analytic={}",
                    d.get(r, c)
                );
            }
        }
    }

    #[test]
    fn output_applies_softmax_only_for_cross_entropy() {
        let logits = Matrix::from_array(&[[1.0, 2.0]]);
        assert_eq!(Loss::MeanSquaredError.output(&logits), logits);
        assert_eq!(Loss::SoftmaxCrossEntropy.output(&logits), softmax(&logits));
    }
}
