//! Metrics.
//!
//! Metrics are evaluation helpers (they do not participate in backprop). The trainer reports one
//! at every evaluation checkpoint.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Matrix, Network, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Supported evaluation metrics.
pub enum Metric {
    /// The network's own loss.
    #[default]
    Loss,
    /// Fraction of rows whose predicted argmax hits the `1.0` of a one-hot target row.
    Accuracy,
}

impl Metric {
    pub fn name(self) -> &'static str {
        match self {
            Metric::Loss => "loss",
            Metric::Accuracy => "accuracy",
        }
    }

    /// Evaluate `network` in inference mode on `(inputs, targets)`.
    pub fn evaluate(self, network: &Network, inputs: &Matrix, targets: &Matrix) -> Result<f32> {
        match self {
            Metric::Loss => network.evaluate_loss(inputs, targets),
            Metric::Accuracy => {
                network.check_batch(inputs, targets)?;
                accuracy(&network.predict(inputs), targets)
            }
        }
    }
}

/// Classification accuracy of `predictions` against one-hot `targets`.
///
/// A row counts as a hit when the target holds exactly `1.0` at the prediction's argmax column.
/// Both matrices must have the same shape; an empty batch is an error.
pub fn accuracy(predictions: &Matrix, targets: &Matrix) -> Result<f32> {
    if predictions.rows() != targets.rows() {
        return Err(Error::InvalidData(format!(
            "number of samples in predictions ({}) and targets ({}) do not match",
            predictions.rows(),
            targets.rows()
        )));
    }
    if predictions.cols() != targets.cols() {
        return Err(Error::InvalidData(format!(
            "prediction width {} does not match target width {}",
            predictions.cols(),
            targets.cols()
        )));
    }
    if predictions.rows() == 0 {
        return Err(Error::InvalidData(
            "accuracy of an empty batch is undefined".to_owned(),
        ));
    }

    let hits = predictions
        .argmax_rows()
        .into_iter()
        .enumerate()
        .filter(|&(row, col)| targets.get(row, col) == 1.0)
        .count();
    Ok(hits as f32 / predictions.rows() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Activation, Layer, Loss};

    #[test]
    fn accuracy_counts_argmax_hits() {
        let pred = Matrix::from_array(&[[0.1, 0.9], [0.8, 0.2], [0.3, 0.7], [0.6, 0.4]]);
        let target = Matrix::from_array(&[[0.0, 1.0], [1.0, 0.0], [1.0, 0.0], [1.0, 0.0]]);
        assert_eq!(accuracy(&pred, &target).unwrap(), 0.75);
    }

    #[test]
    fn accuracy_rejects_row_mismatch() {
        let err = accuracy(&Matrix::zeros(3, 2), &Matrix::zeros(2, 2)).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert!(accuracy(&Matrix::zeros(0, 2), &Matrix::zeros(0, 2)).is_err());
    }

    #[test]
    fn evaluate_dispatches_on_metric() {
        // Identity network on 2 features.
        let layer = Layer::from_parts(
            Matrix::from_array(&[[1.0, 0.0], [0.0, 1.0]]),
            Matrix::zeros(1, 2),
            Activation::Linear,
        )
        .unwrap();
        let net = Network::new(vec![layer], Loss::MeanSquaredError).unwrap();

        let x = Matrix::from_array(&[[1.0, 0.0], [0.0, 1.0]]);
        let y = Matrix::from_array(&[[1.0, 0.0], [1.0, 0.0]]);

        assert_eq!(Metric::Accuracy.evaluate(&net, &x, &y).unwrap(), 0.5);
        // Second row is off by 1 in both columns: mean over 4 elements = 2 / 4.
        assert_eq!(Metric::Loss.evaluate(&net, &x, &y).unwrap(), 0.5);
        assert!(
            Metric::Accuracy
                .evaluate(&net, &x, &Matrix::zeros(3, 2))
                .is_err()
        );
    }
}
