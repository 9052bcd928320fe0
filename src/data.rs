//! Datasets and data sources.
//!
//! A `Dataset` pairs an input matrix `(len, input_dim)` with a target matrix `(len, target_dim)`;
//! row `i` of one always belongs to row `i` of the other. A `DataSource` hands the trainer a
//! training split and, optionally, an evaluation split.

use std::ops::Range;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::{Error, Matrix, Result};

/// A supervised dataset: inputs (X) and targets (Y) with one-to-one rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    inputs: Matrix,
    targets: Matrix,
}

impl Dataset {
    /// Pair `inputs` and `targets`. Row counts must agree.
    pub fn new(inputs: Matrix, targets: Matrix) -> Result<Self> {
        if inputs.rows() != targets.rows() {
            return Err(Error::InvalidData(format!(
                "inputs have {} rows but targets have {}",
                inputs.rows(),
                targets.rows()
            )));
        }
        Ok(Self { inputs, targets })
    }

    /// Build a dataset from per-sample rows.
    ///
    /// This is a convenience constructor (it copies into contiguous storage).
    pub fn from_rows(inputs: &[Vec<f32>], targets: &[Vec<f32>]) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::InvalidData("inputs must not be empty".to_owned()));
        }
        let inputs = Matrix::from_rows(inputs).map_err(to_data_error)?;
        let targets = Matrix::from_rows(targets).map_err(to_data_error)?;
        Self::new(inputs, targets)
    }

    /// Build a dataset from flat row-major buffers.
    ///
    /// `inputs` is `(len, input_dim)` and `targets` is `(len, target_dim)`.
    pub fn from_flat(
        inputs: Vec<f32>,
        targets: Vec<f32>,
        input_dim: usize,
        target_dim: usize,
    ) -> Result<Self> {
        if input_dim == 0 || target_dim == 0 {
            return Err(Error::InvalidData(format!(
                "input_dim and target_dim must be > 0, got {input_dim} and {target_dim}"
            )));
        }
        if !inputs.len().is_multiple_of(input_dim) {
            return Err(Error::InvalidData(format!(
                "inputs length {} is not divisible by input_dim {input_dim}",
                inputs.len()
            )));
        }
        let len = inputs.len() / input_dim;
        if targets.len() != len * target_dim {
            return Err(Error::InvalidData(format!(
                "targets length {} does not match len * target_dim ({len} * {target_dim})",
                targets.len()
            )));
        }

        let inputs = Matrix::from_vec(len, input_dim, inputs)?;
        let targets = Matrix::from_vec(len, target_dim, targets)?;
        Self::new(inputs, targets)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inputs.rows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.inputs.cols()
    }

    #[inline]
    pub fn target_dim(&self) -> usize {
        self.targets.cols()
    }

    #[inline]
    pub fn inputs(&self) -> &Matrix {
        &self.inputs
    }

    #[inline]
    pub fn targets(&self) -> &Matrix {
        &self.targets
    }

    pub fn into_parts(self) -> (Matrix, Matrix) {
        (self.inputs, self.targets)
    }

    /// Contiguous mini-batch `(inputs[range], targets[range])`.
    ///
    /// Panics if `range` is out of bounds.
    pub fn batch(&self, range: Range<usize>) -> (Matrix, Matrix) {
        (
            self.inputs.rows_range(range.clone()),
            self.targets.rows_range(range),
        )
    }

    /// A copy with rows reordered by a fresh random permutation, pairing preserved.
    pub fn permute<R: Rng + ?Sized>(&self, rng: &mut R) -> Dataset {
        let order = permutation(self.len(), rng);
        Dataset {
            inputs: self.inputs.select_rows(&order),
            targets: self.targets.select_rows(&order),
        }
    }
}

fn to_data_error(err: Error) -> Error {
    match err {
        Error::InvalidShape(msg) => Error::InvalidData(msg),
        other => other,
    }
}

/// A uniformly random permutation of `0..n` (Fisher-Yates).
pub fn permutation<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    order
}

/// Supplies training data and an optional held-out evaluation split.
pub trait DataSource {
    fn train(&self) -> &Dataset;

    /// `None` means there is no separate evaluation split.
    fn eval(&self) -> Option<&Dataset>;
}

impl DataSource for Dataset {
    fn train(&self) -> &Dataset {
        self
    }

    fn eval(&self) -> Option<&Dataset> {
        None
    }
}

/// Data source over four prepared matrices.
#[derive(Debug, Clone)]
pub struct SimpleDataSource {
    train: Dataset,
    eval: Dataset,
}

impl SimpleDataSource {
    pub fn new(x_train: Matrix, y_train: Matrix, x_eval: Matrix, y_eval: Matrix) -> Result<Self> {
        let train = Dataset::new(x_train, y_train)?;
        let eval = Dataset::new(x_eval, y_eval)?;
        if eval.input_dim() != train.input_dim() || eval.target_dim() != train.target_dim() {
            return Err(Error::InvalidData(format!(
                "eval widths ({}, {}) do not match train widths ({}, {})",
                eval.input_dim(),
                eval.target_dim(),
                train.input_dim(),
                train.target_dim()
            )));
        }
        Ok(Self { train, eval })
    }
}

impl DataSource for SimpleDataSource {
    fn train(&self) -> &Dataset {
        &self.train
    }

    fn eval(&self) -> Option<&Dataset> {
        Some(&self.eval)
    }
}

/// Data source that labels each argument row with `f(row)`.
///
/// The trailing `round(len * eval_fraction)` rows are held out for evaluation.
#[derive(Debug, Clone)]
pub struct FunctionDataSource {
    all: Dataset,
    train: Dataset,
    eval: Option<Dataset>,
}

impl FunctionDataSource {
    pub fn new(arguments: Matrix, f: impl Fn(&[f32]) -> f32, eval_fraction: f32) -> Result<Self> {
        if !(eval_fraction.is_finite() && (0.0..1.0).contains(&eval_fraction)) {
            return Err(Error::InvalidConfig(format!(
                "eval_fraction must be finite and in [0,1), got {eval_fraction}"
            )));
        }
        if arguments.is_empty() {
            return Err(Error::InvalidData("arguments must not be empty".to_owned()));
        }

        let len = arguments.rows();
        let cols = arguments.cols();
        let targets: Vec<f32> = arguments.as_slice().chunks_exact(cols).map(&f).collect();
        let all = Dataset::new(arguments, Matrix::from_vec(len, 1, targets)?)?;

        let eval_len = (len as f32 * eval_fraction).round() as usize;
        if eval_len >= len {
            return Err(Error::InvalidData(format!(
                "eval_fraction {eval_fraction} leaves no training rows out of {len}"
            )));
        }
        let split = len - eval_len;
        let (x, y) = all.batch(0..split);
        let train = Dataset::new(x, y)?;
        let eval = if eval_len > 0 {
            let (x, y) = all.batch(split..len);
            Some(Dataset::new(x, y)?)
        } else {
            None
        };

        Ok(Self { all, train, eval })
    }

    /// Every row, training and evaluation together.
    pub fn all(&self) -> &Dataset {
        &self.all
    }
}

impl DataSource for FunctionDataSource {
    fn train(&self) -> &Dataset {
        &self.train
    }

    fn eval(&self) -> Option<&Dataset> {
        self.eval.as_ref()
    }
}

/// Scales inputs to zero mean and unit variance using statistics of the training inputs.
///
/// The statistics are global (over every element), not per feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standardizer {
    mean: f32,
    std: f32,
}

impl Standardizer {
    /// Fit on `inputs`. Fails if they are empty or constant.
    pub fn fit(inputs: &Matrix) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::InvalidData(
                "cannot standardize an empty matrix".to_owned(),
            ));
        }
        let mean = inputs.mean();
        let std = inputs.std();
        if !(std.is_finite() && std > 0.0) {
            return Err(Error::InvalidData(format!(
                "cannot standardize data with standard deviation {std}"
            )));
        }
        Ok(Self { mean, std })
    }

    #[inline]
    pub fn mean(&self) -> f32 {
        self.mean
    }

    #[inline]
    pub fn std(&self) -> f32 {
        self.std
    }

    /// Standardize `inputs` in place.
    pub fn apply(&self, inputs: &mut Matrix) {
        inputs.add_scalar_in_place(-self.mean);
        inputs.div_scalar_in_place(self.std);
    }

    /// Standardize the inputs of `data` in place; targets are untouched.
    pub fn apply_dataset(&self, data: &mut Dataset) {
        self.apply(&mut data.inputs);
    }
}
