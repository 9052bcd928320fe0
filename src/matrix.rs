//! Dense 2-D `f32` matrix.
//!
//! `Matrix` is the numeric substrate of the whole crate: layers, losses, optimizers and the
//! training loop all exchange `Matrix` values.
//!
//! # Conventions
//!
//! - Storage is a contiguous row-major `Vec<f32>`; the shape is fixed at construction.
//! - Every operation that is not explicitly named `*_in_place` (or `set`/`set_row`) returns a
//!   freshly allocated matrix and leaves its operands untouched.
//! - Binary operations assert shape compatibility and panic on mismatch. A mismatch is a
//!   programmer error, not a recoverable condition; constructors that take caller data
//!   (`from_vec`, `from_rows`) return [`Result`] instead.

use std::fmt;
use std::ops::{Index, Range};

use rand::Rng;

use crate::matmul::{self, View};
use crate::{Error, Result};

/// Reduction axis for [`Matrix::sum_axis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Collapse the row dimension: `(rows, cols) -> (1, cols)`.
    Rows,
    /// Collapse the column dimension: `(rows, cols) -> (rows, 1)`.
    Columns,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// A `rows x cols` matrix of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    pub fn zeros_like(other: &Matrix) -> Self {
        Self::zeros(other.rows, other.cols)
    }

    /// A `rows x cols` matrix of ones.
    pub fn ones(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 1.0)
    }

    pub fn ones_like(other: &Matrix) -> Self {
        Self::ones(other.rows, other.cols)
    }

    pub fn filled(rows: usize, cols: usize, value: f32) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Build a matrix from a flat row-major buffer.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        let expected = rows.checked_mul(cols).ok_or_else(|| {
            Error::InvalidShape(format!("shape ({rows}, {cols}) overflows usize"))
        })?;
        if data.len() != expected {
            return Err(Error::InvalidShape(format!(
                "buffer length {} does not match rows * cols ({rows} * {cols})",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a matrix from per-row vectors (copied into contiguous storage).
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(Error::InvalidShape(format!(
                    "row {i} has len {}, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Build a matrix from fixed-width rows. Infallible: every row has `C` columns.
    ///
    /// ```rust
    /// use rust_nn::Matrix;
    ///
    /// let m = Matrix::from_array(&[[1.0, 2.0], [3.0, 4.0]]);
    /// assert_eq!(m.shape(), (2, 2));
    /// assert_eq!(m[(1, 0)], 3.0);
    /// ```
    pub fn from_array<const C: usize>(rows: &[[f32; C]]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * C);
        for row in rows {
            data.extend_from_slice(row);
        }
        Self {
            rows: rows.len(),
            cols: C,
            data,
        }
    }

    /// Each element drawn independently and uniformly from `[-0.5, 0.5)`.
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        Self::random_range(rows, cols, -0.5, 0.5, rng)
    }

    /// Each element drawn independently and uniformly from `[low, high)`.
    ///
    /// `low == high` produces a constant fill. Panics if `low > high`.
    pub fn random_range<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        low: f32,
        high: f32,
        rng: &mut R,
    ) -> Self {
        assert!(low <= high, "random range is empty: [{low}, {high})");
        if low == high {
            return Self::filled(rows, cols, low);
        }
        let data = (0..rows * cols).map(|_| rng.gen_range(low..high)).collect();
        Self { rows, cols, data }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major view of all elements.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Element at `(row, col)`. Panics when out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[self.offset(row, col)]
    }

    /// Overwrite the element at `(row, col)`. Panics when out of bounds.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        let idx = self.offset(row, col);
        self.data[idx] = value;
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for shape ({}, {})",
            self.rows,
            self.cols
        );
        row * self.cols + col
    }

    #[inline]
    fn view(&self) -> View<'_> {
        View::row_major(&self.data, self.rows, self.cols)
    }

    #[inline]
    fn assert_same_shape(&self, other: &Matrix, op: &str) {
        assert_eq!(
            self.shape(),
            other.shape(),
            "{op}: shape {:?} does not match shape {:?}",
            self.shape(),
            other.shape()
        );
    }

    /// Apply `f` to every element.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Combine two equally shaped matrices element by element.
    pub(crate) fn zip_map(
        &self,
        other: &Matrix,
        op: &str,
        f: impl Fn(f32, f32) -> f32,
    ) -> Matrix {
        self.assert_same_shape(other, op);
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }

    pub fn add(&self, other: &Matrix) -> Matrix {
        self.zip_map(other, "add", |a, b| a + b)
    }

    pub fn sub(&self, other: &Matrix) -> Matrix {
        self.zip_map(other, "sub", |a, b| a - b)
    }

    /// Element-wise (Hadamard) product.
    pub fn hadamard(&self, other: &Matrix) -> Matrix {
        self.zip_map(other, "hadamard", |a, b| a * b)
    }

    pub fn add_scalar(&self, scalar: f32) -> Matrix {
        self.map(|v| v + scalar)
    }

    /// Multiply every element by `scalar`.
    pub fn scale(&self, scalar: f32) -> Matrix {
        self.map(|v| v * scalar)
    }

    pub fn powi(&self, n: i32) -> Matrix {
        self.map(|v| v.powi(n))
    }

    /// Broadcast-add a `1 x cols` row to every row.
    pub fn add_row(&self, row: &Matrix) -> Matrix {
        self.broadcast_row(row, "add_row", |a, b| a + b)
    }

    /// Broadcast-multiply every row element-wise by a `1 x cols` row.
    pub fn mul_row(&self, row: &Matrix) -> Matrix {
        self.broadcast_row(row, "mul_row", |a, b| a * b)
    }

    fn broadcast_row(&self, row: &Matrix, op: &str, f: impl Fn(f32, f32) -> f32) -> Matrix {
        assert!(
            row.rows == 1 && row.cols == self.cols,
            "{op}: row shape {:?} does not broadcast over shape {:?}",
            row.shape(),
            self.shape()
        );
        let mut data = Vec::with_capacity(self.data.len());
        for r in 0..self.rows {
            let start = r * self.cols;
            data.extend(
                self.data[start..start + self.cols]
                    .iter()
                    .zip(&row.data)
                    .map(|(&a, &b)| f(a, b)),
            );
        }
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }

    /// Matrix product `self * other`.
    ///
    /// Panics unless `self.cols() == other.rows()`. The result is `self.rows() x other.cols()`.
    pub fn dot(&self, other: &Matrix) -> Matrix {
        assert_eq!(
            self.cols, other.rows,
            "dot: shape {:?} cannot multiply shape {:?}",
            self.shape(),
            other.shape()
        );
        self.product(self.view(), other.view())
    }

    /// `transpose(self) * other`, without materializing the transpose.
    pub fn dot_tn(&self, other: &Matrix) -> Matrix {
        assert_eq!(
            self.rows, other.rows,
            "dot_tn: transpose of shape {:?} cannot multiply shape {:?}",
            self.shape(),
            other.shape()
        );
        self.product(self.view().t(), other.view())
    }

    /// `self * transpose(other)`, without materializing the transpose.
    pub fn dot_nt(&self, other: &Matrix) -> Matrix {
        assert_eq!(
            self.cols, other.cols,
            "dot_nt: shape {:?} cannot multiply transpose of shape {:?}",
            self.shape(),
            other.shape()
        );
        self.product(self.view(), other.view().t())
    }

    fn product(&self, a: View<'_>, b: View<'_>) -> Matrix {
        let mut out = Matrix::zeros(a.rows, b.cols);
        matmul::gemm(a, b, &mut out.data);
        out
    }

    /// Swap rows and columns.
    pub fn transpose(&self) -> Matrix {
        let mut data = Vec::with_capacity(self.data.len());
        for c in 0..self.cols {
            for r in 0..self.rows {
                data.push(self.data[r * self.cols + c]);
            }
        }
        Matrix {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Sum over all elements.
    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    /// Mean over all elements (`NaN` for an empty matrix).
    pub fn mean(&self) -> f32 {
        self.sum() / self.data.len() as f32
    }

    /// Smallest element (`+inf` for an empty matrix).
    pub fn min(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Largest element (`-inf` for an empty matrix).
    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Population standard deviation over all elements.
    pub fn std(&self) -> f32 {
        let mean = self.mean();
        let var = self
            .data
            .iter()
            .map(|&v| (v - mean) * (v - mean))
            .sum::<f32>()
            / self.data.len() as f32;
        var.sqrt()
    }

    /// Sum along one axis.
    ///
    /// `Axis::Rows` collapses the batch dimension, which is how a broadcast bias collects its
    /// gradient.
    pub fn sum_axis(&self, axis: Axis) -> Matrix {
        match axis {
            Axis::Rows => {
                let mut out = vec![0.0_f32; self.cols];
                for r in 0..self.rows {
                    let start = r * self.cols;
                    for (acc, &v) in out.iter_mut().zip(&self.data[start..start + self.cols]) {
                        *acc += v;
                    }
                }
                Matrix {
                    rows: 1,
                    cols: self.cols,
                    data: out,
                }
            }
            Axis::Columns => {
                let data = (0..self.rows)
                    .map(|r| self.data[r * self.cols..(r + 1) * self.cols].iter().sum())
                    .collect();
                Matrix {
                    rows: self.rows,
                    cols: 1,
                    data,
                }
            }
        }
    }

    /// Column index of the largest element of each row (first index on ties).
    pub fn argmax_rows(&self) -> Vec<usize> {
        (0..self.rows)
            .map(|r| {
                let row = &self.data[r * self.cols..(r + 1) * self.cols];
                let mut best = 0;
                for (c, &v) in row.iter().enumerate().skip(1) {
                    if v > row[best] {
                        best = c;
                    }
                }
                best
            })
            .collect()
    }

    /// Logistic function `1 / (1 + e^-x)`, element-wise.
    pub fn sigmoid(&self) -> Matrix {
        self.map(sigmoid)
    }

    /// Derivative of the logistic function evaluated at `self` (the pre-activation):
    /// `s(x) * (1 - s(x))`.
    pub fn sigmoid_derivative(&self) -> Matrix {
        self.map(|x| {
            let s = sigmoid(x);
            s * (1.0 - s)
        })
    }

    pub fn tanh(&self) -> Matrix {
        self.map(f32::tanh)
    }

    /// `1 - tanh(x)^2`, evaluated at `self` (the pre-activation).
    pub fn tanh_derivative(&self) -> Matrix {
        self.map(|x| {
            let t = x.tanh();
            1.0 - t * t
        })
    }

    /// Copy of row `row` as a `1 x cols` matrix.
    pub fn row(&self, row: usize) -> Matrix {
        assert!(
            row < self.rows,
            "row {row} out of bounds for {} rows",
            self.rows
        );
        let start = row * self.cols;
        Matrix {
            rows: 1,
            cols: self.cols,
            data: self.data[start..start + self.cols].to_vec(),
        }
    }

    /// Overwrite row `row` with a `1 x cols` matrix.
    pub fn set_row(&mut self, row: usize, values: &Matrix) {
        assert!(
            row < self.rows,
            "row {row} out of bounds for {} rows",
            self.rows
        );
        assert!(
            values.rows == 1 && values.cols == self.cols,
            "set_row: values shape {:?} is not (1, {})",
            values.shape(),
            self.cols
        );
        let start = row * self.cols;
        self.data[start..start + self.cols].copy_from_slice(&values.data);
    }

    /// Copy of the contiguous rows `range`.
    pub fn rows_range(&self, range: Range<usize>) -> Matrix {
        assert!(
            range.start <= range.end && range.end <= self.rows,
            "row range {range:?} out of bounds for {} rows",
            self.rows
        );
        Matrix {
            rows: range.len(),
            cols: self.cols,
            data: self.data[range.start * self.cols..range.end * self.cols].to_vec(),
        }
    }

    /// Gather rows by index, in the given order (indices may repeat).
    pub fn select_rows(&self, indices: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &r in indices {
            assert!(r < self.rows, "row {r} out of bounds for {} rows", self.rows);
            data.extend_from_slice(&self.data[r * self.cols..(r + 1) * self.cols]);
        }
        Matrix {
            rows: indices.len(),
            cols: self.cols,
            data,
        }
    }

    /// Copy of column `col` as a `rows x 1` matrix.
    pub fn column(&self, col: usize) -> Matrix {
        self.columns_range(col..col + 1)
    }

    /// Copy of the contiguous columns `range`.
    pub fn columns_range(&self, range: Range<usize>) -> Matrix {
        assert!(
            range.start <= range.end && range.end <= self.cols,
            "column range {range:?} out of bounds for {} columns",
            self.cols
        );
        let width = range.len();
        let mut data = Vec::with_capacity(self.rows * width);
        for r in 0..self.rows {
            let start = r * self.cols;
            data.extend_from_slice(&self.data[start + range.start..start + range.end]);
        }
        Matrix {
            rows: self.rows,
            cols: width,
            data,
        }
    }

    /// In-place `self += scalar`. Reserved for dataset pre-scaling.
    pub fn add_scalar_in_place(&mut self, scalar: f32) {
        for v in &mut self.data {
            *v += scalar;
        }
    }

    /// In-place `self /= scalar`. Reserved for dataset pre-scaling.
    pub fn div_scalar_in_place(&mut self, scalar: f32) {
        for v in &mut self.data {
            *v /= scalar;
        }
    }

    /// True if every element is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        &self.data[self.offset(row, col)]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            write!(f, "[")?;
            for c in 0..self.cols {
                if c > 0 {
                    write!(f, ", ")?;
                }
                match f.precision() {
                    Some(p) => write!(f, "{:.*}", p, self.get(r, c))?,
                    None => write!(f, "{}", self.get(r, c))?,
                }
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn from_vec_validates_length() {
        assert!(Matrix::from_vec(2, 3, vec![0.0; 6]).is_ok());
        let err = Matrix::from_vec(2, 3, vec![0.0; 5]).unwrap_err();
        assert!(matches!(err, Error::InvalidShape(_)));
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(format!("{err}").contains("row 1"));
    }

    #[test]
    fn dot_has_expected_shape_and_values() {
        let a = Matrix::from_array(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let b = Matrix::from_array(&[[7.0, 8.0], [9.0, 10.0], [11.0, 12.0]]);
        let c = a.dot(&b);
        assert_eq!(c.shape(), (2, 2));
        assert_eq!(c, Matrix::from_array(&[[58.0, 64.0], [139.0, 154.0]]));
    }

    #[test]
    #[should_panic(expected = "cannot multiply")]
    fn dot_panics_on_inner_dimension_mismatch() {
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(2, 3);
        let _ = a.dot(&b);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn elementwise_ops_require_equal_shapes() {
        // Same row count, different column count: still a mismatch.
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(2, 2);
        let _ = a.hadamard(&b);
    }

    #[test]
    fn transposed_products_match_explicit_transpose() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = Matrix::random(4, 3, &mut rng);
        let b = Matrix::random(4, 2, &mut rng);
        let c = Matrix::random(5, 3, &mut rng);

        assert_eq!(a.dot_tn(&b), a.transpose().dot(&b));
        assert_eq!(a.dot_nt(&c), a.dot(&c.transpose()));
    }

    #[test]
    fn scalar_ops_and_power() {
        let a = Matrix::from_array(&[[1.0, -2.0], [3.0, 0.5]]);
        assert_eq!(
            a.add_scalar(1.0),
            Matrix::from_array(&[[2.0, -1.0], [4.0, 1.5]])
        );
        assert_eq!(a.scale(2.0), Matrix::from_array(&[[2.0, -4.0], [6.0, 1.0]]));
        assert_eq!(a.powi(2), Matrix::from_array(&[[1.0, 4.0], [9.0, 0.25]]));
    }

    #[test]
    fn add_row_broadcasts_over_every_row() {
        let a = Matrix::zeros(3, 2);
        let bias = Matrix::from_array(&[[1.0, -1.0]]);
        let out = a.add_row(&bias);
        for r in 0..3 {
            assert_eq!(out.row(r), bias);
        }
    }

    #[test]
    #[should_panic(expected = "does not broadcast")]
    fn add_row_rejects_wrong_width() {
        let _ = Matrix::zeros(3, 2).add_row(&Matrix::zeros(1, 3));
    }

    #[test]
    fn reductions() {
        let a = Matrix::from_array(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        assert_eq!(a.sum(), 21.0);
        assert_eq!(a.mean(), 3.5);
        assert_eq!(a.min(), 1.0);
        assert_eq!(a.max(), 6.0);
        assert_eq!(a.sum_axis(Axis::Rows), Matrix::from_array(&[[9.0, 12.0]]));
        assert_eq!(
            a.sum_axis(Axis::Columns),
            Matrix::from_array(&[[3.0], [7.0], [11.0]])
        );

        let b = Matrix::from_array(&[[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]]);
        assert!((b.std() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn argmax_picks_first_maximum() {
        let a = Matrix::from_array(&[[0.1, 0.7, 0.2], [3.0, 3.0, -1.0], [-5.0, -4.0, -4.5]]);
        assert_eq!(a.argmax_rows(), vec![1, 0, 1]);
    }

    #[test]
    fn sigmoid_derivative_is_evaluated_at_pre_activation() {
        let z = Matrix::from_array(&[[0.0, 2.0]]);
        let d = z.sigmoid_derivative();
        assert!((d.get(0, 0) - 0.25).abs() < 1e-6);
        let s = sigmoid(2.0);
        assert!((d.get(0, 1) - s * (1.0 - s)).abs() < 1e-6);
    }

    #[test]
    fn slicing_rows_and_columns() {
        let a = Matrix::from_array(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        assert_eq!(a.row(1), Matrix::from_array(&[[4.0, 5.0, 6.0]]));
        assert_eq!(
            a.rows_range(1..3),
            Matrix::from_array(&[[4.0, 5.0, 6.0], [7.0, 8.0, 9.0]])
        );
        assert_eq!(a.column(0), Matrix::from_array(&[[1.0], [4.0], [7.0]]));
        assert_eq!(
            a.columns_range(1..3),
            Matrix::from_array(&[[2.0, 3.0], [5.0, 6.0], [8.0, 9.0]])
        );
        assert_eq!(
            a.select_rows(&[2, 0]),
            Matrix::from_array(&[[7.0, 8.0, 9.0], [1.0, 2.0, 3.0]])
        );
        assert_eq!(a.rows_range(3..3).shape(), (0, 3));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn rows_range_is_bounds_checked() {
        let _ = Matrix::zeros(3, 1).rows_range(1..4);
    }

    #[test]
    fn set_row_overwrites_in_place() {
        let mut a = Matrix::zeros(2, 2);
        a.set_row(1, &Matrix::from_array(&[[5.0, 6.0]]));
        assert_eq!(a, Matrix::from_array(&[[0.0, 0.0], [5.0, 6.0]]));
    }

    #[test]
    fn random_is_seeded_and_in_range() {
        let a = Matrix::random(10, 10, &mut StdRng::seed_from_u64(3));
        let b = Matrix::random(10, 10, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
        assert!(a.min() >= -0.5 && a.max() < 0.5);
    }

    #[test]
    fn display_prints_one_line_per_row() {
        let a = Matrix::from_array(&[[1.0, 2.5], [3.0, 4.0]]);
        assert_eq!(format!("{a}"), "[1, 2.5]\n[3, 4]\n");
        assert_eq!(format!("{a:.1}"), "[1.0, 2.5]\n[3.0, 4.0]\n");
    }
}
