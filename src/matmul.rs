//! Small GEMM kernel behind `Matrix::dot`, `Matrix::dot_tn` and `Matrix::dot_nt`.
//!
//! Operands are passed as strided views so a transposed operand is just a view with
//! swapped strides; backprop never has to materialize `transpose(x)`.
//!
//! - default: a simple, safe triple-loop implementation
//! - optional: a faster backend via the `matrixmultiply` feature

/// Read-only strided view of a row-major buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct View<'a> {
    pub data: &'a [f32],
    pub rows: usize,
    pub cols: usize,
    pub row_stride: usize,
    pub col_stride: usize,
}

impl<'a> View<'a> {
    /// Plain row-major view with shape `(rows, cols)`.
    #[inline]
    pub fn row_major(data: &'a [f32], rows: usize, cols: usize) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self {
            data,
            rows,
            cols,
            row_stride: cols,
            col_stride: 1,
        }
    }

    /// The same buffer read as its transpose, shape `(cols, rows)`.
    #[inline]
    pub fn t(self) -> Self {
        Self {
            data: self.data,
            rows: self.cols,
            cols: self.rows,
            row_stride: self.col_stride,
            col_stride: self.row_stride,
        }
    }
}

/// Computes `out = a * b`, overwriting `out` (row-major, `a.rows x b.cols`).
///
/// Callers validate `a.cols == b.rows` and the output length.
#[inline]
pub(crate) fn gemm(a: View<'_>, b: View<'_>, out: &mut [f32]) {
    debug_assert_eq!(a.cols, b.rows);
    debug_assert_eq!(out.len(), a.rows * b.cols);

    let (m, k, n) = (a.rows, a.cols, b.cols);
    if m == 0 || n == 0 {
        return;
    }
    if k == 0 {
        out.fill(0.0);
        return;
    }

    #[cfg(feature = "matrixmultiply")]
    {
        // matrixmultiply supports arbitrary strides; beta = 0 means `out` is write-only.
        unsafe {
            matrixmultiply::sgemm(
                m,
                k,
                n,
                1.0,
                a.data.as_ptr(),
                a.row_stride as isize,
                a.col_stride as isize,
                b.data.as_ptr(),
                b.row_stride as isize,
                b.col_stride as isize,
                0.0,
                out.as_mut_ptr(),
                n as isize,
                1,
            );
        }
    }

    #[cfg(not(feature = "matrixmultiply"))]
    for i in 0..m {
        let a0 = i * a.row_stride;
        let row = &mut out[i * n..(i + 1) * n];
        for (j, slot) in row.iter_mut().enumerate() {
            let b0 = j * b.col_stride;
            let mut acc = 0.0_f32;
            for p in 0..k {
                let av = a.data[a0 + p * a.col_stride];
                let bv = b.data[p * b.row_stride + b0];
                acc = av.mul_add(bv, acc);
            }
            *slot = acc;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemm_matches_hand_computed_product() {
        // [1 2 3]   [ 7  8]   [ 58  64]
        // [4 5 6] x [ 9 10] = [139 154]
        //           [11 12]
        let a = [1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = [7.0_f32, 8.0, 9.0, 10.0, 11.0, 12.0];
        let mut out = [0.0_f32; 4];
        gemm(View::row_major(&a, 2, 3), View::row_major(&b, 3, 2), &mut out);
        assert_eq!(out, [58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn transposed_view_reads_columns_as_rows() {
        // a is 3x2, a^T is 2x3; a^T * a is 2x2.
        let a = [1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let va = View::row_major(&a, 3, 2);
        let mut out = [0.0_f32; 4];
        gemm(va.t(), va, &mut out);
        // columns: c0 = [1,3,5], c1 = [2,4,6]
        assert_eq!(out, [35.0, 44.0, 44.0, 56.0]);
    }

    #[test]
    fn empty_inner_dimension_yields_zeros() {
        let a: [f32; 0] = [];
        let mut out = [1.0_f32; 4];
        gemm(View::row_major(&a, 2, 0), View::row_major(&a, 0, 2), &mut out);
        assert_eq!(out, [0.0; 4]);
    }
}
