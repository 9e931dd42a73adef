use super::{MatrixBuffer, shared_dimension};
use crate::error::Result;

/// Line-by-line matrix multiplication using i-k-j loop order.
///
/// Swapping the j and k loops fixes a single scalar `A[i][k]` and sweeps it
/// across row k of B into row i of C. Both of those are sequential (stride
/// 1), so the strided column walk of [`multiply_standard`] disappears.
///
/// Each output cell is accumulated into `n` times, once per k, so the
/// result buffer starts zeroed. A fresh buffer is allocated on every call.
///
/// [`multiply_standard`]: super::naive_ijk::multiply_standard
///
/// # Errors
///
/// `InvalidArgument` if A and B differ in dimension.
pub fn multiply_line(a: &MatrixBuffer, b: &MatrixBuffer) -> Result<MatrixBuffer> {
    let n = shared_dimension(a, b)?;
    let mut c = MatrixBuffer::new(n)?;
    matmul_naive_ikj(a.as_slice(), b.as_slice(), c.as_mut_slice(), n);
    Ok(c)
}

/// Slice kernel behind [`multiply_line`]: C += A * B.
///
/// `c` is accumulated into, not overwritten. Zero it before the call to get
/// a plain product.
///
/// # Arguments
///
/// * `a` - Matrix A (n × n), row-major
/// * `b` - Matrix B (n × n), row-major
/// * `c` - Matrix C (n × n), row-major, accumulated into
/// * `n` - Dimension of all three matrices
pub fn matmul_naive_ikj(a: &[f64], b: &[f64], c: &mut [f64], n: usize) {
    debug_assert!(a.len() == n * n && b.len() == n * n && c.len() == n * n);

    for (a_row, c_row) in a.chunks_exact(n).zip(c.chunks_exact_mut(n)) {
        for (k, &a_ik) in a_row.iter().enumerate() {
            let b_row = &b[k * n..(k + 1) * n];
            for (c_ij, &b_kj) in c_row.iter_mut().zip(b_row) {
                *c_ij += a_ik * b_kj;
            }
        }
    }
}
