use super::{MatrixBuffer, shared_dimension};
use crate::error::Result;

/// Standard matrix multiplication using i-j-k loop order.
///
/// This is the textbook triple loop. Each output cell is a dot product of
/// row i of A and column j of B, so the innermost loop walks B with stride
/// `n`, touching a new cache line on nearly every iteration once `n` is
/// large. That strided access is the point: this is the baseline the other
/// strategies are measured against.
///
/// # Errors
///
/// `InvalidArgument` if A and B differ in dimension.
pub fn multiply_standard(a: &MatrixBuffer, b: &MatrixBuffer) -> Result<MatrixBuffer> {
    let n = shared_dimension(a, b)?;
    let mut c = MatrixBuffer::new(n)?;
    matmul_naive_ijk(a.as_slice(), b.as_slice(), c.as_mut_slice(), n);
    Ok(c)
}

/// Slice kernel behind [`multiply_standard`].
///
/// Every cell of `c` is overwritten (C = A * B), so `c` does not need to be
/// zeroed first.
///
/// # Arguments
///
/// * `a` - Matrix A (n × n), row-major
/// * `b` - Matrix B (n × n), row-major
/// * `c` - Matrix C (n × n), row-major, overwritten
/// * `n` - Dimension of all three matrices
pub fn matmul_naive_ijk(a: &[f64], b: &[f64], c: &mut [f64], n: usize) {
    debug_assert!(a.len() == n * n && b.len() == n * n && c.len() == n * n);

    for i in 0..n {
        let a_row = &a[i * n..(i + 1) * n];
        for j in 0..n {
            let mut temp = 0.0;
            for k in 0..n {
                temp += a_row[k] * b[k * n + j];
            }
            c[i * n + j] = temp;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_2x2() {
        let a = MatrixBuffer::from_vec(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = MatrixBuffer::from_vec(2, vec![5.0, 6.0, 7.0, 8.0]).unwrap();
        let c = multiply_standard(&a, &b).unwrap();
        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_kernel_overwrites_output() {
        let a = vec![1.0; 4];
        let b = vec![2.0; 4];
        let mut c = vec![100.0; 4];
        matmul_naive_ijk(&a, &b, &mut c, 2);
        assert_eq!(c, vec![4.0; 4]);
    }
}
