//! Tiled i-k-j multiplication.

use std::num::NonZeroUsize;

use crate::error::{Result, invalid_argument};
use crate::matrix::{MatrixBuffer, shared_dimension};

/// Cache-blocked matrix multiplication.
///
/// Splits all three loop dimensions (i, j, k) into tiles of `block_size`
/// and runs the i-k-j inner loop on one tile triple at a time. With a block
/// size chosen so three tiles fit in cache, each A/B/C tile is reused from
/// cache instead of being streamed from memory once per row.
///
/// `block_size` does not have to divide `n`: the last tile in each dimension
/// is clipped to `n % block_size`. A `block_size >= n` collapses to a single
/// tile, which is [`multiply_line`].
///
/// [`multiply_line`]: crate::matrix::naive_ikj::multiply_line
///
/// # Errors
///
/// `InvalidArgument` if A and B differ in dimension or `block_size == 0`.
pub fn multiply_block(a: &MatrixBuffer, b: &MatrixBuffer, block_size: usize) -> Result<MatrixBuffer> {
    let block_size = NonZeroUsize::new(block_size)
        .ok_or_else(|| invalid_argument("block size must be at least 1"))?;
    let n = shared_dimension(a, b)?;
    let mut c = MatrixBuffer::new(n)?;
    matmul_tiled_ikj(a.as_slice(), b.as_slice(), c.as_mut_slice(), n, block_size.get());
    Ok(c)
}

/// Slice kernel behind [`multiply_block`]: C += A * B, tiled.
///
/// # Arguments
///
/// * `a` - Matrix A (n × n), row-major
/// * `b` - Matrix B (n × n), row-major
/// * `c` - Matrix C (n × n), row-major, accumulated into
/// * `n` - Dimension of all three matrices
/// * `bs` - Tile side, must be non-zero
pub fn matmul_tiled_ikj(a: &[f64], b: &[f64], c: &mut [f64], n: usize, bs: usize) {
    debug_assert!(a.len() == n * n && b.len() == n * n && c.len() == n * n);
    debug_assert!(bs > 0);

    for ii in (0..n).step_by(bs) {
        let i_max = (ii + bs).min(n);
        for jj in (0..n).step_by(bs) {
            let j_max = (jj + bs).min(n);
            for kk in (0..n).step_by(bs) {
                let k_max = (kk + bs).min(n);

                // One tile triple: same loop order as the line strategy,
                // restricted to [ii, i_max) x [kk, k_max) x [jj, j_max)
                for i in ii..i_max {
                    let c_tile = &mut c[i * n + jj..i * n + j_max];
                    for k in kk..k_max {
                        let a_ik = a[i * n + k];
                        let b_tile = &b[k * n + jj..k * n + j_max];
                        for (c_ij, &b_kj) in c_tile.iter_mut().zip(b_tile) {
                            *c_ij += a_ik * b_kj;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;
    use crate::matrix::naive_ikj::multiply_line;

    #[test]
    fn test_partial_tiles() {
        // 10 = 4 + 4 + 2
        let n = 10;
        let a = MatrixBuffer::ones(n).unwrap();
        let b = MatrixBuffer::row_ramp(n).unwrap();
        let c = multiply_block(&a, &b, 4).unwrap();
        assert!(c.as_slice().iter().all(|&x| x == 55.0));
    }

    #[test]
    fn test_single_tile_matches_line() {
        let n = 7;
        let mut a = MatrixBuffer::new(n).unwrap();
        let mut b = MatrixBuffer::new(n).unwrap();
        a.fill(|i, j| ((i * 7 + j) % 5) as f64 - 2.0);
        b.fill(|i, j| ((i + 3 * j) % 11) as f64 * 0.5);

        let line = multiply_line(&a, &b).unwrap();
        for bs in [7, 8, 100] {
            let block = multiply_block(&a, &b, bs).unwrap();
            assert_eq!(block, line, "block_size {bs}");
        }
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let a = MatrixBuffer::ones(2).unwrap();
        let b = MatrixBuffer::ones(2).unwrap();
        assert!(matches!(
            multiply_block(&a, &b, 0),
            Err(BenchError::InvalidArgument { .. })
        ));
    }
}
