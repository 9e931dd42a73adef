//! Square matrix storage and the two unblocked multiplication strategies.
//!
//! `MatrixBuffer` is the only matrix type in the crate: a flat row-major
//! `Vec<f64>` of exactly `n * n` elements. The strategies in `naive_ijk`
//! and `naive_ikj` work on these buffers (or on raw slices through their
//! kernel functions).

pub mod naive_ijk;
pub mod naive_ikj;

use crate::error::{Result, allocation_error, invalid_argument};

/// Owned N×N matrix of `f64`, row-major: element (i, j) lives at `i * n + j`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixBuffer {
    n: usize,
    data: Vec<f64>,
}

impl MatrixBuffer {
    /// Allocates an n×n matrix with every element set to 0.0.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` if `n == 0`
    /// * `AllocationError` if `n * n` doubles cannot be addressed or the
    ///   allocator refuses the request
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(invalid_argument("matrix dimension must be at least 1"));
        }

        let len = n
            .checked_mul(n)
            .ok_or_else(|| allocation_error(usize::MAX, format!("{n}x{n} overflows usize")))?;
        let bytes = len
            .checked_mul(size_of::<f64>())
            .filter(|&bytes| bytes <= isize::MAX as usize)
            .ok_or_else(|| {
                allocation_error(usize::MAX, format!("{n}x{n} doubles exceed the address space"))
            })?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| allocation_error(bytes, e.to_string()))?;
        data.resize(len, 0.0);

        Ok(Self { n, data })
    }

    /// Wraps an existing row-major vector. `data.len()` must be `n * n`.
    pub fn from_vec(n: usize, data: Vec<f64>) -> Result<Self> {
        if n == 0 {
            return Err(invalid_argument("matrix dimension must be at least 1"));
        }
        if n.checked_mul(n) != Some(data.len()) {
            return Err(invalid_argument(format!(
                "expected {n}x{n}={} elements, got {}",
                n.saturating_mul(n),
                data.len()
            )));
        }
        Ok(Self { n, data })
    }

    /// Left operand used by the benchmark: every element is 1.0.
    pub fn ones(n: usize) -> Result<Self> {
        let mut m = Self::new(n)?;
        m.fill(|_, _| 1.0);
        Ok(m)
    }

    /// Right operand used by the benchmark: row k holds `k + 1.0` in every column.
    ///
    /// With `ones(n)` on the left, every cell of the product is `n(n+1)/2`.
    pub fn row_ramp(n: usize) -> Result<Self> {
        let mut m = Self::new(n)?;
        m.fill(|row, _| row as f64 + 1.0);
        Ok(m)
    }

    /// Sets every element from a function of (row, col).
    pub fn fill<F>(&mut self, mut generator: F)
    where
        F: FnMut(usize, usize) -> f64,
    {
        for (i, row) in self.data.chunks_exact_mut(self.n).enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = generator(i, j);
            }
        }
    }

    /// Resets every element to 0.0 so the buffer can be reused as an accumulator.
    pub fn zero(&mut self) {
        self.data.fill(0.0);
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Element (i, j).
    ///
    /// The (i, j) bounds are asserted in debug builds only. Release builds
    /// index the flat buffer directly, so an out-of-range `j` reads from the
    /// next row and only an index past `n * n` panics.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        debug_assert!(i < self.n && j < self.n, "({i}, {j}) out of bounds for {0}x{0}", self.n);
        self.data[i * self.n + j]
    }

    /// Sets element (i, j). Bounds as for [`get`](Self::get).
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        debug_assert!(i < self.n && j < self.n, "({i}, {j}) out of bounds for {0}x{0}", self.n);
        self.data[i * self.n + j] = value;
    }

    /// Element access without the bounds check in release builds.
    ///
    /// # Safety
    ///
    /// Caller must ensure `i < n` and `j < n`. Debug builds assert it.
    pub unsafe fn get_unchecked(&self, i: usize, j: usize) -> f64 {
        debug_assert!(i < self.n && j < self.n);
        // SAFETY: i, j < n and data.len() == n * n
        unsafe { *self.data.get_unchecked(i * self.n + j) }
    }

    /// Row `i` as a slice of length `n`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }
}

/// Returns the shared dimension of two operands, or `InvalidArgument`.
pub(crate) fn shared_dimension(a: &MatrixBuffer, b: &MatrixBuffer) -> Result<usize> {
    if a.n != b.n {
        return Err(invalid_argument(format!(
            "dimension mismatch: A is {0}x{0}, B is {1}x{1}",
            a.n, b.n
        )));
    }
    Ok(a.n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;

    #[test]
    fn test_new_is_zeroed() {
        let m = MatrixBuffer::new(4).unwrap();
        assert_eq!(m.n(), 4);
        assert_eq!(m.as_slice().len(), 16);
        assert!(m.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            MatrixBuffer::new(0),
            Err(BenchError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_huge_dimension_is_allocation_error() {
        // n * n overflows usize
        assert!(matches!(
            MatrixBuffer::new(usize::MAX),
            Err(BenchError::AllocationError { .. })
        ));
        // n * n fits but n * n * 8 bytes does not
        let n = 1usize << (usize::BITS / 2 - 1);
        assert!(matches!(
            MatrixBuffer::new(n),
            Err(BenchError::AllocationError { .. })
        ));
    }

    #[test]
    fn test_canonical_generators() {
        let a = MatrixBuffer::ones(3).unwrap();
        assert!(a.as_slice().iter().all(|&x| x == 1.0));

        let b = MatrixBuffer::row_ramp(3).unwrap();
        assert_eq!(b.row(0), &[1.0, 1.0, 1.0]);
        assert_eq!(b.row(1), &[2.0, 2.0, 2.0]);
        assert_eq!(b.row(2), &[3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_row_major_layout() {
        let mut m = MatrixBuffer::new(3).unwrap();
        m.fill(|i, j| (i * 10 + j) as f64);
        assert_eq!(m.as_slice()[1 * 3 + 2], 12.0);
        assert_eq!(m.get(2, 1), 21.0);
        assert_eq!(unsafe { m.get_unchecked(2, 1) }, 21.0);

        m.set(0, 0, -1.0);
        assert_eq!(m.as_slice()[0], -1.0);

        m.zero();
        assert!(m.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(MatrixBuffer::from_vec(2, vec![1.0; 4]).is_ok());
        assert!(matches!(
            MatrixBuffer::from_vec(2, vec![1.0; 5]),
            Err(BenchError::InvalidArgument { .. })
        ));
    }

    #[test]
    #[should_panic]
    fn test_get_past_the_buffer_panics() {
        let m = MatrixBuffer::new(2).unwrap();
        m.get(2, 0);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_column_out_of_bounds_caught_in_debug() {
        // flat index 2 is in the buffer; only the (i, j) check catches it
        let m = MatrixBuffer::new(2).unwrap();
        m.get(0, 2);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_column_overflow_unchecked_in_release() {
        let mut m = MatrixBuffer::new(2).unwrap();
        m.set(1, 0, 7.0);
        assert_eq!(m.get(0, 2), 7.0);
    }
}
