//! Strategy selection and dispatch.

use std::fmt;
use std::num::NonZeroUsize;

use clap::ValueEnum;

use crate::blocked::tiled::{matmul_tiled_ikj, multiply_block};
use crate::error::{Result, invalid_argument};
use crate::matrix::naive_ijk::{matmul_naive_ijk, multiply_standard};
use crate::matrix::naive_ikj::{matmul_naive_ikj, multiply_line};
use crate::matrix::{MatrixBuffer, shared_dimension};

/// Which loop structure to use, without parameters.
///
/// The numeric aliases are the codes of the interactive menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Strategy {
    #[value(alias = "1")]
    Standard,
    #[value(alias = "2")]
    Line,
    #[value(alias = "3")]
    Block,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Standard, Strategy::Line, Strategy::Block];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Standard => "standard",
            Strategy::Line => "line",
            Strategy::Block => "block",
        }
    }

    /// Maps a menu code (1, 2, 3) to a strategy.
    pub fn from_menu_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Strategy::Standard),
            2 => Some(Strategy::Line),
            3 => Some(Strategy::Block),
            _ => None,
        }
    }

    /// Attaches the block size. Required for `Block`, ignored otherwise.
    pub fn select(self, block_size: Option<usize>) -> Result<AlgorithmSelector> {
        match self {
            Strategy::Standard => Ok(AlgorithmSelector::Standard),
            Strategy::Line => Ok(AlgorithmSelector::Line),
            Strategy::Block => {
                let block_size = block_size
                    .ok_or_else(|| invalid_argument("block strategy requires a block size"))?;
                AlgorithmSelector::block(block_size)
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully parameterized strategy, ready to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmSelector {
    /// i-j-k dot products.
    Standard,
    /// i-k-j row sweeps.
    Line,
    /// i-k-j within tiles of `block_size`.
    Block { block_size: NonZeroUsize },
}

impl AlgorithmSelector {
    pub fn block(block_size: usize) -> Result<Self> {
        NonZeroUsize::new(block_size)
            .map(|block_size| AlgorithmSelector::Block { block_size })
            .ok_or_else(|| invalid_argument("block size must be at least 1"))
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            AlgorithmSelector::Standard => Strategy::Standard,
            AlgorithmSelector::Line => Strategy::Line,
            AlgorithmSelector::Block { .. } => Strategy::Block,
        }
    }

    pub fn block_size(&self) -> Option<usize> {
        match self {
            AlgorithmSelector::Block { block_size } => Some(block_size.get()),
            _ => None,
        }
    }

    /// Computes A × B with this strategy into a fresh, zero-initialized buffer.
    pub fn multiply(&self, a: &MatrixBuffer, b: &MatrixBuffer) -> Result<MatrixBuffer> {
        match self {
            AlgorithmSelector::Standard => multiply_standard(a, b),
            AlgorithmSelector::Line => multiply_line(a, b),
            AlgorithmSelector::Block { block_size } => multiply_block(a, b, block_size.get()),
        }
    }

    /// Computes A × B into a caller-provided `c` without allocating.
    ///
    /// `c` must be zero-filled, as [`MatrixBuffer::new`] returns it: the line
    /// and block kernels accumulate into it.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if A, B and C differ in dimension.
    pub fn multiply_into(&self, a: &MatrixBuffer, b: &MatrixBuffer, c: &mut MatrixBuffer) -> Result<()> {
        let n = shared_dimension(a, b)?;
        if c.n() != n {
            return Err(invalid_argument(format!(
                "dimension mismatch: operands are {0}x{0}, C is {1}x{1}",
                n,
                c.n()
            )));
        }

        let (a, b) = (a.as_slice(), b.as_slice());
        match self {
            AlgorithmSelector::Standard => matmul_naive_ijk(a, b, c.as_mut_slice(), n),
            AlgorithmSelector::Line => matmul_naive_ikj(a, b, c.as_mut_slice(), n),
            AlgorithmSelector::Block { block_size } => {
                matmul_tiled_ikj(a, b, c.as_mut_slice(), n, block_size.get())
            }
        }
        Ok(())
    }
}

impl fmt::Display for AlgorithmSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmSelector::Block { block_size } => write!(f, "block({block_size})"),
            other => f.write_str(other.strategy().name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;

    #[test]
    fn test_select_requires_block_size() {
        assert_eq!(Strategy::Line.select(None).unwrap(), AlgorithmSelector::Line);
        assert_eq!(
            Strategy::Standard.select(Some(64)).unwrap(),
            AlgorithmSelector::Standard
        );
        assert!(matches!(
            Strategy::Block.select(None),
            Err(BenchError::InvalidArgument { .. })
        ));
        assert!(matches!(
            Strategy::Block.select(Some(0)),
            Err(BenchError::InvalidArgument { .. })
        ));
        assert_eq!(Strategy::Block.select(Some(32)).unwrap().block_size(), Some(32));
    }

    #[test]
    fn test_menu_codes_and_aliases() {
        assert_eq!(Strategy::from_menu_code(1), Some(Strategy::Standard));
        assert_eq!(Strategy::from_menu_code(3), Some(Strategy::Block));
        assert_eq!(Strategy::from_menu_code(0), None);

        assert_eq!(Strategy::from_str("2", true).unwrap(), Strategy::Line);
        assert_eq!(Strategy::from_str("block", true).unwrap(), Strategy::Block);
    }

    #[test]
    fn test_display() {
        assert_eq!(AlgorithmSelector::Line.to_string(), "line");
        assert_eq!(AlgorithmSelector::block(16).unwrap().to_string(), "block(16)");
    }

    #[test]
    fn test_dispatch_rejects_mismatched_operands() {
        let a = MatrixBuffer::ones(2).unwrap();
        let b = MatrixBuffer::ones(3).unwrap();
        for selector in [
            AlgorithmSelector::Standard,
            AlgorithmSelector::Line,
            AlgorithmSelector::block(2).unwrap(),
        ] {
            assert!(matches!(
                selector.multiply(&a, &b),
                Err(BenchError::InvalidArgument { .. })
            ));
        }
    }

    #[test]
    fn test_multiply_into_matches_multiply() {
        let a = MatrixBuffer::ones(6).unwrap();
        let b = MatrixBuffer::row_ramp(6).unwrap();
        for selector in [
            AlgorithmSelector::Standard,
            AlgorithmSelector::Line,
            AlgorithmSelector::block(4).unwrap(),
        ] {
            let mut c = MatrixBuffer::new(6).unwrap();
            selector.multiply_into(&a, &b, &mut c).unwrap();
            assert_eq!(c, selector.multiply(&a, &b).unwrap(), "{selector}");
        }
    }

    #[test]
    fn test_multiply_into_rejects_wrong_output_size() {
        let a = MatrixBuffer::ones(3).unwrap();
        let mut c = MatrixBuffer::new(4).unwrap();
        assert!(matches!(
            AlgorithmSelector::Line.multiply_into(&a, &a, &mut c),
            Err(BenchError::InvalidArgument { .. })
        ));
        assert!(c.as_slice().iter().all(|&x| x == 0.0));
    }
}
