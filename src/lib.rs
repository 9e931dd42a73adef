//! Square matrix multiplication, three ways, with cache-miss counters.
//!
//! The three strategies compute the same product and differ only in how
//! they walk memory:
//!
//! - **standard** (i-j-k): dot products; B is read down its columns
//! - **line** (i-k-j): row sweeps; everything is read sequentially
//! - **block**: line order inside tiles of a chosen size
//!
//! A trial times one multiplication and brackets it with hardware counters
//! for L1, L2 and optionally L3 data-cache misses.
//!
//! ## Usage
//!
//! ```
//! use cachemat::{AlgorithmSelector, MatrixBuffer, multiply};
//!
//! let a = MatrixBuffer::ones(64).unwrap();
//! let b = MatrixBuffer::row_ramp(64).unwrap();
//!
//! let c = multiply(AlgorithmSelector::block(16).unwrap(), &a, &b).unwrap();
//! assert_eq!(c.get(10, 20), (64.0 * 65.0) / 2.0);
//! ```
//!
//! Measuring a trial, falling back to time-only if the counters are
//! unavailable:
//!
//! ```no_run
//! use cachemat::counters::{CacheCounters, CounterSet, PerformanceCounterReader};
//! use cachemat::runner::{TrialConfig, run_trial};
//! use cachemat::AlgorithmSelector;
//!
//! let mut reader = PerformanceCounterReader::open(CounterSet::L1_L2).ok();
//! let config = TrialConfig {
//!     selector: AlgorithmSelector::Line,
//!     n: 1024,
//!     counters: CounterSet::L1_L2,
//! };
//! let result = run_trial(config, reader.as_mut().map(|r| r as &mut dyn CacheCounters)).unwrap();
//! println!("{}", result.record_line());
//! ```
//!
//! For cache-isolated numbers run each trial in its own process; the
//! `cachemat sweep` command does that.

pub mod affinity;
pub mod blocked;
pub mod counters;
pub mod error;
pub mod matrix;
pub mod menu;
pub mod record;
pub mod runner;
pub mod strategy;
pub mod sweep;

pub use blocked::tiled::multiply_block;
pub use error::{BenchError, Result};
pub use matrix::MatrixBuffer;
pub use matrix::naive_ijk::multiply_standard;
pub use matrix::naive_ikj::multiply_line;
pub use runner::{BenchmarkResult, BenchmarkRunner, MissCount};
pub use strategy::{AlgorithmSelector, Strategy};

/// Matrix multiply with the chosen strategy: C = A * B.
///
/// Operands are n×n row-major buffers. C is a fresh zero-initialized buffer.
///
/// # Errors
///
/// `InvalidArgument` if A and B differ in dimension.
pub fn multiply(selector: AlgorithmSelector, a: &MatrixBuffer, b: &MatrixBuffer) -> Result<MatrixBuffer> {
    selector.multiply(a, b)
}
