//! One timed, counter-bracketed trial.
//!
//! A trial walks through [`TrialPhase`] in order, never skipping a phase:
//!
//! ```text
//! Idle -> Prepared -> Measuring -> Computing -> Measured -> Reported
//! ```
//!
//! The timer and counters start right before the multiplication and stop
//! right after it, so operand setup is not measured.

use std::fmt;
use std::time::Instant;

use tracing::{debug, instrument, trace, warn};

use crate::counters::{CacheCounters, CacheMisses, CounterSet};
use crate::error::{BenchError, Result};
use crate::matrix::MatrixBuffer;
use crate::strategy::AlgorithmSelector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrialPhase {
    Idle,
    Prepared,
    Measuring,
    Computing,
    Measured,
    Reported,
}

impl TrialPhase {
    fn next(self) -> Option<TrialPhase> {
        match self {
            TrialPhase::Idle => Some(TrialPhase::Prepared),
            TrialPhase::Prepared => Some(TrialPhase::Measuring),
            TrialPhase::Measuring => Some(TrialPhase::Computing),
            TrialPhase::Computing => Some(TrialPhase::Measured),
            TrialPhase::Measured => Some(TrialPhase::Reported),
            TrialPhase::Reported => None,
        }
    }
}

/// A cache-miss count, or a marker that the counter could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissCount {
    Count(u64),
    Unavailable,
}

impl MissCount {
    pub fn count(self) -> Option<u64> {
        match self {
            MissCount::Count(n) => Some(n),
            MissCount::Unavailable => None,
        }
    }
}

impl fmt::Display for MissCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissCount::Count(n) => write!(f, "{n}"),
            MissCount::Unavailable => f.write_str(crate::record::UNAVAILABLE),
        }
    }
}

/// What one trial measured.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub elapsed_seconds: f64,
    pub l1_miss: MissCount,
    pub l2_miss: MissCount,
    /// Present only when the trial asked for the L3 counter.
    pub l3_miss: Option<MissCount>,
    /// First row of C, up to 10 elements, for eyeballing correctness.
    pub preview: Vec<f64>,
}

impl BenchmarkResult {
    fn from_counts(elapsed_seconds: f64, misses: Option<CacheMisses>, set: CounterSet) -> Self {
        let to_count = |v: Option<u64>| v.map_or(MissCount::Unavailable, MissCount::Count);
        let l3_miss = set.l3.then(|| to_count(misses.and_then(|m| m.l3)));
        Self {
            elapsed_seconds,
            l1_miss: to_count(misses.map(|m| m.l1)),
            l2_miss: to_count(misses.and_then(|m| m.l2)),
            l3_miss,
            preview: Vec::new(),
        }
    }

    /// `C[0,0]`, the first element of the preview.
    pub fn checksum(&self) -> Option<f64> {
        self.preview.first().copied()
    }

    /// True when both the L1 and L2 counts were measured.
    pub fn counters_available(&self) -> bool {
        self.l1_miss != MissCount::Unavailable && self.l2_miss != MissCount::Unavailable
    }
}

/// Parameters of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialConfig {
    pub selector: AlgorithmSelector,
    pub n: usize,
    pub counters: CounterSet,
}

pub struct BenchmarkRunner {
    config: TrialConfig,
    phase: TrialPhase,
}

impl BenchmarkRunner {
    pub fn new(config: TrialConfig) -> Self {
        Self {
            config,
            phase: TrialPhase::Idle,
        }
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    /// Runs the trial.
    ///
    /// `counters` is `None` when the reader could not be opened; the trial
    /// then reports wall-clock time only. Counter failures during the trial
    /// degrade the same way.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` or `AllocationError` from building the operands or
    /// from the multiplication. No result is produced in that case.
    pub fn run(
        &mut self,
        mut counters: Option<&mut (dyn CacheCounters + '_)>,
    ) -> Result<BenchmarkResult> {
        let TrialConfig { selector, n, counters: set } = self.config;
        debug!(%selector, n, "starting trial");

        let a = MatrixBuffer::ones(n)?;
        let b = MatrixBuffer::row_ramp(n)?;
        let mut c = MatrixBuffer::new(n)?;
        self.advance(TrialPhase::Prepared);

        if counters.is_none() {
            debug!("no counters, measuring time only");
        }
        // Nothing between start() and stop() may allocate or log.
        self.advance(TrialPhase::Measuring);
        if let Some(counters_ref) = counters.as_deref_mut() {
            if let Err(e) = counters_ref.start() {
                degrade(&mut counters, e)?;
            }
        }

        self.advance(TrialPhase::Computing);
        let start = Instant::now();
        let product = selector.multiply_into(&a, &b, &mut c);
        let elapsed = start.elapsed();

        if let Some(counters_ref) = counters.as_deref_mut() {
            if let Err(e) = counters_ref.stop() {
                degrade(&mut counters, e)?;
            }
        }
        product?;
        self.advance(TrialPhase::Measured);

        let misses = match counters.as_deref().map(|reader| reader.read()) {
            Some(Ok(misses)) => Some(misses),
            Some(Err(e)) => {
                degrade(&mut counters, e)?;
                None
            }
            None => None,
        };

        let mut result = BenchmarkResult::from_counts(elapsed.as_secs_f64(), misses, set);
        result.preview = c.row(0).iter().take(10).copied().collect();
        self.advance(TrialPhase::Reported);

        trace!(phase = ?self.phase, "trial phases complete");
        debug!(
            elapsed = result.elapsed_seconds,
            l1 = %result.l1_miss,
            l2 = %result.l2_miss,
            "trial finished"
        );
        Ok(result)
    }

    // No logging: this runs inside the counted window.
    fn advance(&mut self, to: TrialPhase) {
        debug_assert_eq!(self.phase.next(), Some(to), "trial phase skipped");
        self.phase = to;
    }
}

/// Drops the counters after a recoverable failure; passes anything else up.
fn degrade(counters: &mut Option<&mut (dyn CacheCounters + '_)>, err: BenchError) -> Result<()> {
    if !err.is_recoverable() {
        return Err(err);
    }
    warn!(error = %err, "hardware counters failed, measuring time only");
    *counters = None;
    Ok(())
}

/// Runs a single trial with a fresh runner.
#[instrument(level = "debug", skip(counters))]
pub fn run_trial(
    config: TrialConfig,
    counters: Option<&mut (dyn CacheCounters + '_)>,
) -> Result<BenchmarkResult> {
    BenchmarkRunner::new(config).run(counters)
}
