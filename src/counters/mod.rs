//! Hardware cache-miss counters.
//!
//! [`PerformanceCounterReader`] opens L1 data-cache misses, L2 misses and,
//! when asked, L3 misses. L2 is optional per host: without a named L2 event
//! it reads as `None` rather than borrowing some other cache level. It brackets a computation with
//! [`CacheCounters::start`] and [`CacheCounters::stop`].
//!
//! On Linux the counters come from `perf_event_open(2)`. They need
//! `perf_event_paranoid <= 2` (or `CAP_PERFMON`) and a PMU that exposes the
//! events, which rules out most containers and VMs. Anywhere else `open`
//! fails with `CounterUnavailable`. Callers are expected to carry on without
//! counters rather than abort.
//!
//! Counts are per-thread and sensitive to core migration. Pinning is the
//! caller's job (see [`crate::affinity`]).

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
use linux as imp;

#[cfg(not(target_os = "linux"))]
mod unsupported;
#[cfg(not(target_os = "linux"))]
use unsupported as imp;

use tracing::debug;

use crate::error::Result;

/// Which counters to open. L1 and L2 are always included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSet {
    pub l3: bool,
}

impl CounterSet {
    pub const L1_L2: CounterSet = CounterSet { l3: false };
    pub const L1_L2_L3: CounterSet = CounterSet { l3: true };
}

/// Miss counts accumulated between `start` and `stop`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMisses {
    pub l1: u64,
    /// `None` when the PMU exposes no L2 miss event.
    pub l2: Option<u64>,
    /// `None` when the L3 counter was not requested.
    pub l3: Option<u64>,
}

/// Anything that can bracket a computation and report cache misses.
///
/// `start` resets and enables, `stop` disables, and `read` returns what was
/// counted in between. Calling `start`/`stop` again in pairs is allowed.
pub trait CacheCounters {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn read(&self) -> Result<CacheMisses>;
}

/// Handles for the L1/L2/(L3) miss counters of the calling thread.
pub struct PerformanceCounterReader {
    handles: imp::Handles,
    set: CounterSet,
    running: bool,
}

impl PerformanceCounterReader {
    /// Acquires the counters in `set`.
    ///
    /// # Errors
    ///
    /// `CounterUnavailable` if any requested counter cannot be opened
    /// (insufficient privilege, no PMU, unsupported OS). Counters opened
    /// before the failure are released.
    pub fn open(set: CounterSet) -> Result<Self> {
        let handles = imp::Handles::open(set)?;
        debug!(l3 = set.l3, "opened cache-miss counters");
        Ok(Self {
            handles,
            set,
            running: false,
        })
    }

    pub fn counter_set(&self) -> CounterSet {
        self.set
    }
}

impl CacheCounters for PerformanceCounterReader {
    fn start(&mut self) -> Result<()> {
        self.handles.reset_and_enable()?;
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        self.handles.disable()?;
        self.running = false;
        Ok(())
    }

    fn read(&self) -> Result<CacheMisses> {
        self.handles.read()
    }
}
