use super::{CacheMisses, CounterSet};
use crate::error::{Result, counter_unavailable};

/// No counter backend on this platform; `open` always fails.
pub(super) enum Handles {}

impl Handles {
    pub(super) fn open(_set: CounterSet) -> Result<Self> {
        Err(counter_unavailable(
            "perf",
            "hardware counters are only supported on Linux",
        ))
    }

    pub(super) fn reset_and_enable(&self) -> Result<()> {
        match *self {}
    }

    pub(super) fn disable(&self) -> Result<()> {
        match *self {}
    }

    pub(super) fn read(&self) -> Result<CacheMisses> {
        match *self {}
    }
}
