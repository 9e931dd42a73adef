//! Allocation accounting around the counted window of a trial.
//!
//! Kept in its own test binary: it installs a global allocator.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use cachemat::counters::{CacheCounters, CacheMisses, CounterSet};
use cachemat::runner::{TrialConfig, run_trial};
use cachemat::{AlgorithmSelector, Result};

struct CountingAllocator;

thread_local! {
    static ALLOCATED: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOCATED.with(|bytes| bytes.set(bytes.get() + layout.size()));
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        ALLOCATED.with(|bytes| bytes.set(bytes.get() + layout.size()));
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        ALLOCATED.with(|bytes| bytes.set(bytes.get() + new_size));
        unsafe { System.realloc(ptr, layout, new_size) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

fn allocated_on_this_thread() -> usize {
    ALLOCATED.with(Cell::get)
}

/// Records the allocation counter when the window opens and closes.
#[derive(Default)]
struct WindowCounters {
    at_start: Option<usize>,
    at_stop: Option<usize>,
}

impl CacheCounters for WindowCounters {
    fn start(&mut self) -> Result<()> {
        self.at_start = Some(allocated_on_this_thread());
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.at_stop = Some(allocated_on_this_thread());
        Ok(())
    }

    fn read(&self) -> Result<CacheMisses> {
        Ok(CacheMisses::default())
    }
}

#[test]
fn test_nothing_allocated_while_counting() {
    let n = 256;
    for selector in [
        AlgorithmSelector::Standard,
        AlgorithmSelector::Line,
        AlgorithmSelector::block(64).unwrap(),
    ] {
        let mut counters = WindowCounters::default();
        let config = TrialConfig {
            selector,
            n,
            counters: CounterSet::L1_L2,
        };
        let before = allocated_on_this_thread();
        let result = run_trial(config, Some(&mut counters)).unwrap();

        let start = counters.at_start.unwrap();
        let stop = counters.at_stop.unwrap();
        // A, B and C are all built before the window opens
        assert!(start - before >= 3 * n * n * size_of::<f64>(), "{selector}");
        assert_eq!(stop - start, 0, "{selector}: bytes allocated while counting");
        assert_eq!(result.checksum(), Some((n * (n + 1) / 2) as f64));
    }
}
