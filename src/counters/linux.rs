//! `perf_event_open(2)` backend.

use std::fs;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::path::Path;

use tracing::{debug, trace, warn};

use super::{CacheMisses, CounterSet};
use crate::error::{Result, counter_unavailable};

// Architecture-specific PMU event names, tried in order. L3 falls back to
// the generic last-level cache event; L2 has no generic equivalent.
const L2_EVENTS: &[&str] = &[
    "l2d_cache_refill",
    "l2_rqsts.miss",
    "l2_cache_refill",
    "l2d_cache_lmiss_rd",
];
const L3_EVENTS: &[&str] = &["l3d_cache_refill", "l3_cache_refill", "llc_misses"];

pub(super) struct Handles {
    l1: OwnedFd,
    /// `None` when the PMU exposes no L2 miss event.
    l2: Option<OwnedFd>,
    l3: Option<OwnedFd>,
}

impl Handles {
    pub(super) fn open(set: CounterSet) -> Result<Self> {
        let base = PerfEventAttr::new();

        let l1 = open_hw_cache_event(&base, PERF_COUNT_HW_CACHE_L1D)
            .map_err(|e| counter_unavailable("L1D", e.to_string()))?;
        let l2 = open_first_named(L2_EVENTS, &base, load_pmu_event_spec, perf_event_open);
        if l2.is_none() {
            warn!("no L2 miss event exposed by this PMU, L2 reported as unavailable");
        }
        let l3 = if set.l3 {
            let fd = match open_first_named(L3_EVENTS, &base, load_pmu_event_spec, perf_event_open) {
                Some(fd) => fd,
                None => open_hw_cache_event(&base, PERF_COUNT_HW_CACHE_LL)
                    .map_err(|e| counter_unavailable("L3", e.to_string()))?,
            };
            Some(fd)
        } else {
            None
        };

        Ok(Self { l1, l2, l3 })
    }

    fn fds(&self) -> impl Iterator<Item = &OwnedFd> {
        [Some(&self.l1), self.l2.as_ref(), self.l3.as_ref()]
            .into_iter()
            .flatten()
    }

    pub(super) fn reset_and_enable(&self) -> Result<()> {
        for fd in self.fds() {
            perf_ioctl(fd, PERF_EVENT_IOC_RESET)?;
            perf_ioctl(fd, PERF_EVENT_IOC_ENABLE)?;
        }
        Ok(())
    }

    pub(super) fn disable(&self) -> Result<()> {
        for fd in self.fds() {
            perf_ioctl(fd, PERF_EVENT_IOC_DISABLE)?;
        }
        Ok(())
    }

    pub(super) fn read(&self) -> Result<CacheMisses> {
        Ok(CacheMisses {
            l1: read_scaled_counter(&self.l1)?,
            l2: self.l2.as_ref().map(read_scaled_counter).transpose()?,
            l3: self.l3.as_ref().map(read_scaled_counter).transpose()?,
        })
    }
}

/// Kernel `struct perf_event_attr`, truncated at `PERF_ATTR_SIZE_VER1`.
#[repr(C)]
#[derive(Clone, Copy)]
struct PerfEventAttr {
    type_: u32,
    size: u32,
    config: u64,
    sample_period_or_freq: u64,
    sample_type: u64,
    read_format: u64,
    flags: u64,
    wakeup_events: u32,
    bp_type: u32,
    config1: u64,
    config2: u64,
}

impl PerfEventAttr {
    fn new() -> Self {
        Self {
            type_: 0,
            size: size_of::<Self>() as u32,
            config: 0,
            sample_period_or_freq: 0,
            sample_type: 0,
            read_format: PERF_FORMAT_TOTAL_TIME_ENABLED | PERF_FORMAT_TOTAL_TIME_RUNNING,
            flags: PERF_ATTR_FLAG_DISABLED | PERF_ATTR_FLAG_EXCLUDE_KERNEL | PERF_ATTR_FLAG_EXCLUDE_HV,
            wakeup_events: 0,
            bp_type: 0,
            config1: 0,
            config2: 0,
        }
    }
}

// See perf_event_open(2)
const PERF_TYPE_HW_CACHE: u32 = 3;

const PERF_COUNT_HW_CACHE_L1D: u64 = 0;
const PERF_COUNT_HW_CACHE_LL: u64 = 2;
const PERF_COUNT_HW_CACHE_OP_READ: u64 = 0;
const PERF_COUNT_HW_CACHE_RESULT_MISS: u64 = 1;

const PERF_FORMAT_TOTAL_TIME_ENABLED: u64 = 1 << 0;
const PERF_FORMAT_TOTAL_TIME_RUNNING: u64 = 1 << 1;

const PERF_ATTR_FLAG_DISABLED: u64 = 1 << 0;
const PERF_ATTR_FLAG_EXCLUDE_KERNEL: u64 = 1 << 5;
const PERF_ATTR_FLAG_EXCLUDE_HV: u64 = 1 << 6;

const PERF_FLAG_FD_CLOEXEC: libc::c_ulong = 1 << 3;

// _IO('$', nr)
const PERF_EVENT_IOC_ENABLE: libc::c_ulong = 0x2400;
const PERF_EVENT_IOC_DISABLE: libc::c_ulong = 0x2401;
const PERF_EVENT_IOC_RESET: libc::c_ulong = 0x2403;

fn perf_event_open(attr: &PerfEventAttr) -> io::Result<OwnedFd> {
    // SAFETY: attr is a valid perf_event_attr with a correct size field
    let ret = unsafe {
        libc::syscall(
            libc::SYS_perf_event_open,
            attr as *const PerfEventAttr,
            0 as libc::pid_t,
            -1 as libc::c_int,
            -1 as libc::c_int,
            PERF_FLAG_FD_CLOEXEC,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: a non-negative return is a fresh fd owned by us
    Ok(unsafe { OwnedFd::from_raw_fd(ret as RawFd) })
}

fn open_hw_cache_event(base: &PerfEventAttr, cache: u64) -> io::Result<OwnedFd> {
    let mut attr = *base;
    attr.type_ = PERF_TYPE_HW_CACHE;
    attr.config =
        cache | (PERF_COUNT_HW_CACHE_OP_READ << 8) | (PERF_COUNT_HW_CACHE_RESULT_MISS << 16);
    perf_event_open(&attr)
}

/// Opens the first of `names` that resolves to a PMU event and that the
/// kernel accepts. `None` if none do.
fn open_first_named<T>(
    names: &[&str],
    base: &PerfEventAttr,
    lookup: impl Fn(&str) -> Option<PmuEventSpec>,
    mut open: impl FnMut(&PerfEventAttr) -> io::Result<T>,
) -> Option<T> {
    for name in names {
        let Some(spec) = lookup(name) else {
            continue;
        };
        let mut attr = *base;
        attr.type_ = spec.type_;
        attr.config = spec.config;
        attr.config1 = spec.config1;
        attr.config2 = spec.config2;
        match open(&attr) {
            Ok(handle) => {
                debug!(event = name, "using PMU event");
                return Some(handle);
            }
            Err(e) => trace!(event = name, error = %e, "PMU event rejected"),
        }
    }
    None
}

fn perf_ioctl(fd: &OwnedFd, request: libc::c_ulong) -> Result<()> {
    // SAFETY: fd is an open perf event; these requests take no argument
    let ret = unsafe { libc::ioctl(fd.as_raw_fd(), request, 0) };
    if ret < 0 {
        return Err(counter_unavailable(
            "perf",
            io::Error::last_os_error().to_string(),
        ));
    }
    Ok(())
}

#[repr(C)]
#[derive(Default)]
struct PerfRead {
    value: u64,
    time_enabled: u64,
    time_running: u64,
}

/// Reads a counter, scaling by enabled/running time when the kernel had to
/// multiplex it with other events.
fn read_scaled_counter(fd: &OwnedFd) -> Result<u64> {
    let mut data = PerfRead::default();
    // SAFETY: data is a writable PerfRead and the length matches it
    let bytes = unsafe {
        libc::read(
            fd.as_raw_fd(),
            &mut data as *mut PerfRead as *mut libc::c_void,
            size_of::<PerfRead>(),
        )
    };
    if bytes < 0 {
        return Err(counter_unavailable(
            "perf",
            io::Error::last_os_error().to_string(),
        ));
    }
    if bytes as usize != size_of::<PerfRead>() {
        return Err(counter_unavailable(
            "perf",
            format!("short read of {bytes} bytes"),
        ));
    }
    Ok(scale(&data))
}

fn scale(data: &PerfRead) -> u64 {
    if data.time_running == 0 || data.time_enabled <= data.time_running {
        return data.value;
    }
    ((data.value as f64) * (data.time_enabled as f64) / (data.time_running as f64)) as u64
}

/// A PMU event as described under `/sys/bus/event_source/devices/*/events`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PmuEventSpec {
    type_: u32,
    config: u64,
    config1: u64,
    config2: u64,
}

fn load_pmu_event_spec(event_name: &str) -> Option<PmuEventSpec> {
    let entries = fs::read_dir(Path::new("/sys/bus/event_source/devices")).ok()?;
    for entry in entries.flatten() {
        let base_path = entry.path();
        let Ok(event_spec) = fs::read_to_string(base_path.join("events").join(event_name)) else {
            continue;
        };
        let Some(type_) = fs::read_to_string(base_path.join("type"))
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
        else {
            continue;
        };
        if let Some(spec) = parse_pmu_event_spec(type_, event_spec.lines().next().unwrap_or("")) {
            return Some(spec);
        }
    }
    None
}

/// Parses `event=0x24,umask=0x3f` style terms. Unknown terms are ignored.
fn parse_pmu_event_spec(type_: u32, spec: &str) -> Option<PmuEventSpec> {
    let mut out = PmuEventSpec {
        type_,
        ..Default::default()
    };
    let mut has_config = false;
    for token in spec.split(',') {
        let Some((key, value)) = token.trim().split_once('=') else {
            continue;
        };
        let Some(value) = parse_u64_base0(value) else {
            continue;
        };
        match key.trim() {
            "event" | "config" => {
                out.config |= value;
                has_config = true;
            }
            "umask" => out.config |= value << 8,
            "config1" => out.config1 = value,
            "config2" => out.config2 = value,
            _ => {}
        }
    }
    has_config.then_some(out)
}

fn parse_u64_base0(input: &str) -> Option<u64> {
    let value = input.trim();
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if value.len() > 1 && value.starts_with('0') {
        u64::from_str_radix(&value[1..], 8).ok()
    } else {
        value.parse().ok()
    }
}
