//! Pinning the measuring process to one CPU.
//!
//! Cache-miss counts are only comparable across trials when every trial
//! runs on the same core. Nothing in the engine or the counter reader pins;
//! the CLI calls [`pin_to_cpu`] before a trial when `--cpu` is given.

use crate::error::Result;

/// Restricts the calling process to `cpu`.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<()> {
    use crate::error::invalid_argument;

    if cpu >= libc::CPU_SETSIZE as usize {
        return Err(invalid_argument(format!(
            "cpu {cpu} is beyond CPU_SETSIZE ({})",
            libc::CPU_SETSIZE
        )));
    }

    // SAFETY: cpu_set_t is plain data; zeroed is the empty set
    let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    // SAFETY: cpu < CPU_SETSIZE was checked above
    unsafe { libc::CPU_SET(cpu, &mut set) };

    // SAFETY: set is a valid cpu_set_t of the size passed
    let ret = unsafe { libc::sched_setaffinity(0, size_of::<libc::cpu_set_t>(), &set) };
    if ret != 0 {
        return Err(invalid_argument(format!(
            "cannot pin to cpu {cpu}: {}",
            std::io::Error::last_os_error()
        )));
    }
    tracing::debug!(cpu, "pinned to cpu");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(cpu: usize) -> Result<()> {
    Err(crate::error::invalid_argument(format!(
        "cannot pin to cpu {cpu}: unsupported on this platform"
    )))
}
