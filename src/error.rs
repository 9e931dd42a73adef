//! Error types for trials.
//!
//! `InvalidArgument` and `AllocationError` are fatal to a trial.
//! `CounterUnavailable` is recovered by the runner, which falls back to
//! wall-clock timing only.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Allocation failed: {message} (requested {requested_bytes} bytes)")]
    AllocationError {
        requested_bytes: usize,
        message: String,
    },

    #[error("Counter unavailable: {counter}: {reason}")]
    CounterUnavailable {
        counter: &'static str,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// True for errors the runner degrades from instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BenchError::CounterUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;

pub fn invalid_argument(message: impl Into<String>) -> BenchError {
    BenchError::InvalidArgument {
        message: message.into(),
    }
}

pub fn allocation_error(requested_bytes: usize, message: impl Into<String>) -> BenchError {
    BenchError::AllocationError {
        requested_bytes,
        message: message.into(),
    }
}

pub fn counter_unavailable(counter: &'static str, reason: impl Into<String>) -> BenchError {
    BenchError::CounterUnavailable {
        counter,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = invalid_argument("block size must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid argument: block size must be positive"
        );

        let err = allocation_error(1 << 40, "out of memory");
        let text = err.to_string();
        assert!(text.contains("out of memory"));
        assert!(text.contains("1099511627776 bytes"));

        let err = counter_unavailable("L1D", "permission denied");
        assert_eq!(
            err.to_string(),
            "Counter unavailable: L1D: permission denied"
        );
    }

    #[test]
    fn test_only_counter_errors_are_recoverable() {
        assert!(counter_unavailable("L2", "no pmu").is_recoverable());
        assert!(!invalid_argument("n = 0").is_recoverable());
        assert!(!allocation_error(8, "nope").is_recoverable());
    }
}
