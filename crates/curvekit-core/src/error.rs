use thiserror::Error;

/// Errors raised when a caller breaks an operation's contract.
///
/// Numerically expected failures (zero-length curves, cusps, non-convergence)
/// are not errors; they come back as `None`, `false` or an empty result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelError {
    #[error("{what} index {index} out of range (count is {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("parameter {t} is not strictly inside ({t0}, {t1})")]
    ParameterNotInterior { t: f64, t0: f64, t1: f64 },

    #[error("invalid interval [{t0}, {t1}]")]
    InvalidInterval { t0: f64, t1: f64 },

    #[error("parameters must be strictly increasing (violated at position {index})")]
    NonIncreasing { index: usize },

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, KernelError>;
