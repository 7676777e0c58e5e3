use thiserror::Error;

/// Errors raised by lattice construction, spin-state mutation and the run loop.
///
/// Every variant is raised before any spin or cached aggregate is touched, so a
/// failed call leaves its [`SpinState`](crate::SpinState) exactly as it was.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IsingError {
    #[error("invalid lattice shape {shape:?}: need at least one axis and every extent >= 1")]
    InvalidDimension { shape: Vec<usize> },

    #[error("invalid temperature {0}: must be finite and > 0")]
    InvalidTemperature(f64),

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("unsupported coupling J = {0}: the Wolff update requires J > 0")]
    UnsupportedCoupling(f64),

    #[error("invalid spin value {value} at site {site}: expected +1 or -1")]
    InvalidSpin { site: usize, value: i8 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("interrupted")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, IsingError>;
