use std::fmt;

use serde::Serialize;
use validator::{Validate, ValidationError};

/// Update performed by one step of the run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// One Metropolis sweep in scan order.
    Metropolis,
    /// One Metropolis sweep as two parallel checkerboard passes.
    Checkerboard,
    /// One Wolff cluster step.
    Wolff,
    /// One Metropolis attempt at a uniformly random site.
    #[serde(rename = "single")]
    SingleSpin,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metropolis => "metropolis",
            Self::Checkerboard => "checkerboard",
            Self::Wolff => "wolff",
            Self::SingleSpin => "single",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Algorithm {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "metropolis" => Ok(Self::Metropolis),
            "checkerboard" => Ok(Self::Checkerboard),
            "wolff" => Ok(Self::Wolff),
            "single" => Ok(Self::SingleSpin),
            _ => Err(format!(
                "unknown algorithm '{s}', expected 'metropolis', 'checkerboard', 'wolff' or 'single'"
            )),
        }
    }
}

fn validate_sim_config(cfg: &SimConfig) -> Result<(), ValidationError> {
    if cfg.n_steps < 1 {
        return Err(ValidationError::new("n_steps must be >= 1"));
    }
    if cfg.warmup_steps > cfg.n_steps {
        return Err(ValidationError::new("warmup_steps must be <= n_steps"));
    }
    if cfg.lag < 1 {
        return Err(ValidationError::new("lag must be >= 1"));
    }
    if cfg.autocorrelation_max_lag == Some(0) {
        return Err(ValidationError::new("autocorrelation_max_lag must be >= 1"));
    }
    Ok(())
}

#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_sim_config"))]
pub struct SimConfig {
    pub n_steps: usize,
    /// Leading steps excluded from the observable averages.
    pub warmup_steps: usize,
    pub algorithm: Algorithm,
    /// Record energy and order-parameter traces.
    pub record: bool,
    /// Trace sampling interval in steps.
    pub lag: usize,
    /// Window for the energy autocorrelation time; `None` disables it.
    pub autocorrelation_max_lag: Option<usize>,
}

impl SimConfig {
    pub fn new(algorithm: Algorithm, n_steps: usize) -> Self {
        Self {
            n_steps,
            warmup_steps: 0,
            algorithm,
            record: false,
            lag: 1,
            autocorrelation_max_lag: None,
        }
    }
}
