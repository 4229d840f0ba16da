//! Error taxonomy for the cubature engine.
//!
//! Budget exhaustion is deliberately not an error: running out of
//! evaluations is a normal exit reported through [`crate::Termination`].

use std::fmt;

/// Errors surfaced by configuration, mesh validation and the adaptive loop.
#[derive(Clone, Debug)]
pub enum CubatureError {
    /// Rejected before any evaluation: bad rule order, tolerance or budget.
    InvalidConfig { reason: String },
    /// A mesh simplex has zero or non-finite volume.
    DegenerateSimplex { index: usize, volume: f64 },
    /// The integrand failed or produced a non-finite value.
    IntegrandFailure { reason: String },
}

impl CubatureError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub(crate) fn integrand(reason: impl Into<String>) -> Self {
        Self::IntegrandFailure {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CubatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid configuration: {reason}"),
            Self::DegenerateSimplex { index, volume } => {
                write!(f, "mesh simplex {index} is degenerate (volume {volume})")
            }
            Self::IntegrandFailure { reason } => write!(f, "integrand failure: {reason}"),
        }
    }
}

impl std::error::Error for CubatureError {}
