//! Error types for trapsim.
//!
//! All fallible operations return `Result<T, SimError>` instead of panicking.
//! Errors fall into two families:
//!
//! 1. **Configuration errors** abort a run before any integration starts.
//! 2. **Trajectory failures** end a single stochastic realization and are
//!    recorded (not propagated) by the ensemble runner.

use thiserror::Error;

/// Result type alias for trapsim operations.
pub type SimResult<T> = Result<T, SimError>;

/// Unified error type for all trapsim operations.
#[derive(Debug, Error)]
pub enum SimError {
    // ===== Local step failures =====
    /// Polar angle too close to a pole of the Euler-angle chart.
    #[error("Singularity: beta = {beta:.6e} lies within {guard:.1e} rad of a pole")]
    Singularity {
        /// Offending polar angle.
        beta: f64,
        /// Guard band that was violated.
        guard: f64,
    },

    /// Local error estimate could not be brought under tolerance.
    #[error("Tolerance exceeded at t = {time:.6e} (dt = {dt:.3e}, error norm = {error:.3e})")]
    ToleranceExceeded {
        /// Time at which the step was attempted.
        time: f64,
        /// Last attempted step size.
        dt: f64,
        /// Last scaled error norm (1.0 is the acceptance threshold).
        error: f64,
    },

    /// Non-finite value (NaN or Inf) produced by a step.
    #[error("Jidoka: non-finite value detected at {location}")]
    NonFiniteValue {
        /// Location of the non-finite value.
        location: String,
    },

    // ===== Trajectory failures =====
    /// Retry budget exhausted; the trajectory is abandoned.
    #[error("Integration failed at t = {time:.6e} after {rejections} consecutive rejections: {source}")]
    IntegrationFailure {
        /// Time of the last accepted step.
        time: f64,
        /// Number of consecutive rejections.
        rejections: usize,
        /// Cause of the final rejection.
        #[source]
        source: Box<SimError>,
    },

    // ===== Configuration Errors =====
    /// Invalid configuration or non-physical parameter.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    // ===== Output Errors =====
    /// Dense evaluation requested outside the trajectory span.
    #[error("Time {time:.6e} outside trajectory span [{start:.6e}, {end:.6e}]")]
    OutOfSpan {
        /// Requested time.
        time: f64,
        /// First sample time.
        start: f64,
        /// Last sample time.
        end: f64,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SimError {
    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Wrap a step failure as the terminal failure of a trajectory.
    #[must_use]
    pub fn integration_failure(time: f64, rejections: usize, cause: Self) -> Self {
        Self::IntegrationFailure {
            time,
            rejections,
            source: Box::new(cause),
        }
    }

    /// Check if this error aborts a whole run.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Validation(_))
    }

    /// Check if this error ends a single trajectory only.
    #[must_use]
    pub const fn is_trajectory_failure(&self) -> bool {
        matches!(
            self,
            Self::IntegrationFailure { .. }
                | Self::Singularity { .. }
                | Self::ToleranceExceeded { .. }
                | Self::NonFiniteValue { .. }
        )
    }

    /// Check if a step failure can be recovered by shrinking the step.
    #[must_use]
    pub const fn is_step_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Singularity { .. } | Self::NonFiniteValue { .. }
        )
    }
}
