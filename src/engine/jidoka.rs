//! Jidoka (自働化) - Autonomous anomaly detection for integrator steps.
//!
//! Every candidate state produced inside a step is inspected before the step
//! can be accepted. A violation stops the step, never the run: the integrator
//! treats it as a rejection and retries with a smaller step.
//!
//! # Anomaly Types
//!
//! 1. **Non-finite values**: NaN or Inf in any state variable
//! 2. **Pole proximity**: polar angle within the guard band of 0 or π

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::engine::state::State;
use crate::error::{SimError, SimResult};

/// Smallest distance from a pole any physics evaluation accepts.
///
/// The integrator's configurable guard band must not be narrower.
pub const MIN_POLE_DISTANCE: f64 = 1e-9;

/// Distance of the polar angle from the nearest pole.
#[must_use]
pub fn pole_distance(beta: f64) -> f64 {
    beta.min(PI - beta)
}

/// Fail with `Singularity` when `beta` is within `guard` of a pole.
///
/// Angles outside [0, π] count as having crossed a pole.
///
/// # Errors
///
/// Returns `SimError::Singularity` inside the guard band, and for NaN.
pub fn ensure_off_pole(beta: f64, guard: f64) -> SimResult<()> {
    let distance = pole_distance(beta);
    if distance > guard {
        Ok(())
    } else {
        Err(SimError::Singularity { beta, guard })
    }
}

/// Jidoka guard configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JidokaConfig {
    /// Guard band around β = 0 and β = π (rad).
    pub pole_guard: f64,
}

impl Default for JidokaConfig {
    fn default() -> Self {
        Self { pole_guard: 1e-3 }
    }
}

/// Inspector for candidate states inside an integrator step.
///
/// # Example
///
/// ```rust
/// use trapsim::engine::jidoka::{JidokaConfig, StepGuard};
/// use trapsim::engine::state::State;
///
/// let guard = StepGuard::new(JidokaConfig::default());
/// assert!(guard.check(&State::trap_minimum()).is_ok());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StepGuard {
    config: JidokaConfig,
}

impl StepGuard {
    /// Create a guard with the given configuration.
    #[must_use]
    pub const fn new(config: JidokaConfig) -> Self {
        Self { config }
    }

    /// Guard band in use.
    #[must_use]
    pub const fn pole_guard(&self) -> f64 {
        self.config.pole_guard
    }

    /// Inspect a candidate state.
    ///
    /// # Errors
    ///
    /// - `NonFiniteValue`: NaN or Inf found
    /// - `Singularity`: polar angle inside the guard band
    pub fn check(&self, state: &State) -> SimResult<()> {
        if let Some(component) = state.first_non_finite() {
            return Err(SimError::NonFiniteValue {
                location: format!("state.{component}"),
            });
        }
        ensure_off_pole(state.beta, self.config.pole_guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pole_distance() {
        assert!((pole_distance(0.25) - 0.25).abs() < f64::EPSILON);
        assert!((pole_distance(PI - 0.25) - 0.25).abs() < 1e-12);
        assert!(pole_distance(-0.1) < 0.0);
    }

    #[test]
    fn test_ensure_off_pole() {
        assert!(ensure_off_pole(1.0, 1e-3).is_ok());
        assert!(ensure_off_pole(5e-4, 1e-3).is_err());
        assert!(ensure_off_pole(PI - 5e-4, 1e-3).is_err());
        assert!(ensure_off_pole(PI + 0.1, 1e-3).is_err());
        assert!(ensure_off_pole(f64::NAN, 1e-3).is_err());
    }

    #[test]
    fn test_guard_accepts_valid_state() {
        let guard = StepGuard::new(JidokaConfig::default());
        assert!(guard.check(&State::trap_minimum()).is_ok());
        assert!((guard.pole_guard() - 1e-3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_guard_rejects_non_finite_first() {
        let guard = StepGuard::new(JidokaConfig::default());
        let nan_angle = State {
            gamma: f64::NAN,
            ..State::trap_minimum()
        };
        assert!(matches!(
            guard.check(&nan_angle),
            Err(SimError::NonFiniteValue { .. })
        ));

        let state = State {
            px: f64::INFINITY,
            beta: 0.0,
            ..State::default()
        };
        let result = guard.check(&state);
        assert!(
            matches!(&result, Err(SimError::NonFiniteValue { location }) if location == "state.px"),
            "expected NonFiniteValue, got {result:?}"
        );
    }

    #[test]
    fn test_guard_rejects_pole() {
        let guard = StepGuard::new(JidokaConfig { pole_guard: 0.1 });
        let state = State {
            beta: 0.05,
            ..State::trap_minimum()
        };
        assert!(matches!(
            guard.check(&state),
            Err(SimError::Singularity { .. })
        ));
    }
}
