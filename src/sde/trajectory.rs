//! Sampled realization of the dynamics.

use serde::{Deserialize, Serialize};

use crate::engine::state::{State, StateComponent};
use crate::error::{SimError, SimResult};
use crate::physics::energy::{normalized_energy, reference_energy};
use crate::physics::params::ParameterSet;

/// Step bookkeeping of one integration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationStats {
    /// Accepted steps.
    pub accepted: usize,
    /// Rejected steps of any cause.
    pub rejected: usize,
    /// Rejections caused by the pole guard or non-finite values.
    pub guard_rejections: usize,
    /// Largest number of consecutive rejections seen.
    pub max_consecutive_rejections: usize,
    /// Step size proposed after the last accepted step.
    pub final_dt: f64,
}

/// Ordered `(time, state)` samples of one stochastic realization.
///
/// Times are non-decreasing. A trajectory is immutable once the integrator
/// returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Vec<State>,
    stats: IntegrationStats,
    seed: u64,
}

impl Trajectory {
    pub(crate) fn new(
        times: Vec<f64>,
        states: Vec<State>,
        stats: IntegrationStats,
        seed: u64,
    ) -> Self {
        debug_assert_eq!(times.len(), states.len());
        Self {
            times,
            states,
            stats,
            seed,
        }
    }

    /// Sample times.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Sampled states.
    #[must_use]
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Iterate over `(time, state)` pairs.
    pub fn samples(&self) -> impl Iterator<Item = (f64, &State)> + '_ {
        self.times.iter().copied().zip(self.states.iter())
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the trajectory has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Integration statistics.
    #[must_use]
    pub const fn stats(&self) -> &IntegrationStats {
        &self.stats
    }

    /// Seed of the noise stream.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Last sample, if any.
    #[must_use]
    pub fn final_state(&self) -> Option<&State> {
        self.states.last()
    }

    /// Time series of one state component.
    #[must_use]
    pub fn component(&self, component: StateComponent) -> Vec<f64> {
        self.states.iter().map(|s| s.get(component)).collect()
    }

    /// State at time `t`, linearly interpolated between samples.
    ///
    /// # Errors
    ///
    /// Returns `OutOfSpan` if `t` lies outside the sampled interval.
    pub fn state_at(&self, t: f64) -> SimResult<State> {
        let (Some(&start), Some(&end)) = (self.times.first(), self.times.last()) else {
            return Err(SimError::OutOfSpan {
                time: t,
                start: f64::NAN,
                end: f64::NAN,
            });
        };
        if !(t >= start && t <= end) {
            return Err(SimError::OutOfSpan {
                time: t,
                start,
                end,
            });
        }

        let after = self.times.partition_point(|&s| s <= t);
        if after == self.times.len() {
            return Ok(self.states[after - 1]);
        }
        let before = after - 1;
        let (t0, t1) = (self.times[before], self.times[after]);
        let fraction = (t - t0) / (t1 - t0);
        Ok(self.states[before].lerp(&self.states[after], fraction))
    }

    /// Energy above the trap minimum in units of `k_B T`, per sample.
    ///
    /// # Errors
    ///
    /// Returns `Singularity` if a sample sits on a pole.
    pub fn normalized_energy(&self, params: &ParameterSet) -> SimResult<Vec<f64>> {
        let reference = reference_energy(params);
        self.states
            .iter()
            .map(|s| normalized_energy(s, params, reference))
            .collect()
    }

    /// Columnar view of the samples.
    ///
    /// # Errors
    ///
    /// Returns `Singularity` if a sample sits on a pole.
    pub fn to_table(&self, params: &ParameterSet) -> SimResult<TrajectoryTable> {
        Ok(TrajectoryTable {
            time: self.times.clone(),
            x: self.component(StateComponent::X),
            y: self.component(StateComponent::Y),
            z: self.component(StateComponent::Z),
            px: self.component(StateComponent::Px),
            py: self.component(StateComponent::Py),
            pz: self.component(StateComponent::Pz),
            alpha: self.component(StateComponent::Alpha),
            beta: self.component(StateComponent::Beta),
            gamma: self.component(StateComponent::Gamma),
            p_alpha: self.component(StateComponent::PAlpha),
            p_beta: self.component(StateComponent::PBeta),
            p_gamma: self.component(StateComponent::PGamma),
            normalized_energy: self.normalized_energy(params)?,
        })
    }
}

/// Columnar export of a trajectory: time, the 12 components and energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryTable {
    /// Sample time (µs).
    pub time: Vec<f64>,
    /// Centre-of-mass x (µm).
    pub x: Vec<f64>,
    /// Centre-of-mass y (µm).
    pub y: Vec<f64>,
    /// Centre-of-mass z along the beam (µm).
    pub z: Vec<f64>,
    /// Momentum x (fg·µm/µs).
    pub px: Vec<f64>,
    /// Momentum y (fg·µm/µs).
    pub py: Vec<f64>,
    /// Momentum z (fg·µm/µs).
    pub pz: Vec<f64>,
    /// Azimuth α (rad).
    pub alpha: Vec<f64>,
    /// Polar angle β (rad).
    pub beta: Vec<f64>,
    /// Spin angle γ (rad).
    pub gamma: Vec<f64>,
    /// Momentum conjugate to α (fg·µm²/µs).
    pub p_alpha: Vec<f64>,
    /// Momentum conjugate to β (fg·µm²/µs).
    pub p_beta: Vec<f64>,
    /// Momentum conjugate to γ (fg·µm²/µs).
    pub p_gamma: Vec<f64>,
    /// Energy above the trap minimum (k_B T).
    pub normalized_energy: Vec<f64>,
}

impl TrajectoryTable {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Serialize as a JSON object of columns.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` on encoder failure.
    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string(self).map_err(|e| SimError::serialization(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn params() -> ParameterSet {
        ParameterSet::nanorod(300.0, 1.0).unwrap()
    }

    fn ramp() -> Trajectory {
        let times = vec![0.0, 1.0, 3.0];
        let states = times
            .iter()
            .map(|&t| State {
                x: t,
                pz: 2.0 * t,
                ..State::trap_minimum()
            })
            .collect();
        Trajectory::new(times, states, IntegrationStats::default(), 5)
    }

    #[test]
    fn test_accessors() {
        let traj = ramp();
        assert_eq!(traj.len(), 3);
        assert!(!traj.is_empty());
        assert_eq!(traj.seed(), 5);
        assert_eq!(traj.component(StateComponent::X), vec![0.0, 1.0, 3.0]);
        assert!(traj.final_state().is_some_and(|s| (s.x - 3.0).abs() < f64::EPSILON));
        assert_eq!(traj.samples().count(), 3);
    }

    #[test]
    fn test_state_at_interpolates() {
        let traj = ramp();
        let s = traj.state_at(2.0).unwrap();
        assert!((s.x - 2.0).abs() < 1e-12);
        assert!((s.pz - 4.0).abs() < 1e-12);

        let at_sample = traj.state_at(1.0).unwrap();
        assert!((at_sample.x - 1.0).abs() < f64::EPSILON);

        let at_end = traj.state_at(3.0).unwrap();
        assert!((at_end.x - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_state_at_out_of_span() {
        let traj = ramp();
        assert!(matches!(
            traj.state_at(3.5),
            Err(SimError::OutOfSpan { .. })
        ));
        assert!(traj.state_at(-0.1).is_err());
        assert!(traj.state_at(f64::NAN).is_err());

        let empty = Trajectory::new(Vec::new(), Vec::new(), IntegrationStats::default(), 0);
        assert!(empty.state_at(0.0).is_err());
    }

    #[test]
    fn test_table_columns() {
        let p = params();
        let table = ramp().to_table(&p).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.pz, vec![0.0, 2.0, 6.0]);
        assert!(table.normalized_energy[0].abs() < 1e-9);
        assert!(table.normalized_energy[2] > table.normalized_energy[1]);

        let json = table.to_json().unwrap_or_default();
        assert!(json.contains("\"normalized_energy\""));
        assert!(json.contains("\"p_gamma\""));
    }
}
