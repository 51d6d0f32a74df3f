//! Adaptive stochastic Runge-Kutta integration of one trajectory.
//!
//! The scheme is Rößler's SRA1 for additive-type noise, with the diffusion
//! evaluated once per step at the step's initial state:
//!
//! ```text
//! χ₂ = (ΔW + ΔZ/√3) / 2
//! H  = u + ¾h·f(u) + (3/2)·g(u)·χ₂
//! u' = u + h·(f(u)/3 + 2f(H)/3) + g(u)·ΔW
//! ```
//!
//! The embedded estimate `E = ⅔h·(f(u) − f(H))` drives the step size.
//! Rejected steps keep their noise through [`NoiseProcess::reject`], so the
//! sample path does not depend on the rejection history.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::IntegratorConfig;
use crate::engine::jidoka::StepGuard;
use crate::engine::state::{State, StateVector, STATE_DIM};
use crate::error::{SimError, SimResult};
use crate::physics::diffusion::diffusion;
use crate::physics::drift::drift;
use crate::physics::params::ParameterSet;
use crate::sde::noise::{NoiseIncrement, NoiseProcess};
use crate::sde::trajectory::{IntegrationStats, Trajectory};

/// Largest step growth factor after an accepted step.
const MAX_GROWTH: f64 = 4.0;

/// Smallest step shrink factor.
const MIN_SHRINK: f64 = 0.2;

/// Largest step factor after a rejected step.
const MAX_REJECT_FACTOR: f64 = 0.9;

/// Default `dt_max` as a fraction of the span.
const DEFAULT_DT_MAX_FRACTION: f64 = 1e-2;

/// Default first step as a fraction of `dt_max`.
const DEFAULT_DT_INITIAL_FRACTION: f64 = 1e-2;

/// Integration interval `[start, end]` in µs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    /// Initial time.
    pub start: f64,
    /// Final time.
    pub end: f64,
}

impl TimeSpan {
    /// Create a span.
    ///
    /// # Errors
    ///
    /// Returns `Config` unless both ends are finite and `end > start`.
    pub fn new(start: f64, end: f64) -> SimResult<Self> {
        if !(start.is_finite() && end.is_finite() && end > start) {
            return Err(SimError::config(format!(
                "time span [{start}, {end}] must be finite with end > start"
            )));
        }
        Ok(Self { start, end })
    }

    /// Length of the span.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `t` lies in the closed span.
    #[must_use]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }

    /// Evenly spaced grid of `points` times covering the span.
    #[must_use]
    pub fn grid(&self, points: usize) -> Vec<f64> {
        match points {
            0 => Vec::new(),
            1 => vec![self.start],
            n => {
                let step = self.duration() / (n - 1) as f64;
                (0..n)
                    .map(|i| {
                        if i == n - 1 {
                            self.end
                        } else {
                            self.start + step * i as f64
                        }
                    })
                    .collect()
            }
        }
    }
}

/// Which samples a trajectory keeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SaveMode {
    /// Initial state and every accepted step.
    EveryStep,
    /// Only the given times, interpolated inside the bracketing step.
    At(Vec<f64>),
}

impl SaveMode {
    /// Check that save times are finite, sorted and inside `span`.
    ///
    /// # Errors
    ///
    /// Returns `Config` for unsorted or non-finite times and `OutOfSpan` for
    /// times outside the span.
    pub fn validate(&self, span: &TimeSpan) -> SimResult<()> {
        let Self::At(times) = self else {
            return Ok(());
        };
        if let Some(bad) = times.iter().find(|t| !t.is_finite()) {
            return Err(SimError::config(format!("save time {bad} is not finite")));
        }
        if times.windows(2).any(|w| w[1] < w[0]) {
            return Err(SimError::config("save times must be non-decreasing"));
        }
        if let Some(&outside) = times.iter().find(|&&t| !span.contains(t)) {
            return Err(SimError::OutOfSpan {
                time: outside,
                start: span.start,
                end: span.end,
            });
        }
        Ok(())
    }
}

/// Collects samples according to a [`SaveMode`].
struct Recorder<'a> {
    mode: &'a SaveMode,
    next: usize,
    times: Vec<f64>,
    states: Vec<State>,
}

impl<'a> Recorder<'a> {
    fn new(mode: &'a SaveMode, t0: f64, initial: &State) -> Self {
        let mut recorder = Self {
            mode,
            next: 0,
            times: Vec::new(),
            states: Vec::new(),
        };
        match mode {
            SaveMode::EveryStep => recorder.push(t0, *initial),
            SaveMode::At(times) => {
                while recorder.next < times.len() && times[recorder.next] <= t0 {
                    recorder.push(t0, *initial);
                    recorder.next += 1;
                }
            }
        }
        recorder
    }

    fn push(&mut self, t: f64, state: State) {
        self.times.push(t);
        self.states.push(state);
    }

    /// Record the accepted step `(t0, u0) → (t1, u1)`.
    fn step(&mut self, t0: f64, u0: &StateVector, t1: f64, u1: &StateVector) {
        match self.mode {
            SaveMode::EveryStep => self.push(t1, State::from_vector(u1)),
            SaveMode::At(times) => {
                while self.next < times.len() && times[self.next] <= t1 {
                    let ts = times[self.next];
                    let fraction = if t1 > t0 { (ts - t0) / (t1 - t0) } else { 1.0 };
                    let state = State::from_vector(&(u0 + (u1 - u0) * fraction));
                    self.push(ts, state);
                    self.next += 1;
                }
            }
        }
    }
}

/// Successful evaluation of one trial step.
struct TrialStep {
    next: StateVector,
    error_norm: f64,
}

/// Adaptive SRA1 integrator for a fixed parameter set.
///
/// Stateless between runs: every call to [`run`](Self::run) owns its noise
/// process, so one integrator may be shared by many threads.
#[derive(Debug, Clone)]
pub struct SdeIntegrator<'a> {
    params: &'a ParameterSet,
    config: IntegratorConfig,
    guard: StepGuard,
}

impl<'a> SdeIntegrator<'a> {
    /// Create an integrator.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the parameters or the step control
    /// settings are invalid.
    pub fn new(params: &'a ParameterSet, config: IntegratorConfig) -> SimResult<Self> {
        params.validate_physical()?;
        validator::Validate::validate(&config)?;
        config.validate_semantic()?;
        let guard = StepGuard::new(config.jidoka());
        Ok(Self {
            params,
            config,
            guard,
        })
    }

    /// Step control settings in use.
    #[must_use]
    pub const fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Check an initial state and save plan before integrating.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the initial state is non-finite or inside the pole
    /// guard band, and the errors of [`SaveMode::validate`].
    pub fn check_inputs(&self, initial: &State, span: &TimeSpan, save: &SaveMode) -> SimResult<()> {
        self.guard
            .check(initial)
            .map_err(|e| SimError::config(format!("invalid initial state: {e}")))?;
        save.validate(span)
    }

    /// Integrate one trajectory over `span` with the noise stream of `seed`.
    ///
    /// # Errors
    ///
    /// - configuration errors from [`check_inputs`](Self::check_inputs)
    /// - `IntegrationFailure` when the retry budget is exhausted or the step
    ///   size falls below `dt_min`
    pub fn run(
        &self,
        initial: &State,
        span: TimeSpan,
        seed: u64,
        save: &SaveMode,
    ) -> SimResult<Trajectory> {
        self.check_inputs(initial, &span, save)?;

        let dt_max = self
            .config
            .dt_max
            .unwrap_or(span.duration() * DEFAULT_DT_MAX_FRACTION);
        let dt_min = self.config.dt_min.min(dt_max);
        let mut h = self
            .config
            .dt_initial
            .unwrap_or(dt_max * DEFAULT_DT_INITIAL_FRACTION)
            .clamp(dt_min, dt_max);

        let mut noise = NoiseProcess::new(seed);
        let mut recorder = Recorder::new(save, span.start, initial);
        let mut stats = IntegrationStats::default();
        let mut consecutive = 0_usize;
        let mut t = span.start;
        let mut u = initial.to_vector();

        while t < span.end {
            let remaining = span.end - t;
            let increment = noise.next(h.min(remaining));
            let step = increment.dt;

            let (factor, cause) = match self.trial(&u, &increment) {
                Ok(trial) if trial.error_norm <= 1.0 => {
                    let t_next = if step >= remaining { span.end } else { t + step };
                    recorder.step(t, &u, t_next, &trial.next);
                    t = t_next;
                    u = trial.next;
                    stats.accepted += 1;
                    consecutive = 0;

                    let growth = if trial.error_norm > 0.0 {
                        self.config.safety * trial.error_norm.powf(-0.5)
                    } else {
                        MAX_GROWTH
                    };
                    h = (step * growth.clamp(MIN_SHRINK, MAX_GROWTH)).clamp(dt_min, dt_max);
                    continue;
                }
                Ok(trial) => {
                    let factor = (self.config.safety * trial.error_norm.powf(-0.5))
                        .clamp(MIN_SHRINK, MAX_REJECT_FACTOR);
                    let cause = SimError::ToleranceExceeded {
                        time: t,
                        dt: step,
                        error: trial.error_norm,
                    };
                    (factor, cause)
                }
                Err(e) if e.is_step_recoverable() => {
                    stats.guard_rejections += 1;
                    (0.5, e)
                }
                Err(e) => return Err(e),
            };

            stats.rejected += 1;
            consecutive += 1;
            stats.max_consecutive_rejections = stats.max_consecutive_rejections.max(consecutive);
            h = step * factor;
            trace!(t, dt = step, next_dt = h, cause = %cause, "step rejected");

            if consecutive > self.config.max_rejections || h < dt_min {
                debug!(
                    seed,
                    t,
                    rejections = consecutive,
                    "trajectory abandoned: {cause}"
                );
                return Err(SimError::integration_failure(t, consecutive, cause));
            }
            noise.reject(increment, h);
        }

        stats.final_dt = h;
        debug!(
            seed,
            accepted = stats.accepted,
            rejected = stats.rejected,
            guard_rejections = stats.guard_rejections,
            "trajectory complete"
        );
        Ok(Trajectory::new(
            recorder.times,
            recorder.states,
            stats,
            seed,
        ))
    }

    /// Evaluate one SRA1 step with its error estimate.
    fn trial(&self, u: &StateVector, increment: &NoiseIncrement) -> SimResult<TrialStep> {
        let h = increment.dt;
        let state = State::from_vector(u);
        let k1 = drift(&state, self.params)?.to_vector();
        let g = diffusion(&state, self.params)?;

        let chi2 = (increment.dw + increment.dz / 3.0_f64.sqrt()) * 0.5;
        let stage = u + k1 * (0.75 * h) + g * chi2 * 1.5;
        let stage_state = State::from_vector(&stage);
        self.guard.check(&stage_state)?;
        let k2 = drift(&stage_state, self.params)?.to_vector();

        let next = u + (k1 / 3.0 + k2 * (2.0 / 3.0)) * h + g * increment.dw;
        self.guard.check(&State::from_vector(&next))?;

        let estimate = (k1 - k2) * (2.0 * h / 3.0);
        let error_norm = self.error_norm(u, &next, &estimate);
        if !error_norm.is_finite() {
            return Err(SimError::NonFiniteValue {
                location: "error estimate".to_string(),
            });
        }
        Ok(TrialStep { next, error_norm })
    }

    /// RMS of the estimate scaled by `tol + tol·max(|u|, |u'|)`.
    fn error_norm(&self, u: &StateVector, next: &StateVector, estimate: &StateVector) -> f64 {
        let tol = self.config.tolerance;
        let sum: f64 = (0..STATE_DIM)
            .map(|i| {
                let scale = tol + tol * u[i].abs().max(next[i].abs());
                (estimate[i] / scale).powi(2)
            })
            .sum();
        (sum / STATE_DIM as f64).sqrt()
    }
}

/// Integrate one trajectory, saving every accepted step.
///
/// # Example
///
/// ```rust
/// use trapsim::engine::state::State;
/// use trapsim::physics::params::ParameterSet;
/// use trapsim::sde::integrator::{integrate, TimeSpan};
///
/// let params = ParameterSet::nanorod(300.0, 1.0).unwrap();
/// let span = TimeSpan::new(0.0, 1.0).unwrap();
/// let traj = integrate(&State::trap_minimum(), &params, span, 1e-4, 42).unwrap();
/// assert!((traj.times().last().copied().unwrap() - 1.0).abs() < 1e-12);
/// ```
///
/// # Errors
///
/// Returns configuration errors before integrating and `IntegrationFailure`
/// if the trajectory cannot be completed.
pub fn integrate(
    initial: &State,
    params: &ParameterSet,
    span: TimeSpan,
    tolerance: f64,
    seed: u64,
) -> SimResult<Trajectory> {
    SdeIntegrator::new(params, IntegratorConfig::with_tolerance(tolerance))?.run(
        initial,
        span,
        seed,
        &SaveMode::EveryStep,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::physics::energy::energy;

    fn params() -> ParameterSet {
        ParameterSet::nanorod(300.0, 1.0).unwrap()
    }

    fn span(end: f64) -> TimeSpan {
        TimeSpan::new(0.0, end).unwrap()
    }

    fn displaced() -> State {
        State {
            x: 0.05,
            z: 0.02,
            alpha: 0.05,
            beta: 1.5,
            p_gamma: 0.002,
            ..State::trap_minimum()
        }
    }

    #[test]
    fn test_time_span_validation() {
        assert!(TimeSpan::new(0.0, 1.0).is_ok());
        assert!(TimeSpan::new(1.0, 1.0).is_err());
        assert!(TimeSpan::new(0.0, f64::INFINITY).is_err());
        let grid = span(10.0).grid(11);
        assert_eq!(grid.len(), 11);
        assert!((grid[5] - 5.0).abs() < 1e-12);
        assert!((grid[10] - 10.0).abs() < f64::EPSILON);
        assert_eq!(span(1.0).grid(1), vec![0.0]);
    }

    #[test]
    fn test_save_mode_validation() {
        let s = span(10.0);
        assert!(SaveMode::EveryStep.validate(&s).is_ok());
        assert!(SaveMode::At(vec![0.0, 5.0, 10.0]).validate(&s).is_ok());
        assert!(matches!(
            SaveMode::At(vec![5.0, 1.0]).validate(&s),
            Err(SimError::Config { .. })
        ));
        assert!(matches!(
            SaveMode::At(vec![11.0]).validate(&s),
            Err(SimError::OutOfSpan { .. })
        ));
    }

    #[test]
    fn test_reaches_end_exactly() {
        let p = params();
        let traj = integrate(&displaced(), &p, span(5.0), 1e-4, 1).unwrap();
        assert!((traj.times()[0]).abs() < f64::EPSILON);
        assert!(traj.times().last().is_some_and(|&t| (t - 5.0).abs() < f64::EPSILON));
        assert!(traj.times().windows(2).all(|w| w[1] > w[0]));
        assert_eq!(traj.len(), traj.stats().accepted + 1);
        assert!(traj.states().iter().all(State::is_finite));
    }

    #[test]
    fn test_same_seed_bitwise_identical() {
        let p = params();
        let a = integrate(&displaced(), &p, span(5.0), 1e-4, 9).unwrap();
        let b = integrate(&displaced(), &p, span(5.0), 1e-4, 9).unwrap();
        assert_eq!(a, b);

        let c = integrate(&displaced(), &p, span(5.0), 1e-4, 10).unwrap();
        assert_ne!(a.final_state(), c.final_state());
    }

    #[test]
    fn test_save_at_requested_times() {
        let p = params();
        let integrator = SdeIntegrator::new(&p, IntegratorConfig::with_tolerance(1e-4))
            .unwrap();
        let times = vec![0.0, 0.5, 1.0, 2.5, 4.0];
        let traj = integrator
            .run(&displaced(), span(4.0), 3, &SaveMode::At(times.clone()))
            .unwrap();
        assert_eq!(traj.times(), times.as_slice());
        assert_eq!(traj.states()[0], displaced());
    }

    #[test]
    fn test_save_at_matches_every_step_interpolation() {
        let p = params();
        let integrator = SdeIntegrator::new(&p, IntegratorConfig::with_tolerance(1e-4))
            .unwrap();
        let full = integrator
            .run(&displaced(), span(2.0), 4, &SaveMode::EveryStep)
            .unwrap();
        let sparse = integrator
            .run(&displaced(), span(2.0), 4, &SaveMode::At(vec![0.3, 1.7]))
            .unwrap();
        for (t, s) in sparse.samples() {
            let dense = full.state_at(t).unwrap();
            assert!((dense.to_vector() - s.to_vector()).norm() < 1e-12);
        }
    }

    #[test]
    fn test_deterministic_energy_conservation() {
        let p = params().without_damping();
        let initial = displaced();
        let traj = integrate(&initial, &p, span(20.0), 1e-7, 0).unwrap();
        let e0 = energy(&initial, &p).unwrap_or(f64::NAN);
        let drift_in_kt = traj
            .states()
            .iter()
            .map(|s| (energy(s, &p).unwrap_or(f64::NAN) - e0).abs() / p.kt())
            .fold(0.0_f64, f64::max);
        assert!(drift_in_kt < 5e-2, "energy drift = {drift_in_kt} kT");
    }

    #[test]
    fn test_rejects_invalid_initial_state() {
        let p = params();
        let on_pole = State {
            beta: 0.0,
            ..State::trap_minimum()
        };
        let result = integrate(&on_pole, &p, span(1.0), 1e-4, 0);
        assert!(result.is_err_and(|e| e.is_configuration_error()));

        let nan = State {
            px: f64::NAN,
            ..State::trap_minimum()
        };
        assert!(integrate(&nan, &p, span(1.0), 1e-4, 0).is_err());
    }

    #[test]
    fn test_rejects_invalid_tolerance() {
        let p = params();
        let result = integrate(&State::trap_minimum(), &p, span(1.0), 0.0, 0);
        assert!(result.is_err_and(|e| e.is_configuration_error()));
    }

    #[test]
    fn test_retry_budget_exhausted_near_pole() {
        let p = params();
        let config = IntegratorConfig {
            pole_guard: 0.3,
            max_rejections: 8,
            ..IntegratorConfig::with_tolerance(1e-4)
        };
        let integrator = SdeIntegrator::new(&p, config).unwrap();
        // rotating fast toward β = 0.3 from just outside the guard band
        let initial = State {
            beta: 0.31,
            p_beta: -50.0,
            ..State::trap_minimum()
        };
        let result = integrator.run(&initial, span(10.0), 0, &SaveMode::EveryStep);
        match result {
            Err(SimError::IntegrationFailure { source, .. }) => {
                assert!(matches!(*source, SimError::Singularity { .. }));
            }
            other => panic!("expected IntegrationFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_step_floor_exhausted_by_tolerance() {
        let p = params();
        let config = IntegratorConfig {
            dt_min: 0.5,
            dt_max: Some(1.0),
            dt_initial: Some(1.0),
            ..IntegratorConfig::with_tolerance(1e-9)
        };
        let integrator = SdeIntegrator::new(&p, config).unwrap();
        let result = integrator.run(&displaced(), span(10.0), 0, &SaveMode::EveryStep);
        match result {
            Err(SimError::IntegrationFailure { source, .. }) => {
                assert!(
                    matches!(*source, SimError::ToleranceExceeded { error, .. } if error > 1.0),
                    "unexpected cause {source:?}"
                );
            }
            other => panic!("expected IntegrationFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_tolerance_controls_step_count() {
        let p = params();
        let coarse = integrate(&displaced(), &p, span(5.0), 1e-3, 2).unwrap();
        let fine = integrate(&displaced(), &p, span(5.0), 1e-6, 2).unwrap();
        assert!(fine.stats().accepted > coarse.stats().accepted);
    }
}
