//! Ensemble statistics over many stochastic realizations.
//!
//! Every trajectory starts from the same initial state with its own noise
//! stream, is saved directly on the query grid and reduced to 13 scalars per
//! query time (12 state components and the normalized energy). Failed
//! trajectories are recorded and excluded; configuration errors abort the run
//! before any trajectory is integrated.

pub mod pool;
pub mod stats;
pub mod summary;

use tracing::{info, warn};

use crate::config::SimConfig;
use crate::engine::state::{State, STATE_DIM};
use crate::error::{SimError, SimResult};
use crate::physics::energy::{normalized_energy, reference_energy};
use crate::physics::params::ParameterSet;
use crate::sde::integrator::{SaveMode, SdeIntegrator, TimeSpan};

pub use pool::{TrajectoryTask, WorkPool};
pub use stats::{mean, quantile, Band};
pub use summary::{EnsembleSummary, ScalarSeries, TrackedScalar, TrajectoryFailure};

/// Tracked scalars of one trajectory at one query time.
type Row = [f64; TrackedScalar::COUNT];

/// Runs ensembles for a fixed parameter set and configuration.
#[derive(Debug, Clone)]
pub struct EnsembleRunner<'a> {
    params: &'a ParameterSet,
    config: SimConfig,
}

impl<'a> EnsembleRunner<'a> {
    /// Create a runner.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid parameters or settings.
    pub fn new(params: &'a ParameterSet, config: SimConfig) -> SimResult<Self> {
        params.validate_physical()?;
        config.check()?;
        Ok(Self { params, config })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Integrate the ensemble and reduce it on `query_times`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the query grid is empty, unsorted or
    /// outside `span`, or if the initial state is invalid. Trajectory failures
    /// are recorded in the summary instead.
    pub fn run(
        &self,
        initial: &State,
        span: TimeSpan,
        query_times: &[f64],
    ) -> SimResult<EnsembleSummary> {
        if query_times.is_empty() {
            return Err(SimError::config("query grid must not be empty"));
        }
        let integrator = SdeIntegrator::new(self.params, self.config.integrator.clone())?;
        let save = SaveMode::At(query_times.to_vec());
        integrator
            .check_inputs(initial, &span, &save)
            .map_err(|e| match e {
                SimError::OutOfSpan { .. } => SimError::config(e.to_string()),
                other => other,
            })?;

        let ensemble = &self.config.ensemble;
        let pool = WorkPool::with_workers(ensemble.resolved_workers());
        let reference = reference_energy(self.params);
        info!(
            trajectories = ensemble.trajectory_count,
            workers = pool.num_workers(),
            seed = ensemble.seed,
            query_points = query_times.len(),
            "ensemble started"
        );

        let outcomes = pool.execute(ensemble.trajectory_count, ensemble.seed, |task| {
            self.reduce_trajectory(&integrator, initial, span, &save, reference, task)
        });

        let mut rows: Vec<Vec<Row>> = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(trajectory_rows) => rows.push(trajectory_rows),
                Err(failure) => failures.push(failure),
            }
        }

        let summary = EnsembleSummary {
            query_times: query_times.to_vec(),
            series: aggregate(
                &rows,
                query_times.len(),
                ensemble.lower_quantile,
                ensemble.upper_quantile,
            ),
            succeeded: rows.len(),
            failed: failures.len(),
            failures,
            quantile_levels: (ensemble.lower_quantile, ensemble.upper_quantile),
            seed: ensemble.seed,
        };
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "ensemble finished"
        );
        Ok(summary)
    }

    /// Integrate one trajectory and keep only its tracked scalars.
    fn reduce_trajectory(
        &self,
        integrator: &SdeIntegrator<'_>,
        initial: &State,
        span: TimeSpan,
        save: &SaveMode,
        reference: f64,
        task: TrajectoryTask,
    ) -> Result<Vec<Row>, TrajectoryFailure> {
        let result = integrator
            .run(initial, span, task.seed, save)
            .and_then(|trajectory| {
                trajectory
                    .states()
                    .iter()
                    .map(|state| {
                        let mut row = [0.0; TrackedScalar::COUNT];
                        row[..STATE_DIM].copy_from_slice(&state.to_array());
                        row[STATE_DIM] = normalized_energy(state, self.params, reference)?;
                        Ok(row)
                    })
                    .collect::<SimResult<Vec<Row>>>()
            });

        result.map_err(|e| {
            warn!(index = task.index, seed = task.seed, error = %e, "trajectory failed");
            TrajectoryFailure {
                index: task.index,
                seed: task.seed,
                reason: e.to_string(),
            }
        })
    }
}

/// Mean and quantile bands per scalar and query time.
fn aggregate(rows: &[Vec<Row>], points: usize, lower: f64, upper: f64) -> Vec<ScalarSeries> {
    TrackedScalar::all()
        .into_iter()
        .map(|scalar| {
            let k = scalar.index();
            let bands: Vec<Band> = (0..points)
                .map(|j| {
                    let samples: Vec<f64> = rows.iter().map(|r| r[j][k]).collect();
                    if samples.is_empty() {
                        Band::undefined()
                    } else {
                        Band::of(&samples, lower, upper)
                    }
                })
                .collect();
            ScalarSeries {
                scalar,
                mean: bands.iter().map(|b| b.mean).collect(),
                lower: bands.iter().map(|b| b.lower).collect(),
                upper: bands.iter().map(|b| b.upper).collect(),
            }
        })
        .collect()
}

/// Run `count` trajectories with default settings and the given tolerance.
///
/// # Errors
///
/// Returns configuration errors only; trajectory failures are recorded in
/// the summary.
pub fn run_ensemble(
    initial: &State,
    params: &ParameterSet,
    span: TimeSpan,
    tolerance: f64,
    count: usize,
    query_times: &[f64],
) -> SimResult<EnsembleSummary> {
    let config = SimConfig::builder()
        .tolerance(tolerance)
        .trajectory_count(count)
        .build();
    EnsembleRunner::new(params, config)?.run(initial, span, query_times)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::state::StateComponent;

    fn params() -> ParameterSet {
        ParameterSet::nanorod(300.0, 1.0).unwrap()
    }

    fn span(end: f64) -> TimeSpan {
        TimeSpan::new(0.0, end).unwrap()
    }

    #[test]
    fn test_small_ensemble_bands() {
        let p = params();
        let grid = span(2.0).grid(5);
        let summary = run_ensemble(&State::trap_minimum(), &p, span(2.0), 1e-3, 8, &grid)
            .unwrap();
        assert_eq!(summary.total(), 8);
        assert!(summary.is_valid());
        assert_eq!(summary.series.len(), TrackedScalar::COUNT);
        for series in &summary.series {
            assert_eq!(series.mean.len(), 5);
            for j in 0..5 {
                assert!(series.lower[j] <= series.upper[j], "{} at {j}", series.scalar);
            }
        }
        // every trajectory starts at the trap minimum
        let beta = summary
            .component(StateComponent::Beta)
            .expect("beta series");
        assert!((beta.mean[0] - std::f64::consts::FRAC_PI_2).abs() < f64::EPSILON);
        assert!((beta.lower[0] - beta.upper[0]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_grid_is_configuration_error() {
        let p = params();
        let result = run_ensemble(&State::trap_minimum(), &p, span(1.0), 1e-3, 2, &[]);
        assert!(result.is_err_and(|e| e.is_configuration_error()));
    }

    #[test]
    fn test_grid_outside_span_is_configuration_error() {
        let p = params();
        let result = run_ensemble(&State::trap_minimum(), &p, span(1.0), 1e-3, 2, &[0.5, 2.0]);
        assert!(result.is_err_and(|e| e.is_configuration_error()));
    }

    #[test]
    fn test_all_failed_gives_invalid_nan_summary() {
        let p = params();
        let config = SimConfig {
            integrator: crate::config::IntegratorConfig {
                pole_guard: 0.3,
                max_rejections: 4,
                ..crate::config::IntegratorConfig::with_tolerance(1e-3)
            },
            ..SimConfig::builder().trajectory_count(3).workers(2).build()
        };
        let runner = EnsembleRunner::new(&p, config).unwrap();
        let initial = State {
            beta: 0.31,
            p_beta: -50.0,
            ..State::trap_minimum()
        };
        let summary = runner
            .run(&initial, span(1.0), &[0.0, 1.0])
            .unwrap();
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 3);
        assert!(!summary.is_valid());
        assert!(summary.series.iter().all(|s| s.mean.iter().all(|m| m.is_nan())));
        let indices: Vec<usize> = summary.failures.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(summary.failures.iter().all(|f| f.reason.contains("Integration failed")));
    }
}
