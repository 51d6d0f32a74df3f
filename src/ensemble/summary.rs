//! Reduced output of an ensemble run.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::state::{StateComponent, STATE_DIM};
use crate::error::{SimError, SimResult};

/// Scalar tracked per query time: a state component or the energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedScalar {
    /// One of the 12 state components.
    Component(StateComponent),
    /// Energy above the trap minimum in units of `k_B T`.
    NormalizedEnergy,
}

impl TrackedScalar {
    /// Number of tracked scalars.
    pub const COUNT: usize = STATE_DIM + 1;

    /// All tracked scalars, state components first.
    #[must_use]
    pub fn all() -> [Self; Self::COUNT] {
        let mut all = [Self::NormalizedEnergy; Self::COUNT];
        for (slot, component) in all.iter_mut().zip(StateComponent::ALL) {
            *slot = Self::Component(component);
        }
        all
    }

    /// Position in [`all`](Self::all).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Component(c) => c.index(),
            Self::NormalizedEnergy => STATE_DIM,
        }
    }
}

impl fmt::Display for TrackedScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(c) => write!(f, "{c}"),
            Self::NormalizedEnergy => f.write_str("normalized_energy"),
        }
    }
}

/// Mean and quantile band of one scalar across the query grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarSeries {
    /// Which scalar.
    pub scalar: TrackedScalar,
    /// Mean per query time.
    pub mean: Vec<f64>,
    /// Lower quantile per query time.
    pub lower: Vec<f64>,
    /// Upper quantile per query time.
    pub upper: Vec<f64>,
}

/// A trajectory that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryFailure {
    /// Index of the trajectory in the ensemble.
    pub index: usize,
    /// Seed of its noise stream.
    pub seed: u64,
    /// Rendered error.
    pub reason: String,
}

/// Statistics of an ensemble on a fixed query-time grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSummary {
    /// Query times.
    pub query_times: Vec<f64>,
    /// One series per [`TrackedScalar`], in [`TrackedScalar::all`] order.
    pub series: Vec<ScalarSeries>,
    /// Trajectories that completed.
    pub succeeded: usize,
    /// Trajectories that failed.
    pub failed: usize,
    /// Failure records, ordered by index.
    pub failures: Vec<TrajectoryFailure>,
    /// Quantile levels `(lower, upper)`.
    pub quantile_levels: (f64, f64),
    /// Master seed of the run.
    pub seed: u64,
}

impl EnsembleSummary {
    /// Whether at least one trajectory contributed to the statistics.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.succeeded > 0
    }

    /// Total trajectories attempted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Series of one scalar.
    #[must_use]
    pub fn series(&self, scalar: TrackedScalar) -> Option<&ScalarSeries> {
        self.series.get(scalar.index()).filter(|s| s.scalar == scalar)
    }

    /// Series of one state component.
    #[must_use]
    pub fn component(&self, component: StateComponent) -> Option<&ScalarSeries> {
        self.series(TrackedScalar::Component(component))
    }

    /// Series of the normalized energy.
    #[must_use]
    pub fn energy(&self) -> Option<&ScalarSeries> {
        self.series(TrackedScalar::NormalizedEnergy)
    }

    /// Serialize as JSON.
    ///
    /// NaN statistics are written as `null`.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` on encoder failure.
    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string(self).map_err(|e| SimError::serialization(e.to_string()))
    }
}
