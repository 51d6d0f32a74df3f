//! Configuration with schema and semantic validation.
//!
//! Implements Poka-Yoke (mistake-proofing) through:
//! - Type-safe configuration structs
//! - Range validation via `validator`
//! - Runtime semantic validation of cross-field constraints
//!
//! Configuration errors are detected before any trajectory is integrated.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::jidoka::{JidokaConfig, MIN_POLE_DISTANCE};
use crate::error::{SimError, SimResult};

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// Step control of a single trajectory.
    #[validate(nested)]
    #[serde(default)]
    pub integrator: IntegratorConfig,

    /// Ensemble size, seeding and statistics.
    #[validate(nested)]
    #[serde(default)]
    pub ensemble: EnsembleConfig,
}

impl SimConfig {
    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SimError::config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Create a builder for configuration.
    #[must_use]
    pub fn builder() -> SimConfigBuilder {
        SimConfigBuilder::default()
    }

    /// Run schema and semantic validation.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for out-of-range fields and `Config` for
    /// inconsistent combinations.
    pub fn check(&self) -> SimResult<()> {
        self.validate()?;
        self.integrator.validate_semantic()?;
        self.ensemble.validate_semantic()
    }
}

/// Configuration builder for programmatic construction.
#[derive(Debug, Default)]
pub struct SimConfigBuilder {
    seed: Option<u64>,
    tolerance: Option<f64>,
    trajectory_count: Option<usize>,
    workers: Option<usize>,
    quantiles: Option<(f64, f64)>,
    dt_min: Option<f64>,
    dt_max: Option<f64>,
    max_rejections: Option<usize>,
    pole_guard: Option<f64>,
}

impl SimConfigBuilder {
    /// Set the master seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the integrator tolerance (absolute and relative).
    #[must_use]
    pub const fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Set the number of trajectories.
    #[must_use]
    pub const fn trajectory_count(mut self, count: usize) -> Self {
        self.trajectory_count = Some(count);
        self
    }

    /// Set the worker thread count.
    #[must_use]
    pub const fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set the lower and upper quantile levels.
    #[must_use]
    pub const fn quantiles(mut self, lower: f64, upper: f64) -> Self {
        self.quantiles = Some((lower, upper));
        self
    }

    /// Set the smallest step size before a trajectory fails.
    #[must_use]
    pub const fn dt_min(mut self, dt_min: f64) -> Self {
        self.dt_min = Some(dt_min);
        self
    }

    /// Set the largest step size.
    #[must_use]
    pub const fn dt_max(mut self, dt_max: f64) -> Self {
        self.dt_max = Some(dt_max);
        self
    }

    /// Set the consecutive rejection budget.
    #[must_use]
    pub const fn max_rejections(mut self, max_rejections: usize) -> Self {
        self.max_rejections = Some(max_rejections);
        self
    }

    /// Set the pole guard band (rad).
    #[must_use]
    pub const fn pole_guard(mut self, pole_guard: f64) -> Self {
        self.pole_guard = Some(pole_guard);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> SimConfig {
        let mut config = SimConfig::default();

        if let Some(seed) = self.seed {
            config.ensemble.seed = seed;
        }
        if let Some(tolerance) = self.tolerance {
            config.integrator.tolerance = tolerance;
        }
        if let Some(count) = self.trajectory_count {
            config.ensemble.trajectory_count = count;
        }
        if let Some(workers) = self.workers {
            config.ensemble.workers = Some(workers);
        }
        if let Some((lower, upper)) = self.quantiles {
            config.ensemble.lower_quantile = lower;
            config.ensemble.upper_quantile = upper;
        }
        if let Some(dt_min) = self.dt_min {
            config.integrator.dt_min = dt_min;
        }
        if let Some(dt_max) = self.dt_max {
            config.integrator.dt_max = Some(dt_max);
        }
        if let Some(max_rejections) = self.max_rejections {
            config.integrator.max_rejections = max_rejections;
        }
        if let Some(pole_guard) = self.pole_guard {
            config.integrator.pole_guard = pole_guard;
        }

        config
    }
}

/// Adaptive step control of the SDE integrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct IntegratorConfig {
    /// Absolute and relative tolerance of the local error estimate.
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Smallest admissible step size (µs).
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_dt_min")]
    pub dt_min: f64,

    /// Largest step size (µs). `None` means 1/100 of the span.
    #[serde(default)]
    pub dt_max: Option<f64>,

    /// First trial step size (µs). `None` means `dt_max / 100`.
    #[serde(default)]
    pub dt_initial: Option<f64>,

    /// Consecutive rejections tolerated before a trajectory fails.
    #[validate(range(min = 1))]
    #[serde(default = "default_max_rejections")]
    pub max_rejections: usize,

    /// Guard band around β = 0 and β = π (rad).
    #[validate(range(max = 0.5))]
    #[serde(default = "default_pole_guard")]
    pub pole_guard: f64,

    /// Safety factor of the step-size controller.
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    #[serde(default = "default_safety")]
    pub safety: f64,
}

fn default_tolerance() -> f64 {
    1e-5
}

fn default_dt_min() -> f64 {
    1e-12
}

fn default_max_rejections() -> usize {
    64
}

fn default_pole_guard() -> f64 {
    1e-3
}

fn default_safety() -> f64 {
    0.9
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            dt_min: default_dt_min(),
            dt_max: None,
            dt_initial: None,
            max_rejections: default_max_rejections(),
            pole_guard: default_pole_guard(),
            safety: default_safety(),
        }
    }
}

impl IntegratorConfig {
    /// Configuration with a given tolerance and defaults otherwise.
    #[must_use]
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }

    /// Step guard settings derived from this configuration.
    #[must_use]
    pub const fn jidoka(&self) -> JidokaConfig {
        JidokaConfig {
            pole_guard: self.pole_guard,
        }
    }

    /// Validate constraints beyond field ranges.
    ///
    /// # Errors
    ///
    /// Returns `Config` for inconsistent step bounds or a guard band narrower
    /// than the physics layer accepts.
    pub fn validate_semantic(&self) -> SimResult<()> {
        if !self.tolerance.is_finite() || !self.dt_min.is_finite() {
            return Err(SimError::config("tolerance and dt_min must be finite"));
        }
        if !self.pole_guard.is_finite() {
            return Err(SimError::config(format!(
                "pole_guard must be finite, got {}",
                self.pole_guard
            )));
        }
        if self.pole_guard < MIN_POLE_DISTANCE {
            return Err(SimError::config(format!(
                "pole_guard {} is below the minimum pole distance {MIN_POLE_DISTANCE}",
                self.pole_guard
            )));
        }
        if let Some(dt_max) = self.dt_max {
            if !(dt_max.is_finite() && dt_max >= self.dt_min) {
                return Err(SimError::config(format!(
                    "dt_max {dt_max} must be finite and at least dt_min {}",
                    self.dt_min
                )));
            }
        }
        if let Some(dt_initial) = self.dt_initial {
            if !(dt_initial.is_finite() && dt_initial >= self.dt_min) {
                return Err(SimError::config(format!(
                    "dt_initial {dt_initial} must be finite and at least dt_min {}",
                    self.dt_min
                )));
            }
        }
        Ok(())
    }
}

/// Ensemble size, seeding and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EnsembleConfig {
    /// Number of independent trajectories.
    #[validate(range(min = 1))]
    #[serde(default = "default_trajectory_count")]
    pub trajectory_count: usize,

    /// Master seed; trajectory `i` uses stream `i` of it.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Worker threads. `None` uses the available hardware parallelism.
    #[serde(default)]
    pub workers: Option<usize>,

    /// Lower quantile level of the band.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_lower_quantile")]
    pub lower_quantile: f64,

    /// Upper quantile level of the band.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_upper_quantile")]
    pub upper_quantile: f64,
}

fn default_trajectory_count() -> usize {
    100
}

fn default_seed() -> u64 {
    42
}

fn default_lower_quantile() -> f64 {
    0.159
}

fn default_upper_quantile() -> f64 {
    0.841
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            trajectory_count: default_trajectory_count(),
            seed: default_seed(),
            workers: None,
            lower_quantile: default_lower_quantile(),
            upper_quantile: default_upper_quantile(),
        }
    }
}

impl EnsembleConfig {
    /// Worker count to use, never zero.
    #[must_use]
    pub fn resolved_workers(&self) -> usize {
        self.workers
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, usize::from))
            .max(1)
    }

    /// Validate constraints beyond field ranges.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a quantile level is NaN, the levels are not
    /// ordered or a worker count of zero was requested.
    pub fn validate_semantic(&self) -> SimResult<()> {
        if self.lower_quantile.is_nan() || self.upper_quantile.is_nan() {
            return Err(SimError::config(format!(
                "quantile levels must be numbers, got ({}, {})",
                self.lower_quantile, self.upper_quantile
            )));
        }
        if self.lower_quantile > self.upper_quantile {
            return Err(SimError::config(format!(
                "lower quantile {} exceeds upper quantile {}",
                self.lower_quantile, self.upper_quantile
            )));
        }
        if self.workers == Some(0) {
            return Err(SimError::config("workers must be at least 1"));
        }
        Ok(())
    }
}
