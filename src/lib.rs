//! # trapsim
//!
//! Brownian dynamics of a birefringent rod in an optical standing-wave trap.
//!
//! The crate couples translational and rotational Langevin dynamics of a
//! rigid rod, integrates them with an adaptive stochastic Runge-Kutta
//! scheme and aggregates many realizations into mean and quantile bands:
//! - Physics: drift, diffusion and energy of the 12-dimensional state
//! - Integration: Rößler SRA1 with rejection memory (Brownian bridge)
//! - Ensembles: work-stealing pool with reproducible per-trajectory seeds
//!
//! ## Example
//!
//! ```rust
//! use trapsim::prelude::*;
//!
//! let params = ParameterSet::nanorod(300.0, 1.0).unwrap();
//! let span = TimeSpan::new(0.0, 2.0).unwrap();
//! let summary = run_ensemble(
//!     &State::trap_minimum(),
//!     &params,
//!     span,
//!     1e-3,
//!     4,
//!     &span.grid(3),
//! )
//! .unwrap();
//! assert_eq!(summary.succeeded + summary.failed, 4);
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suboptimal_flops,  // Written-out formulas match the equations of motion
    clippy::imprecise_flops,
    clippy::many_single_char_names,
    clippy::missing_const_for_fn,
    clippy::needless_range_loop,
)]

pub mod config;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod physics;
pub mod sde;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{EnsembleConfig, IntegratorConfig, SimConfig, SimConfigBuilder};
    pub use crate::engine::rng::SimRng;
    pub use crate::engine::state::{State, StateComponent};
    pub use crate::ensemble::{run_ensemble, EnsembleRunner, EnsembleSummary, TrackedScalar};
    pub use crate::error::{SimError, SimResult};
    pub use crate::physics::{ParameterSet, PhysicalInputs};
    pub use crate::sde::{integrate, SaveMode, SdeIntegrator, TimeSpan, Trajectory};
}

/// Re-export for public API
pub use error::{SimError, SimResult};
