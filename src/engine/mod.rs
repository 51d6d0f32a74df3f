//! Core building blocks shared by the integrator and the ensemble.
//!
//! - Deterministic RNG (PCG with per-trajectory stream seeds)
//! - Phase-space state of the rod
//! - Jidoka guards that stop a step on anomalies

pub mod jidoka;
pub mod rng;
pub mod state;

pub use jidoka::{JidokaConfig, StepGuard};
pub use rng::SimRng;
pub use state::{State, StateComponent, StateVector, NOISE_DIM, STATE_DIM};
