//! State-space model of the optically trapped rod.
//!
//! - [`units`]: laboratory inputs and the code unit system
//! - [`params`]: derived, validated constants
//! - [`potential`]: optical potential, force and torque
//! - [`drift`]: deterministic Langevin vector field
//! - [`diffusion`]: 12×6 noise coupling
//! - [`energy`]: energy functional for diagnostics
//!
//! All functions are pure: they read a [`State`](crate::engine::state::State)
//! and a [`ParameterSet`] and return new values.

pub mod diffusion;
pub mod drift;
pub mod energy;
pub mod params;
pub mod potential;
pub mod units;

pub use diffusion::{diffusion, DiffusionMatrix};
pub use drift::drift;
pub use energy::{energy, normalized_energy, reference_energy};
pub use params::ParameterSet;
pub use units::PhysicalInputs;
