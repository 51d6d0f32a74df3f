//! Stochastic integration of single trajectories.
//!
//! - [`noise`]: Wiener increments with Brownian-bridge rejection memory
//! - [`integrator`]: adaptive SRA1 stepper
//! - [`trajectory`]: sampled output and columnar export

pub mod integrator;
pub mod noise;
pub mod trajectory;

pub use integrator::{integrate, SaveMode, SdeIntegrator, TimeSpan};
pub use noise::{NoiseIncrement, NoiseProcess};
pub use trajectory::{IntegrationStats, Trajectory, TrajectoryTable};
