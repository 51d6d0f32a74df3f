//! Noise coupling matrix of the Langevin dynamics.
//!
//! Six independent Wiener channels act on the momenta only. Channels 0..3
//! drive the linear momentum through the body frame, channels 3..6 drive the
//! angular momenta. The amplitudes satisfy the fluctuation-dissipation
//! relation `B·Bᵀ = 2 kT·Γ·M` on each momentum block.

use nalgebra::{Matrix3, SMatrix, Vector3};

use crate::engine::jidoka::{ensure_off_pole, MIN_POLE_DISTANCE};
use crate::engine::state::{State, NOISE_DIM, STATE_DIM};
use crate::error::SimResult;
use crate::physics::drift::body_rotation;
use crate::physics::params::ParameterSet;

/// State-dependent 12×6 noise coupling.
pub type DiffusionMatrix = SMatrix<f64, STATE_DIM, NOISE_DIM>;

/// Thermal force amplitude `sqrt(2 Γ M kT)`.
fn amplitude(damping: f64, inertia: f64, kt: f64) -> f64 {
    (2.0 * damping * inertia * kt).sqrt()
}

/// Evaluate the noise coupling at `state`.
///
/// # Errors
///
/// Returns `SimError::Singularity` when β is within `MIN_POLE_DISTANCE` of a
/// pole.
pub fn diffusion(state: &State, params: &ParameterSet) -> SimResult<DiffusionMatrix> {
    ensure_off_pole(state.beta, MIN_POLE_DISTANCE)?;
    let kt = params.kt();

    let translational = body_rotation(state.alpha, state.beta)
        * Matrix3::from_diagonal(&Vector3::new(
            amplitude(params.damping_cm_perp, params.mass, kt),
            amplitude(params.damping_cm_perp, params.mass, kt),
            amplitude(params.damping_cm_par, params.mass, kt),
        ));

    let r_perp = amplitude(params.damping_rot_perp, params.inertia_i, kt);
    let r_par = amplitude(params.damping_rot_par, params.inertia_ic, kt);
    let (sb, cb) = state.beta.sin_cos();

    let mut b = DiffusionMatrix::zeros();
    b.fixed_view_mut::<3, 3>(3, 0).copy_from(&translational);
    b[(9, 3)] = r_perp * sb;
    b[(9, 5)] = r_par * cb;
    b[(10, 4)] = r_perp;
    b[(11, 5)] = r_par;
    Ok(b)
}
