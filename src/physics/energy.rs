//! Total energy of the rod, used for diagnostics only.

use crate::engine::jidoka::{ensure_off_pole, MIN_POLE_DISTANCE};
use crate::engine::state::State;
use crate::error::SimResult;
use crate::physics::params::ParameterSet;
use crate::physics::potential::optical_potential;

/// Translational kinetic energy `|p|²/2m`.
#[must_use]
pub fn translational_kinetic(state: &State, params: &ParameterSet) -> f64 {
    state.momentum().norm_squared() / (2.0 * params.mass)
}

/// Rotational kinetic energy of the symmetric top.
///
/// # Errors
///
/// Returns `SimError::Singularity` at the poles.
pub fn rotational_kinetic(state: &State, params: &ParameterSet) -> SimResult<f64> {
    ensure_off_pole(state.beta, MIN_POLE_DISTANCE)?;
    let i = params.inertia_i;
    let (sb, cb) = state.beta.sin_cos();
    let q = state.p_alpha - state.p_gamma * cb;
    Ok(state.p_beta * state.p_beta / (2.0 * i)
        + q * q / (2.0 * i * sb * sb)
        + state.p_gamma * state.p_gamma / (2.0 * params.inertia_ic))
}

/// Total energy `E = T_trans + T_rot + U`.
///
/// # Errors
///
/// Returns `SimError::Singularity` at the poles.
pub fn energy(state: &State, params: &ParameterSet) -> SimResult<f64> {
    Ok(translational_kinetic(state, params)
        + rotational_kinetic(state, params)?
        + optical_potential(state, params))
}

/// Energy of [`State::trap_minimum`], the usual reference.
#[must_use]
pub fn reference_energy(params: &ParameterSet) -> f64 {
    optical_potential(&State::trap_minimum(), params)
}

/// Energy above `reference` in units of `k_B T`.
///
/// # Errors
///
/// Returns `SimError::Singularity` at the poles.
pub fn normalized_energy(state: &State, params: &ParameterSet, reference: f64) -> SimResult<f64> {
    Ok((energy(state, params)? - reference) / params.kt())
}
