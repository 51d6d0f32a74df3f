//! Optical potential of the standing-wave trap and its gradients.
//!
//! `U = −A·G(x, y)·cos²(kz)·χ(α, β)` with
//!
//! - `A = V χ∥ f² / 4` (the potential depth),
//! - `G = exp(−2x²/Wx² − 2y²/Wy²)`,
//! - `χ = χ⊥/χ∥ + (Δχ/χ∥)·sin²β·cos²α`.
//!
//! `χ` is the polarizability seen by the x-polarized field, so the rod
//! prefers to align with the polarization axis (α = 0, β = π/2).

use nalgebra::Vector3;

use crate::engine::state::State;
use crate::physics::params::ParameterSet;

/// Relative anisotropy `Δχ/χ∥`.
#[must_use]
pub fn anisotropy(params: &ParameterSet) -> f64 {
    params.susceptibility_delta / params.susceptibility_par
}

/// Orientation factor `χ(α, β)`, equal to 1 when aligned with the field.
#[must_use]
pub fn orientation_factor(alpha: f64, beta: f64, params: &ParameterSet) -> f64 {
    let (sb, ca) = (beta.sin(), alpha.cos());
    params.susceptibility_perp / params.susceptibility_par
        + anisotropy(params) * sb * sb * ca * ca
}

/// Transverse Gaussian envelope `G(x, y)`.
#[must_use]
pub fn transverse_envelope(x: f64, y: f64, params: &ParameterSet) -> f64 {
    let wx2 = params.waist_x * params.waist_x;
    let wy2 = params.waist_y * params.waist_y;
    (-2.0 * x * x / wx2 - 2.0 * y * y / wy2).exp()
}

/// Optical potential energy at `state`.
#[must_use]
pub fn optical_potential(state: &State, params: &ParameterSet) -> f64 {
    let standing = (params.wavenumber * state.z).cos().powi(2);
    -params.potential_depth()
        * transverse_envelope(state.x, state.y, params)
        * standing
        * orientation_factor(state.alpha, state.beta, params)
}

/// Optical force `−∇ₓU` on the centre of mass.
#[must_use]
pub fn optical_force(state: &State, params: &ParameterSet) -> Vector3<f64> {
    let a = params.potential_depth();
    let g = transverse_envelope(state.x, state.y, params);
    let chi = orientation_factor(state.alpha, state.beta, params);
    let kz = params.wavenumber * state.z;
    let standing = kz.cos().powi(2);
    let wx2 = params.waist_x * params.waist_x;
    let wy2 = params.waist_y * params.waist_y;

    Vector3::new(
        a * chi * standing * g * (-4.0 * state.x / wx2),
        a * chi * standing * g * (-4.0 * state.y / wy2),
        -a * chi * g * params.wavenumber * (2.0 * kz).sin(),
    )
}

/// Generalized torques `(τα, τβ, τγ) = −∂U/∂(α, β, γ)`.
///
/// `τγ` is identically zero: the potential does not depend on the spin angle.
#[must_use]
pub fn optical_torque(state: &State, params: &ParameterSet) -> Vector3<f64> {
    let scale = params.potential_depth()
        * transverse_envelope(state.x, state.y, params)
        * (params.wavenumber * state.z).cos().powi(2)
        * anisotropy(params);
    let sb = state.beta.sin();
    let ca = state.alpha.cos();

    Vector3::new(
        -scale * sb * sb * (2.0 * state.alpha).sin(),
        scale * (2.0 * state.beta).sin() * ca * ca,
        0.0,
    )
}
