//! Deterministic part of the Langevin dynamics.
//!
//! Translation is Newtonian with anisotropic gas friction aligned to the rod.
//! Rotation uses the canonical symmetric-top equations in z-y-z Euler angles
//! with `q = pα − pγ cos β`:
//!
//! ```text
//! dα/dt  = q / (I sin²β)
//! dβ/dt  = pβ / I
//! dγ/dt  = pγ / Ic − cos β · q / (I sin²β)
//! dpα/dt = τα − [Γr⊥ pα − (Γr⊥ − Γr∥) cos β pγ]
//! dpβ/dt = τβ − q pγ / (I sin β) + q² cos β / (I sin³β) − Γr⊥ pβ
//! dpγ/dt = −Γr∥ pγ
//! ```

use nalgebra::{Matrix3, Vector3};

use crate::engine::jidoka::{ensure_off_pole, MIN_POLE_DISTANCE};
use crate::engine::state::State;
use crate::error::SimResult;
use crate::physics::params::ParameterSet;
use crate::physics::potential::{optical_force, optical_torque};

/// Unit vector along the rod axis.
#[must_use]
pub fn rod_axis(alpha: f64, beta: f64) -> Vector3<f64> {
    let (sa, ca) = alpha.sin_cos();
    let (sb, cb) = beta.sin_cos();
    Vector3::new(sb * ca, sb * sa, cb)
}

/// Body-to-lab rotation `Rz(α)·Ry(β)`.
///
/// The third column is [`rod_axis`]; the same matrix orients both the
/// friction tensor and the translational noise.
#[must_use]
pub fn body_rotation(alpha: f64, beta: f64) -> Matrix3<f64> {
    let (sa, ca) = alpha.sin_cos();
    let (sb, cb) = beta.sin_cos();
    Matrix3::new(
        ca * cb, -sa, ca * sb, //
        sa * cb, ca, sa * sb, //
        -sb, 0.0, cb,
    )
}

/// Translational damping operator `Γ_t = R·diag(Γ⊥, Γ⊥, Γ∥)·Rᵀ`.
#[must_use]
pub fn translational_damping(alpha: f64, beta: f64, params: &ParameterSet) -> Matrix3<f64> {
    let r = body_rotation(alpha, beta);
    let body = Matrix3::from_diagonal(&Vector3::new(
        params.damping_cm_perp,
        params.damping_cm_perp,
        params.damping_cm_par,
    ));
    r * body * r.transpose()
}

/// Rotational damping operator acting on `(pα, pβ, pγ)`.
#[must_use]
pub fn rotational_damping(beta: f64, params: &ParameterSet) -> Matrix3<f64> {
    let perp = params.damping_rot_perp;
    let par = params.damping_rot_par;
    Matrix3::new(
        perp, 0.0, -(perp - par) * beta.cos(), //
        0.0, perp, 0.0, //
        0.0, 0.0, par,
    )
}

/// Symmetric-top mass matrix `M` with `p = M·(α̇, β̇, γ̇)`.
#[must_use]
pub fn rotational_mass_matrix(beta: f64, params: &ParameterSet) -> Matrix3<f64> {
    let (sb, cb) = beta.sin_cos();
    let i = params.inertia_i;
    let ic = params.inertia_ic;
    Matrix3::new(
        i * sb * sb + ic * cb * cb, 0.0, ic * cb, //
        0.0, i, 0.0, //
        ic * cb, 0.0, ic,
    )
}

/// Time derivative of every state component.
///
/// # Errors
///
/// Returns `SimError::Singularity` when β is within `MIN_POLE_DISTANCE` of a
/// pole, where `1/sin β` terms diverge.
pub fn drift(state: &State, params: &ParameterSet) -> SimResult<State> {
    ensure_off_pole(state.beta, MIN_POLE_DISTANCE)?;

    let momentum = state.momentum();
    let force = optical_force(state, params);
    let dp = force - translational_damping(state.alpha, state.beta, params) * momentum;

    let i = params.inertia_i;
    let ic = params.inertia_ic;
    let (sb, cb) = state.beta.sin_cos();
    let sb2 = sb * sb;
    let q = state.p_alpha - state.p_gamma * cb;

    let d_alpha = q / (i * sb2);
    let d_beta = state.p_beta / i;
    let d_gamma = state.p_gamma / ic - cb * d_alpha;

    let torque = optical_torque(state, params);
    let friction = rotational_damping(state.beta, params) * state.angular_momentum();
    let geometric_beta = -q * state.p_gamma / (i * sb) + q * q * cb / (i * sb2 * sb);

    Ok(State {
        x: state.px / params.mass,
        y: state.py / params.mass,
        z: state.pz / params.mass,
        px: dp.x,
        py: dp.y,
        pz: dp.z,
        alpha: d_alpha,
        beta: d_beta,
        gamma: d_gamma,
        p_alpha: torque.x - friction.x,
        p_beta: torque.y + geometric_beta - friction.y,
        p_gamma: torque.z - friction.z,
    })
}
