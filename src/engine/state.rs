//! Phase-space state of the trapped rod.
//!
//! The state is a named 12-tuple in code units (µm, µs, fg):
//!
//! | index | field | meaning |
//! |---|---|---|
//! | 0..3 | `x, y, z` | centre-of-mass position |
//! | 3..6 | `px, py, pz` | linear momentum |
//! | 6..9 | `alpha, beta, gamma` | z-y-z Euler angles |
//! | 9..12 | `p_alpha, p_beta, p_gamma` | conjugate angular momenta |
//!
//! The polar angle must stay strictly inside (0, π); the Euler-angle chart
//! is singular at the poles.

use nalgebra::{SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Dimension of the phase space.
pub const STATE_DIM: usize = 12;

/// Number of independent Wiener channels driving the momenta.
pub const NOISE_DIM: usize = 6;

/// Flat state vector used by the integrator.
pub type StateVector = SVector<f64, STATE_DIM>;

/// Phase-space state of the rod.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct State {
    /// Position x (µm).
    pub x: f64,
    /// Position y (µm).
    pub y: f64,
    /// Position z, along the standing wave (µm).
    pub z: f64,
    /// Momentum x.
    pub px: f64,
    /// Momentum y.
    pub py: f64,
    /// Momentum z.
    pub pz: f64,
    /// Azimuth of the rod axis (rad).
    pub alpha: f64,
    /// Polar angle of the rod axis (rad), in (0, π).
    pub beta: f64,
    /// Spin about the rod axis (rad).
    pub gamma: f64,
    /// Momentum conjugate to `alpha`.
    pub p_alpha: f64,
    /// Momentum conjugate to `beta`.
    pub p_beta: f64,
    /// Momentum conjugate to `gamma`.
    pub p_gamma: f64,
}

impl State {
    /// Rod at rest at the trap centre, aligned with the x polarization.
    ///
    /// This is the minimum of the optical potential when the rod is more
    /// polarizable along its axis, and the default energy reference.
    #[must_use]
    pub const fn trap_minimum() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            px: 0.0,
            py: 0.0,
            pz: 0.0,
            alpha: 0.0,
            beta: std::f64::consts::FRAC_PI_2,
            gamma: 0.0,
            p_alpha: 0.0,
            p_beta: 0.0,
            p_gamma: 0.0,
        }
    }

    /// Pack into a flat vector in documented index order.
    #[must_use]
    pub fn to_vector(&self) -> StateVector {
        StateVector::from_column_slice(&self.to_array())
    }

    /// Unpack from a flat vector in documented index order.
    #[must_use]
    pub fn from_vector(v: &StateVector) -> Self {
        Self {
            x: v[0],
            y: v[1],
            z: v[2],
            px: v[3],
            py: v[4],
            pz: v[5],
            alpha: v[6],
            beta: v[7],
            gamma: v[8],
            p_alpha: v[9],
            p_beta: v[10],
            p_gamma: v[11],
        }
    }

    /// Components as an array in documented index order.
    #[must_use]
    pub const fn to_array(&self) -> [f64; STATE_DIM] {
        [
            self.x,
            self.y,
            self.z,
            self.px,
            self.py,
            self.pz,
            self.alpha,
            self.beta,
            self.gamma,
            self.p_alpha,
            self.p_beta,
            self.p_gamma,
        ]
    }

    /// Read one component.
    #[must_use]
    pub const fn get(&self, component: StateComponent) -> f64 {
        self.to_array()[component.index()]
    }

    /// Centre-of-mass position.
    #[must_use]
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Linear momentum.
    #[must_use]
    pub fn momentum(&self) -> Vector3<f64> {
        Vector3::new(self.px, self.py, self.pz)
    }

    /// Angular momenta conjugate to (alpha, beta, gamma).
    #[must_use]
    pub fn angular_momentum(&self) -> Vector3<f64> {
        Vector3::new(self.p_alpha, self.p_beta, self.p_gamma)
    }

    /// First non-finite component, if any.
    #[must_use]
    pub fn first_non_finite(&self) -> Option<StateComponent> {
        StateComponent::ALL
            .into_iter()
            .find(|c| !self.get(*c).is_finite())
    }

    /// Check if all components are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.first_non_finite().is_none()
    }

    /// Linear interpolation between two states.
    #[must_use]
    pub fn lerp(&self, other: &Self, fraction: f64) -> Self {
        let a = self.to_vector();
        let b = other.to_vector();
        Self::from_vector(&(a + (b - a) * fraction))
    }
}

impl From<State> for StateVector {
    fn from(state: State) -> Self {
        state.to_vector()
    }
}

impl From<StateVector> for State {
    fn from(v: StateVector) -> Self {
        Self::from_vector(&v)
    }
}

/// Named component of the state, in index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateComponent {
    /// Position x.
    X,
    /// Position y.
    Y,
    /// Position z.
    Z,
    /// Momentum x.
    Px,
    /// Momentum y.
    Py,
    /// Momentum z.
    Pz,
    /// Azimuth.
    Alpha,
    /// Polar angle.
    Beta,
    /// Spin angle.
    Gamma,
    /// Momentum conjugate to alpha.
    PAlpha,
    /// Momentum conjugate to beta.
    PBeta,
    /// Momentum conjugate to gamma.
    PGamma,
}

impl StateComponent {
    /// All components in index order.
    pub const ALL: [Self; STATE_DIM] = [
        Self::X,
        Self::Y,
        Self::Z,
        Self::Px,
        Self::Py,
        Self::Pz,
        Self::Alpha,
        Self::Beta,
        Self::Gamma,
        Self::PAlpha,
        Self::PBeta,
        Self::PGamma,
    ];

    /// Index in the flat state vector.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Field name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::Px => "px",
            Self::Py => "py",
            Self::Pz => "pz",
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Gamma => "gamma",
            Self::PAlpha => "p_alpha",
            Self::PBeta => "p_beta",
            Self::PGamma => "p_gamma",
        }
    }
}

impl std::fmt::Display for StateComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> State {
        State {
            x: 0.1,
            y: -0.2,
            z: 0.3,
            px: 1.0,
            py: 2.0,
            pz: 3.0,
            alpha: 0.4,
            beta: 1.2,
            gamma: -0.7,
            p_alpha: 0.01,
            p_beta: 0.02,
            p_gamma: 0.03,
        }
    }

    #[test]
    fn test_vector_layout() {
        let v = sample().to_vector();
        assert!((v[2] - 0.3).abs() < f64::EPSILON);
        assert!((v[5] - 3.0).abs() < f64::EPSILON);
        assert!((v[7] - 1.2).abs() < f64::EPSILON);
        assert!((v[11] - 0.03).abs() < f64::EPSILON);
        assert_eq!(State::from_vector(&v), sample());
    }

    #[test]
    fn test_component_index_matches_layout() {
        let s = sample();
        let arr = s.to_array();
        for c in StateComponent::ALL {
            assert!((s.get(c) - arr[c.index()]).abs() < f64::EPSILON, "{c}");
        }
        assert_eq!(StateComponent::PGamma.index(), 11);
        assert_eq!(StateComponent::Beta.name(), "beta");
    }

    #[test]
    fn test_trap_minimum() {
        let s = State::trap_minimum();
        assert!((s.beta - std::f64::consts::FRAC_PI_2).abs() < f64::EPSILON);
        assert!(s.momentum().norm() < f64::EPSILON);
        assert!(s.is_finite());
    }

    #[test]
    fn test_non_finite_detection() {
        let mut s = sample();
        s.p_beta = f64::NAN;
        assert_eq!(s.first_non_finite(), Some(StateComponent::PBeta));
        assert!(!s.is_finite());
    }

    #[test]
    fn test_lerp_midpoint() {
        let a = State::default();
        let b = sample();
        let mid = a.lerp(&b, 0.5);
        assert!((mid.pz - 1.5).abs() < 1e-12);
        assert!((mid.beta - 0.6).abs() < 1e-12);
        assert_eq!(a.lerp(&b, 0.0), a);
    }

    #[test]
    fn test_serde_field_names() {
        let json = serde_json::to_string(&sample()).unwrap_or_default();
        assert!(json.contains("\"p_gamma\":0.03"));
        let component = serde_json::to_string(&StateComponent::PAlpha).unwrap_or_default();
        assert_eq!(component, "\"p_alpha\"");
    }
}
