//! Derived physical constants of a trapping run.
//!
//! [`ParameterSet`] is computed once from [`PhysicalInputs`] by pure
//! arithmetic and is shared read-only by every trajectory of an ensemble.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use validator::Validate;

use crate::error::{SimError, SimResult};
use crate::physics::units::{
    length_to_code, rate_to_code, PhysicalInputs, BOLTZMANN_CODE, ENERGY_DENSITY_UNIT,
    LENGTH_UNIT, MASS_UNIT, SPEED_OF_LIGHT,
};

/// Immutable bundle of derived constants, in code units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct ParameterSet {
    /// Rod mass (fg).
    #[validate(range(exclusive_min = 0.0))]
    pub mass: f64,
    /// Moment of inertia about a perpendicular axis (fg·µm²).
    #[validate(range(exclusive_min = 0.0))]
    pub inertia_i: f64,
    /// Moment of inertia about the symmetry axis (fg·µm²).
    #[validate(range(exclusive_min = 0.0))]
    pub inertia_ic: f64,
    /// Rod volume (µm³).
    #[validate(range(exclusive_min = 0.0))]
    pub volume: f64,
    /// Peak field amplitude as `sqrt(ε0)·E0` (sqrt(J/m³)).
    #[validate(range(min = 0.0))]
    pub field_amplitude: f64,
    /// Beam waist along x (µm).
    #[validate(range(exclusive_min = 0.0))]
    pub waist_x: f64,
    /// Beam waist along y (µm).
    #[validate(range(exclusive_min = 0.0))]
    pub waist_y: f64,
    /// Optical wavenumber (1/µm).
    #[validate(range(exclusive_min = 0.0))]
    pub wavenumber: f64,
    /// Susceptibility perpendicular to the rod axis.
    pub susceptibility_perp: f64,
    /// Susceptibility along the rod axis.
    #[validate(range(exclusive_min = 0.0))]
    pub susceptibility_par: f64,
    /// Susceptibility anisotropy `χ∥ − χ⊥`.
    pub susceptibility_delta: f64,
    /// Translational damping rate perpendicular to the axis (1/µs).
    #[validate(range(min = 0.0))]
    pub damping_cm_perp: f64,
    /// Translational damping rate along the axis (1/µs).
    #[validate(range(min = 0.0))]
    pub damping_cm_par: f64,
    /// Rotational damping rate about perpendicular axes (1/µs).
    #[validate(range(min = 0.0))]
    pub damping_rot_perp: f64,
    /// Rotational damping rate about the symmetry axis (1/µs).
    #[validate(range(min = 0.0))]
    pub damping_rot_par: f64,
    /// Temperature (K).
    #[validate(range(exclusive_min = 0.0))]
    pub temperature: f64,
}

impl ParameterSet {
    /// Derive the parameter set from laboratory inputs.
    ///
    /// Damping follows free-molecular gas friction with diffuse reflection on
    /// a thin cylinder: `Γcm∥ = 2 P d L / (v̄ m)`, `Γcm⊥ = (1 + π/4) Γcm∥`,
    /// `Γrot⊥ = Γcm⊥`, `Γrot∥ = 2 Γcm∥`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the derived set is non-physical.
    pub fn from_physical(inputs: &PhysicalInputs) -> SimResult<Self> {
        let length = inputs.rod_length_m();
        let diameter = inputs.rod_diameter_m();
        let (waist_x, waist_y) = inputs.waists_m();

        let volume_si = PI * diameter * diameter * length / 4.0;
        let mass_si = inputs.density_si() * volume_si;
        let inertia_i_si = mass_si * (length * length / 12.0 + diameter * diameter / 16.0);
        let inertia_ic_si = mass_si * diameter * diameter / 8.0;

        let eps = inputs.permittivity;
        let susceptibility_par = eps - 1.0;
        let susceptibility_perp = 2.0 * (eps - 1.0) / (eps + 1.0);

        let intensity = 2.0 * inputs.power_watt() / (PI * waist_x * waist_y);
        // ε0·E0² = 2 I0 / c
        let energy_density = 2.0 * intensity / SPEED_OF_LIGHT;

        let friction = if mass_si > 0.0 {
            2.0 * inputs.pressure_pascal() * diameter * length
                / (inputs.mean_gas_speed() * mass_si)
        } else {
            0.0
        };
        let damping_cm_par = rate_to_code(friction);
        let damping_cm_perp = (1.0 + PI / 4.0) * damping_cm_par;

        let length_cubed = LENGTH_UNIT * LENGTH_UNIT * LENGTH_UNIT;
        let params = Self {
            mass: mass_si / MASS_UNIT,
            inertia_i: inertia_i_si / (MASS_UNIT * LENGTH_UNIT * LENGTH_UNIT),
            inertia_ic: inertia_ic_si / (MASS_UNIT * LENGTH_UNIT * LENGTH_UNIT),
            volume: volume_si / length_cubed,
            field_amplitude: (energy_density / ENERGY_DENSITY_UNIT).sqrt(),
            waist_x: length_to_code(waist_x),
            waist_y: length_to_code(waist_y),
            wavenumber: 2.0 * PI / length_to_code(inputs.wavelength_m()),
            susceptibility_perp,
            susceptibility_par,
            susceptibility_delta: susceptibility_par - susceptibility_perp,
            damping_cm_perp,
            damping_cm_par,
            damping_rot_perp: damping_cm_perp,
            damping_rot_par: 2.0 * damping_cm_par,
            temperature: inputs.temperature_kelvin(),
        };
        params.validate_physical()?;
        Ok(params)
    }

    /// Default silicon nanorod at the given temperature (K) and pressure (mbar).
    ///
    /// # Errors
    ///
    /// Returns a configuration error for non-physical temperature or pressure.
    pub fn nanorod(temperature_kelvin: f64, pressure_mbar: f64) -> SimResult<Self> {
        Self::from_physical(&PhysicalInputs::nanorod(temperature_kelvin, pressure_mbar))
    }

    /// Check that every constant is finite and physically meaningful.
    ///
    /// # Errors
    ///
    /// Returns `Config` for non-finite fields, `Validation` for range failures.
    pub fn validate_physical(&self) -> SimResult<()> {
        let fields = [
            ("mass", self.mass),
            ("inertia_i", self.inertia_i),
            ("inertia_ic", self.inertia_ic),
            ("volume", self.volume),
            ("field_amplitude", self.field_amplitude),
            ("waist_x", self.waist_x),
            ("waist_y", self.waist_y),
            ("wavenumber", self.wavenumber),
            ("susceptibility_perp", self.susceptibility_perp),
            ("susceptibility_par", self.susceptibility_par),
            ("susceptibility_delta", self.susceptibility_delta),
            ("damping_cm_perp", self.damping_cm_perp),
            ("damping_cm_par", self.damping_cm_par),
            ("damping_rot_perp", self.damping_rot_perp),
            ("damping_rot_par", self.damping_rot_par),
            ("temperature", self.temperature),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SimError::config(format!(
                "parameter {name} must be finite, got {value}"
            )));
        }
        self.validate()?;
        Ok(())
    }

    /// Thermal energy `k_B T` in code energy units.
    #[must_use]
    pub fn kt(&self) -> f64 {
        BOLTZMANN_CODE * self.temperature
    }

    /// Depth scale of the optical potential, `V χ∥ f² / 4`.
    #[must_use]
    pub fn potential_depth(&self) -> f64 {
        self.volume * self.susceptibility_par * self.field_amplitude * self.field_amplitude / 4.0
    }

    /// Copy with a different temperature; damping is unchanged.
    #[must_use]
    pub const fn with_temperature(self, temperature: f64) -> Self {
        Self {
            temperature,
            ..self
        }
    }

    /// Copy with all damping rates set to zero (noise vanishes with them).
    #[must_use]
    pub const fn without_damping(self) -> Self {
        Self {
            damping_cm_perp: 0.0,
            damping_cm_par: 0.0,
            damping_rot_perp: 0.0,
            damping_rot_par: 0.0,
            ..self
        }
    }
}
