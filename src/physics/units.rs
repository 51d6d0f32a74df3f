//! Type-safe physical inputs and the code unit system (Poka-Yoke).
//!
//! Laboratory quantities enter through `uom` newtypes so that a waist in
//! nanometres can never be confused with one in metres. Everything past
//! [`PhysicalInputs`] runs in code units chosen to make trap dynamics O(1):
//!
//! | quantity | code unit |
//! |---|---|
//! | length | 1 µm |
//! | time | 1 µs |
//! | mass | 1 fg = 1e-18 kg |
//! | energy | 1e-18 J |
//! | energy density | 1 J/m³ |

use uom::si::f64::{Length, MassDensity, Power, Pressure, ThermodynamicTemperature};
use uom::si::length::{meter, micrometer, nanometer};
use uom::si::mass_density::kilogram_per_cubic_meter;
use uom::si::power::watt;
use uom::si::pressure::pascal;
use uom::si::thermodynamic_temperature::kelvin;

/// Boltzmann constant (J/K).
pub const BOLTZMANN: f64 = 1.380_649e-23;

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Atomic mass unit (kg).
pub const ATOMIC_MASS_UNIT: f64 = 1.660_539_066_60e-27;

/// Mean molecular mass of dry air (kg).
pub const AIR_MOLECULAR_MASS: f64 = 28.97 * ATOMIC_MASS_UNIT;

/// Code length unit in metres.
pub const LENGTH_UNIT: f64 = 1e-6;

/// Code time unit in seconds.
pub const TIME_UNIT: f64 = 1e-6;

/// Code mass unit in kilograms.
pub const MASS_UNIT: f64 = 1e-18;

/// Code energy unit in joules.
pub const ENERGY_UNIT: f64 = MASS_UNIT * LENGTH_UNIT * LENGTH_UNIT / (TIME_UNIT * TIME_UNIT);

/// Code energy-density unit in J/m³.
pub const ENERGY_DENSITY_UNIT: f64 = ENERGY_UNIT / (LENGTH_UNIT * LENGTH_UNIT * LENGTH_UNIT);

/// Boltzmann constant in code energy units per kelvin.
pub const BOLTZMANN_CODE: f64 = BOLTZMANN / ENERGY_UNIT;

/// Millibar in pascal.
pub const MILLIBAR: f64 = 100.0;

/// Laboratory description of the rod, the gas and the standing-wave trap.
///
/// The rod is a solid cylinder; the trap is a linearly (x) polarized
/// standing wave along z with an elliptical Gaussian transverse profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalInputs {
    /// Gas and rod temperature.
    pub temperature: ThermodynamicTemperature,
    /// Gas pressure.
    pub pressure: Pressure,
    /// Mass of one gas molecule (kg).
    pub gas_molecular_mass: f64,
    /// Rod length.
    pub rod_length: Length,
    /// Rod diameter.
    pub rod_diameter: Length,
    /// Rod material density.
    pub density: MassDensity,
    /// Relative permittivity of the rod material at the trap wavelength.
    pub permittivity: f64,
    /// Optical power.
    pub power: Power,
    /// Beam waist along x.
    pub waist_x: Length,
    /// Beam waist along y.
    pub waist_y: Length,
    /// Vacuum wavelength.
    pub wavelength: Length,
}

impl PhysicalInputs {
    /// Silicon nanorod in air at the given temperature and pressure.
    ///
    /// # Example
    ///
    /// ```rust
    /// use trapsim::physics::units::PhysicalInputs;
    ///
    /// let inputs = PhysicalInputs::nanorod(300.0, 1.0);
    /// assert!((inputs.temperature_kelvin() - 300.0).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn nanorod(temperature_kelvin: f64, pressure_mbar: f64) -> Self {
        Self {
            temperature: ThermodynamicTemperature::new::<kelvin>(temperature_kelvin),
            pressure: Pressure::new::<pascal>(pressure_mbar * MILLIBAR),
            gas_molecular_mass: AIR_MOLECULAR_MASS,
            rod_length: Length::new::<nanometer>(500.0),
            rod_diameter: Length::new::<nanometer>(100.0),
            density: MassDensity::new::<kilogram_per_cubic_meter>(2330.0),
            permittivity: 12.25,
            power: Power::new::<watt>(0.1),
            waist_x: Length::new::<micrometer>(1.0),
            waist_y: Length::new::<micrometer>(1.2),
            wavelength: Length::new::<nanometer>(1064.0),
        }
    }

    /// Temperature in kelvin.
    #[must_use]
    pub fn temperature_kelvin(&self) -> f64 {
        self.temperature.get::<kelvin>()
    }

    /// Pressure in pascal.
    #[must_use]
    pub fn pressure_pascal(&self) -> f64 {
        self.pressure.get::<pascal>()
    }

    /// Rod length in metres.
    #[must_use]
    pub fn rod_length_m(&self) -> f64 {
        self.rod_length.get::<meter>()
    }

    /// Rod diameter in metres.
    #[must_use]
    pub fn rod_diameter_m(&self) -> f64 {
        self.rod_diameter.get::<meter>()
    }

    /// Density in kg/m³.
    #[must_use]
    pub fn density_si(&self) -> f64 {
        self.density.get::<kilogram_per_cubic_meter>()
    }

    /// Power in watt.
    #[must_use]
    pub fn power_watt(&self) -> f64 {
        self.power.get::<watt>()
    }

    /// Waists (x, y) in metres.
    #[must_use]
    pub fn waists_m(&self) -> (f64, f64) {
        (self.waist_x.get::<meter>(), self.waist_y.get::<meter>())
    }

    /// Wavelength in metres.
    #[must_use]
    pub fn wavelength_m(&self) -> f64 {
        self.wavelength.get::<meter>()
    }

    /// Mean thermal speed of the gas molecules (m/s).
    #[must_use]
    pub fn mean_gas_speed(&self) -> f64 {
        (8.0 * BOLTZMANN * self.temperature_kelvin()
            / (std::f64::consts::PI * self.gas_molecular_mass))
            .sqrt()
    }
}

/// Convert metres to code length.
#[must_use]
pub fn length_to_code(meters: f64) -> f64 {
    meters / LENGTH_UNIT
}

/// Convert a rate in 1/s to code units (1/µs).
#[must_use]
pub fn rate_to_code(per_second: f64) -> f64 {
    per_second * TIME_UNIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_units_consistent() {
        assert!((ENERGY_UNIT - 1e-18).abs() < 1e-30);
        assert!((ENERGY_DENSITY_UNIT - 1.0).abs() < 1e-12);
        assert!((BOLTZMANN_CODE - 1.380_649e-5).abs() < 1e-15);
    }

    #[test]
    fn test_nanorod_conversions() {
        let inputs = PhysicalInputs::nanorod(300.0, 1.0);
        assert!((inputs.pressure_pascal() - 100.0).abs() < 1e-9);
        assert!((inputs.rod_length_m() - 5e-7).abs() < 1e-18);
        assert!((inputs.rod_diameter_m() - 1e-7).abs() < 1e-18);
        let (wx, wy) = inputs.waists_m();
        assert!((wx - 1e-6).abs() < 1e-18);
        assert!((wy - 1.2e-6).abs() < 1e-18);
        assert!((inputs.wavelength_m() - 1.064e-6).abs() < 1e-18);
        assert!((inputs.power_watt() - 0.1).abs() < 1e-15);
    }

    #[test]
    fn test_mean_gas_speed_air() {
        let inputs = PhysicalInputs::nanorod(300.0, 1.0);
        let v = inputs.mean_gas_speed();
        // ≈ 468 m/s for air at room temperature
        assert!((v - 468.0).abs() < 5.0, "v = {v}");
    }

    #[test]
    fn test_unit_helpers() {
        assert!((length_to_code(2e-6) - 2.0).abs() < 1e-12);
        assert!((rate_to_code(1e6) - 1.0).abs() < 1e-12);
    }
}
