use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result};

use crate::constants::*;

/// Kinds of ionizing radiation the simulator transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RadiationType {
    Gamma,
    Neutron,
    Muon,
    XRay,
    Beta,
    Alpha,
}

impl RadiationType {
    pub const ALL: [RadiationType; 6] = [
        RadiationType::Gamma,
        RadiationType::Neutron,
        RadiationType::Muon,
        RadiationType::XRay,
        RadiationType::Beta,
        RadiationType::Alpha,
    ];

    /// Rest energy in keV; zero for photons.
    pub fn rest_energy(self) -> f32 {
        match self {
            RadiationType::Gamma | RadiationType::XRay => 0.0,
            RadiationType::Neutron => NEUTRON_REST_ENERGY,
            RadiationType::Muon => MUON_REST_ENERGY,
            RadiationType::Beta => ELECTRON_REST_ENERGY,
            RadiationType::Alpha => ALPHA_REST_ENERGY,
        }
    }

    /// Electric charge in units of the elementary charge.
    pub fn charge(self) -> i32 {
        match self {
            RadiationType::Gamma | RadiationType::XRay | RadiationType::Neutron => 0,
            RadiationType::Muon | RadiationType::Beta => -1,
            RadiationType::Alpha => 2,
        }
    }

    /// Number of nucleons.
    pub fn mass_number(self) -> u32 {
        match self {
            RadiationType::Neutron => 1,
            RadiationType::Alpha => 4,
            _ => 0,
        }
    }

    pub fn is_photon(self) -> bool {
        matches!(self, RadiationType::Gamma | RadiationType::XRay)
    }

    /// Speed in cm/ns of a particle of this type with the given kinetic energy (keV).
    /// Photons travel at the speed of light; massive particles follow relativistic kinematics.
    pub fn speed(self, kinetic_energy: f32) -> f64 {
        if self.is_photon() {
            return SPEED_OF_LIGHT;
        }
        let rest = self.rest_energy() as f64;
        let gamma = (kinetic_energy.max(0.0) as f64 + rest) / rest;
        let beta = (1.0 - 1.0 / (gamma * gamma)).max(0.0).sqrt();
        beta * SPEED_OF_LIGHT
    }

    /// Momentum in keV/c.
    pub fn momentum(self, kinetic_energy: f32) -> f32 {
        let e = kinetic_energy.max(0.0);
        if self.is_photon() {
            e
        } else {
            // pc = sqrt(T^2 + 2 T mc^2)
            (e * e + 2.0 * e * self.rest_energy()).sqrt()
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RadiationType::Gamma => "gamma",
            RadiationType::Neutron => "neutron",
            RadiationType::Muon => "muon",
            RadiationType::XRay => "x-ray",
            RadiationType::Beta => "beta",
            RadiationType::Alpha => "alpha",
        }
    }
}

impl Display for RadiationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use math::assert_lt;

    #[test]
    fn photons_travel_at_light_speed() {
        assert_eq!(RadiationType::Gamma.speed(662.0), SPEED_OF_LIGHT);
        assert_eq!(RadiationType::XRay.speed(0.0), SPEED_OF_LIGHT);
    }

    #[test]
    fn massive_speeds() {
        // A 1 MeV muon is far from relativistic; a 1 GeV one almost is.
        let slow = RadiationType::Muon.speed(1000.0);
        let fast = RadiationType::Muon.speed(1.0e6);
        assert_lt!(slow, 0.2 * SPEED_OF_LIGHT);
        assert_lt!(0.99 * SPEED_OF_LIGHT, fast);
        assert_lt!(fast, SPEED_OF_LIGHT);
        // Thermal-ish neutron: non-relativistic limit v = c sqrt(2T/m).
        let v = RadiationType::Neutron.speed(1.0);
        let classical = SPEED_OF_LIGHT * (2.0 / NEUTRON_REST_ENERGY as f64).sqrt();
        assert!((v - classical).abs() / classical < 1e-3, "{} vs {}", v, classical);
        assert_eq!(RadiationType::Alpha.speed(0.0), 0.0);
    }

    #[test]
    fn charges_and_nucleons() {
        assert_eq!(RadiationType::Alpha.charge(), 2);
        assert_eq!(RadiationType::Alpha.mass_number(), 4);
        assert_eq!(RadiationType::Beta.charge(), -1);
        assert_eq!(RadiationType::Gamma.momentum(100.0), 100.0);
    }
}
