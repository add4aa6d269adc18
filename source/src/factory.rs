use geometry::sampling;
use math::hcm::{Point3, Vec3};
use radiometry::{Particle, RadiationType};
use rand::Rng;

pub fn gamma(energy: f32, position: Point3, direction: Vec3) -> Particle {
    Particle::new(RadiationType::Gamma, energy, position, direction)
}
pub fn neutron(energy: f32, position: Point3, direction: Vec3) -> Particle {
    Particle::new(RadiationType::Neutron, energy, position, direction)
}
pub fn muon(energy: f32, position: Point3, direction: Vec3) -> Particle {
    Particle::new(RadiationType::Muon, energy, position, direction)
}
pub fn xray(energy: f32, position: Point3, direction: Vec3) -> Particle {
    Particle::new(RadiationType::XRay, energy, position, direction)
}
pub fn beta(energy: f32, position: Point3, direction: Vec3) -> Particle {
    Particle::new(RadiationType::Beta, energy, position, direction)
}
pub fn alpha(energy: f32, position: Point3, direction: Vec3) -> Particle {
    Particle::new(RadiationType::Alpha, energy, position, direction)
}

fn isotropic<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    sampling::uniform_sphere((rng.gen(), rng.gen()))
}

/// Muon between 1 MeV and 1 GeV heading mostly down (-y) with a small lateral spread.
pub fn cosmic_muon<R: Rng + ?Sized>(position: Point3, rng: &mut R) -> Particle {
    let energy = rng.gen_range(1.0e3..1.0e6);
    let direction = Vec3::new(rng.gen_range(-0.2..0.2), -1.0, rng.gen_range(-0.2..0.2));
    muon(energy, position, direction)
}

/// Isotropic gamma between 100 keV and 10 MeV.
pub fn cosmic_gamma<R: Rng + ?Sized>(position: Point3, rng: &mut R) -> Particle {
    let energy = rng.gen_range(100.0..1.0e4);
    gamma(energy, position, isotropic(rng))
}

/// Terrestrial background gamma between 50 keV and 3 MeV.
pub fn background_gamma<R: Rng + ?Sized>(position: Point3, rng: &mut R) -> Particle {
    let energy = rng.gen_range(50.0..3.0e3);
    gamma(energy, position, isotropic(rng))
}

/// Radon progeny: the 5.49 MeV alpha of Rn-222 four times out of five, otherwise an associated
/// gamma between 100 keV and 1 MeV.
pub fn radon_decay<R: Rng + ?Sized>(position: Point3, rng: &mut R) -> Particle {
    if rng.gen::<f32>() < 0.8 {
        alpha(5490.0, position, isotropic(rng))
    } else {
        let energy = rng.gen_range(100.0..1.0e3);
        gamma(energy, position, isotropic(rng))
    }
}
