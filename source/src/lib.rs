/// Particle constructors for each radiation type and for common natural backgrounds.
pub mod factory;
mod spectrum;

use std::sync::atomic::{AtomicU64, Ordering};

use geometry::sampling;
use math::hcm::{Point3, Vec3};
use radiometry::{Particle, RadiationType};
use rand::Rng;
use thiserror::Error;

pub use spectrum::EnergySpectrum;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("spectrum has no points")]
    EmptySpectrum,
    #[error("spectrum energies must be strictly ascending, got {0} then {1}")]
    NotAscending(f32, f32),
    #[error("spectrum energy must be positive and finite, got {0}")]
    InvalidEnergy(f32),
    #[error("spectrum intensity must be finite and non-negative, got {0}")]
    InvalidIntensity(f32),
    #[error("spectrum lines all have zero intensity")]
    ZeroIntensity,
}

/// How a source picks the starting position and direction of its particles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceKind {
    /// Emits uniformly in all directions from the source position.
    Isotropic,
    /// Emits inside a cone of half-angle `beam_angle` (radians) around the source direction.
    /// A zero angle gives a collimated beam.
    Directional { beam_angle: f32 },
    /// Emits isotropically from positions uniformly distributed in a box.
    Ambient { min: Point3, max: Point3 },
}

/// A radiation source. Emission only needs a shared reference, so one source can feed several
/// workers at once; the emitted-particle counter is atomic.
#[derive(Debug)]
pub struct Source {
    name: String,
    kind: SourceKind,
    radiation_type: RadiationType,
    position: Point3,
    direction: Vec3,
    /// Particles per second (or Bq).
    intensity: f32,
    spectrum: EnergySpectrum,
    enabled: bool,
    emitted: AtomicU64,
}

impl Clone for Source {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            radiation_type: self.radiation_type,
            position: self.position,
            direction: self.direction,
            intensity: self.intensity,
            spectrum: self.spectrum.clone(),
            enabled: self.enabled,
            emitted: AtomicU64::new(self.emitted_count()),
        }
    }
}

impl Source {
    pub fn new(name: &str, kind: SourceKind, radiation_type: RadiationType) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            radiation_type,
            position: Point3::ORIGIN,
            direction: Vec3::Z,
            intensity: 1.0,
            spectrum: EnergySpectrum::Monoenergetic(1000.0),
            enabled: true,
            emitted: AtomicU64::new(0),
        }
    }

    pub fn isotropic(name: &str, radiation_type: RadiationType) -> Self {
        Self::new(name, SourceKind::Isotropic, radiation_type)
    }
    pub fn directional(name: &str, radiation_type: RadiationType, beam_angle: f32) -> Self {
        Self::new(name, SourceKind::Directional { beam_angle }, radiation_type)
    }
    pub fn ambient(name: &str, radiation_type: RadiationType, min: Point3, max: Point3) -> Self {
        Self::new(name, SourceKind::Ambient { min, max }, radiation_type)
    }

    pub fn with_position(mut self, position: Point3) -> Self {
        self.position = position;
        self
    }
    pub fn with_direction(mut self, direction: Vec3) -> Self {
        self.set_direction(direction);
        self
    }
    pub fn with_spectrum(mut self, spectrum: EnergySpectrum) -> Self {
        self.spectrum = spectrum;
        self
    }
    pub fn with_energy(self, energy: f32) -> Self {
        self.with_spectrum(EnergySpectrum::Monoenergetic(energy))
    }
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> SourceKind {
        self.kind
    }
    pub fn radiation_type(&self) -> RadiationType {
        self.radiation_type
    }
    pub fn position(&self) -> Point3 {
        self.position
    }
    pub fn direction(&self) -> Vec3 {
        self.direction
    }
    pub fn intensity(&self) -> f32 {
        self.intensity
    }
    pub fn spectrum(&self) -> &EnergySpectrum {
        &self.spectrum
    }
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }
    pub fn set_kind(&mut self, kind: SourceKind) {
        self.kind = kind;
    }
    pub fn set_radiation_type(&mut self, radiation_type: RadiationType) {
        self.radiation_type = radiation_type;
    }
    pub fn set_position(&mut self, position: Point3) {
        self.position = position;
    }
    /// Zero directions are ignored.
    pub fn set_direction(&mut self, direction: Vec3) {
        if let Some(d) = direction.try_hat() {
            self.direction = d;
        }
    }
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }
    pub fn set_spectrum(&mut self, spectrum: EnergySpectrum) {
        self.spectrum = spectrum;
    }
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn emitted_count(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
    pub fn reset_stats(&self) {
        self.emitted.store(0, Ordering::Relaxed);
    }

    pub fn sample_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Point3 {
        match self.kind {
            SourceKind::Ambient { min, max } => Point3::new(
                uniform_between(min.x, max.x, rng),
                uniform_between(min.y, max.y, rng),
                uniform_between(min.z, max.z, rng),
            ),
            _ => self.position,
        }
    }

    pub fn sample_direction<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        match self.kind {
            SourceKind::Isotropic | SourceKind::Ambient { .. } => {
                sampling::uniform_sphere((rng.gen(), rng.gen()))
            }
            SourceKind::Directional { beam_angle } if beam_angle <= 0.0 => self.direction,
            SourceKind::Directional { beam_angle } => {
                let local = sampling::uniform_cone(beam_angle.cos(), (rng.gen(), rng.gen()));
                sampling::to_world(local, self.direction).hat()
            }
        }
    }

    /// Creates one particle with unit weight and counts it as emitted.
    pub fn emit<R: Rng + ?Sized>(&self, rng: &mut R) -> Particle {
        let position = self.sample_position(rng);
        let direction = self.sample_direction(rng);
        let energy = self.spectrum.sample(rng);
        self.emitted.fetch_add(1, Ordering::Relaxed);
        Particle::new(self.radiation_type, energy, position, direction)
    }
}

fn uniform_between<R: Rng + ?Sized>(a: f32, b: f32, rng: &mut R) -> f32 {
    a + (b - a) * rng.gen::<f32>()
}

// Preset sources
// ------------------------------------------------------------------------------------------------

impl Source {
    /// Sea-level cosmic muons, emitted from a slab above the scene.
    pub fn cosmic_background() -> Self {
        let spectrum = EnergySpectrum::Continuous(vec![
            (1.0e3, 0.1),
            (1.0e4, 0.5),
            (1.0e5, 1.0),
            (1.0e6, 0.8),
            (1.0e7, 0.3),
        ]);
        Self::ambient(
            "Cosmic background",
            RadiationType::Muon,
            Point3::new(-50.0, 10.0, -50.0),
            Point3::new(50.0, 20.0, 50.0),
        )
        .with_intensity(170.0)
        .with_spectrum(spectrum)
    }

    /// Isotropic monoenergetic gamma emitter; `activity` in Bq.
    pub fn gamma_point(name: &str, energy: f32, activity: f32) -> Self {
        Self::isotropic(name, RadiationType::Gamma)
            .with_energy(energy)
            .with_intensity(activity)
    }

    /// Monoenergetic neutron beam with the default 0.1 rad opening; `flux` in neutrons/s.
    pub fn neutron_beam(name: &str, energy: f32, flux: f32) -> Self {
        Self::directional(name, RadiationType::Neutron, 0.1)
            .with_energy(energy)
            .with_intensity(flux)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use math::hcm::point3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn emission_counts_and_copies_state() {
        let source = Source::gamma_point("Cs-137", 662.0, 3.7e4).with_position(point3(1.0, 2.0, 3.0));
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..10 {
            let p = source.emit(&mut rng);
            assert_eq!(p.kind(), RadiationType::Gamma);
            assert_eq!(p.energy(), 662.0);
            assert_eq!(p.position(), point3(1.0, 2.0, 3.0));
            assert_eq!(p.weight(), 1.0);
        }
        assert_eq!(source.emitted_count(), 10);
        assert_eq!(source.clone().emitted_count(), 10);
        source.reset_stats();
        assert_eq!(source.emitted_count(), 0);
    }

    #[test]
    fn collimated_beam_keeps_its_direction() {
        let beam = Source::directional("beam", RadiationType::Neutron, 0.0).with_direction(Vec3::X);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(beam.sample_direction(&mut rng), Vec3::X);
    }

    #[test]
    fn cone_beam_stays_within_its_angle() {
        let beam = Source::neutron_beam("beam", 2000.0, 1e6).with_direction(Vec3::new(0.0, -1.0, 1.0));
        let axis = beam.direction();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..1000 {
            let d = beam.sample_direction(&mut rng);
            assert!(d.dot(axis) >= 0.1f32.cos() - 1e-5);
        }
    }

    #[test]
    fn ambient_positions_fill_the_box() {
        let source = Source::cosmic_background();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let p = source.emit(&mut rng);
            let pos = p.position();
            assert!((-50.0..=50.0).contains(&pos.x));
            assert!((10.0..=20.0).contains(&pos.y));
            assert!((1.0e3..=1.0e7).contains(&p.energy()));
        }
    }
}
