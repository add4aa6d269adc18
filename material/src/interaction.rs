use geometry::sampling;
use math::hcm::Vec3;
use radiometry::RadiationType;
use rand::Rng;
use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionType {
    Absorption,
    Scattering,
    Capture,
    Transmission,
}

/// Branch probabilities and energy loss used when sampling collisions.
///
/// These are heuristic parameters of the simplified physics, not nuclear data. A uniform draw
/// below the scatter probability for the particle's type scatters it; otherwise gammas and
/// charged particles are absorbed and neutrons captured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionModel {
    pub gamma_scatter_probability: f32,
    pub neutron_scatter_probability: f32,
    pub default_scatter_probability: f32,
    /// Maximum fraction of the energy lost in one scatter.
    pub scatter_energy_loss: f32,
}

impl Default for InteractionModel {
    fn default() -> Self {
        Self {
            gamma_scatter_probability: 0.7,
            neutron_scatter_probability: 0.5,
            default_scatter_probability: 0.8,
            scatter_energy_loss: 0.1,
        }
    }
}

impl InteractionModel {
    pub fn scatter_probability(&self, kind: RadiationType) -> f32 {
        match kind {
            RadiationType::Gamma => self.gamma_scatter_probability,
            RadiationType::Neutron => self.neutron_scatter_probability,
            _ => self.default_scatter_probability,
        }
    }

    /// Picks the interaction for a collision in a medium with attenuation `mu`.
    /// A non-attenuating medium always transmits.
    pub fn sample<R: Rng + ?Sized>(&self, kind: RadiationType, mu: f32, rng: &mut R) -> InteractionType {
        if mu <= 0.0 {
            return InteractionType::Transmission;
        }
        let xi = rng.gen::<f32>();
        if xi < self.scatter_probability(kind) {
            InteractionType::Scattering
        } else if kind == RadiationType::Neutron {
            InteractionType::Capture
        } else {
            InteractionType::Absorption
        }
    }

    /// Energy lost in one scatter: a uniform fraction of `scatter_energy_loss * energy`.
    pub fn sample_energy_loss<R: Rng + ?Sized>(&self, energy: f32, rng: &mut R) -> f32 {
        self.scatter_energy_loss * energy.max(0.0) * rng.gen::<f32>()
    }
}

/// Samples the direction after a scatter. Photons get a uniform polar cosine around the incident
/// direction; every other particle leaves isotropically.
pub fn sample_scattering<R: Rng + ?Sized>(incident: Vec3, kind: RadiationType, rng: &mut R) -> Vec3 {
    if kind.is_photon() {
        let cos_theta = rng.gen_range(-1.0f32..=1.0);
        let phi = rng.gen::<f32>() * 2.0 * PI;
        match incident.try_hat() {
            Some(w) => sampling::deflect(w, cos_theta, phi),
            None => uniform_direction(rng),
        }
    } else {
        uniform_direction(rng)
    }
}

/// Isotropic unit vector.
pub fn uniform_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    sampling::uniform_sphere((rng.gen(), rng.gen()))
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn transmission_without_attenuation() {
        let mut rng = StdRng::seed_from_u64(1);
        let model = InteractionModel::default();
        for kind in RadiationType::ALL.iter().copied() {
            assert_eq!(model.sample(kind, 0.0, &mut rng), InteractionType::Transmission);
        }
    }

    #[test]
    fn branch_frequencies_follow_the_model() {
        let mut rng = StdRng::seed_from_u64(7);
        let model = InteractionModel::default();
        let n = 20_000;
        let count = |kind, want, rng: &mut StdRng| {
            (0..n).filter(|_| model.sample(kind, 1.0, rng) == want).count() as f32 / n as f32
        };
        assert!((count(RadiationType::Gamma, InteractionType::Scattering, &mut rng) - 0.7).abs() < 0.02);
        assert!((count(RadiationType::Neutron, InteractionType::Capture, &mut rng) - 0.5).abs() < 0.02);
        assert!((count(RadiationType::Muon, InteractionType::Absorption, &mut rng) - 0.2).abs() < 0.02);
        assert_eq!(count(RadiationType::Neutron, InteractionType::Absorption, &mut rng), 0.0);
    }

    #[test]
    fn energy_loss_is_bounded() {
        let mut rng = StdRng::seed_from_u64(3);
        let model = InteractionModel::default();
        for _ in 0..1000 {
            let loss = model.sample_energy_loss(662.0, &mut rng);
            assert!((0.0..=66.2).contains(&loss));
        }
    }

    #[test]
    fn scattered_directions_are_unit() {
        let mut rng = StdRng::seed_from_u64(11);
        for kind in RadiationType::ALL.iter().copied() {
            for _ in 0..100 {
                let d = sample_scattering(Vec3::new(0.0, 0.6, 0.8), kind, &mut rng);
                assert!((d.norm() - 1.0).abs() < 1e-4);
            }
        }
    }
}
