use geometry::Ray;
use material::{InteractionType, Material, MaterialCatalog};
use radiometry::{Particle, ParticleState};
use rand::Rng;
use scene::{Scene, Sensor};
use source::Source;
use tlas::ObjectId;

use crate::config::SimulationConfig;
use crate::control::RunControl;
use crate::stats::StatsSnapshot;
use crate::EngineError;

/// Rays start this far from their origin so that a particle resting on a surface doesn't hit it
/// again.
pub const RAY_T_MIN: f32 = 1e-4;

/// How one history ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportOutcome {
    /// Final state of the primary particle. Stays non-terminal only if the run was stopped.
    pub state: ParticleState,
    /// Transport steps taken by the primary particle.
    pub steps: u32,
    /// The primary was absorbed because it reached the step limit.
    pub truncated: bool,
    /// Split copies created during the history, all of which were transported too.
    pub split_copies: u32,
}

/// Solids the particle is currently inside, outermost first. The last entry is the medium.
type MediumStack = Vec<ObjectId>;

/// Transports particles through a scene. Borrowing everything it needs, it is cheap to create per
/// worker or per batch.
pub(crate) struct Transport<'a> {
    scene: &'a Scene,
    materials: &'a MaterialCatalog,
    config: &'a SimulationConfig,
    control: Option<&'a RunControl>,
}

impl<'a> Transport<'a> {
    pub fn new(scene: &'a Scene, materials: &'a MaterialCatalog, config: &'a SimulationConfig) -> Self {
        Self {
            scene,
            materials,
            config,
            control: None,
        }
    }

    /// Makes every transport step a pause/stop checkpoint of `control`.
    pub fn with_control(self, control: &'a RunControl) -> Self {
        Self {
            control: Some(control),
            ..self
        }
    }

    fn stop_requested(&self) -> bool {
        self.control.map_or(false, |c| c.stop_requested())
    }

    /// Emits `count` particles, each from a source picked uniformly among `sources`, and
    /// transports them. Returns early if a stop is requested.
    pub fn run_emissions<R: Rng + ?Sized>(
        &self, sources: &[&Source], count: u64, rng: &mut R, tally: &mut StatsSnapshot,
    ) -> Result<(), EngineError> {
        if sources.is_empty() {
            return Err(EngineError::NoEnabledSources);
        }
        for _ in 0..count {
            if self.stop_requested() {
                break;
            }
            let source = sources[rng.gen_range(0..sources.len())];
            let mut particle = source.emit(rng);
            tally.particles_emitted += 1;
            self.run_history(&mut particle, rng, tally)?;
        }
        Ok(())
    }

    /// Transports a particle, and every split copy it spawns, to termination.
    pub fn run_history<R: Rng + ?Sized>(
        &self, particle: &mut Particle, rng: &mut R, tally: &mut StatsSnapshot,
    ) -> Result<TransportOutcome, EngineError> {
        let media = self.initial_media(particle);
        let mut bank = vec![];
        let mut outcome = self.transport(particle, media, &mut bank, rng, tally)?;
        while let Some((mut copy, media)) = bank.pop() {
            if self.stop_requested() {
                break;
            }
            outcome.split_copies += 1;
            self.transport(&mut copy, media, &mut bank, rng, tally)?;
        }
        Ok(outcome)
    }

    fn initial_media(&self, particle: &Particle) -> MediumStack {
        self.scene
            .objects_containing(particle.position())
            .iter()
            .map(|o| o.id())
            .collect()
    }

    fn transport<R: Rng + ?Sized>(
        &self, p: &mut Particle, mut media: MediumStack, bank: &mut Vec<(Particle, MediumStack)>,
        rng: &mut R, tally: &mut StatsSnapshot,
    ) -> Result<TransportOutcome, EngineError> {
        let mut outcome = TransportOutcome {
            state: p.state(),
            steps: 0,
            truncated: false,
            split_copies: 0,
        };
        while !p.is_terminated() {
            if let Some(control) = self.control {
                if !control.checkpoint() {
                    outcome.state = p.state();
                    return Ok(outcome);
                }
            }
            if p.energy() < self.config.energy_cutoff {
                p.absorb();
                break;
            }
            if p.age() > self.config.time_cutoff {
                p.escape();
                break;
            }
            if outcome.steps >= self.config.max_bounces {
                p.absorb();
                outcome.truncated = true;
                break;
            }
            outcome.steps += 1;
            self.step(p, &mut media, outcome.steps == 1, bank, rng, tally)?;
            if self.config.use_russian_roulette {
                self.roulette(p, rng);
            }
        }

        tally.particles_transported += 1;
        match p.state() {
            ParticleState::Absorbed => tally.particles_absorbed += 1,
            ParticleState::Detected => tally.particles_detected += 1,
            ParticleState::Escaped => tally.particles_escaped += 1,
            ParticleState::Active | ParticleState::Scattered => (),
        }
        if outcome.truncated {
            tally.particles_truncated += 1;
        }
        outcome.state = p.state();
        Ok(outcome)
    }

    /// Moves the particle to its next event: an interaction in the current medium, a boundary
    /// crossing, detection by an absorbing sensor, or escape.
    fn step<R: Rng + ?Sized>(
        &self, p: &mut Particle, media: &mut MediumStack, fresh: bool,
        bank: &mut Vec<(Particle, MediumStack)>, rng: &mut R, tally: &mut StatsSnapshot,
    ) -> Result<(), EngineError> {
        let (origin, dir) = (p.position(), p.direction());
        if !origin.is_finite() || !dir.is_finite() || dir.is_zero() {
            p.escape();
            return Ok(());
        }
        let ray = Ray::new(origin, dir).with_t_min(RAY_T_MIN);
        tally.ray_intersections += 1;
        let hit = self.scene.intersect_ray(&ray);

        let medium = self.medium(media)?;
        let mu = medium.map_or(0.0, |m| m.linear_attenuation(p.kind(), p.energy()));
        let free_path = if mu > 0.0 {
            -(1.0 - rng.gen::<f32>()).ln() / mu
        } else {
            f32::INFINITY
        };
        let hit_distance = hit.map_or(f32::INFINITY, |h| h.hit.distance);

        if self.score_sensors(p, free_path.min(hit_distance), fresh) {
            return Ok(());
        }

        if free_path < hit_distance {
            p.move_by(free_path);
            if let Some(material) = medium {
                self.interact(p, material, rng, tally);
            }
            return Ok(());
        }

        let hit = match hit {
            Some(hit) => hit,
            None => {
                p.escape();
                return Ok(());
            }
        };
        p.move_by(hit.hit.distance);
        let object = self
            .scene
            .object_by_id(hit.object)
            .ok_or(EngineError::MissingObject(hit.object))?;
        let material = hit.material.and_then(|id| self.materials.get(id));
        if object.is_solid() {
            match media.iter().rposition(|&id| id == hit.object) {
                Some(i) => {
                    media.remove(i);
                }
                None => {
                    media.push(hit.object);
                    if self.config.use_splitting && material.is_some() {
                        self.split(p, media, bank);
                    }
                }
            }
        } else if let Some(material) = material {
            self.interact(p, material, rng, tally);
        }
        Ok(())
    }

    /// Material of the innermost solid, `None` for vacuum.
    fn medium(&self, media: &[ObjectId]) -> Result<Option<&'a Material>, EngineError> {
        let id = match media.last() {
            Some(&id) => id,
            None => return Ok(None),
        };
        let object = self
            .scene
            .object_by_id(id)
            .ok_or(EngineError::MissingObject(id))?;
        Ok(object.material().and_then(|m| self.materials.get(m)))
    }

    /// Tallies the sensors entered within `length` of the particle, nearest first. Returns true if
    /// an absorbing sensor stopped the particle. A sensor already containing the particle only
    /// counts on the first step of its history.
    fn score_sensors(&self, p: &mut Particle, length: f32, fresh: bool) -> bool {
        let (origin, dir) = (p.position(), p.direction());
        let particle: &Particle = p;
        let mut crossings: Vec<(f32, &Sensor)> = self
            .scene
            .sensors()
            .iter()
            .filter(|s| s.accepts(particle))
            .filter_map(|s| s.intersects_segment(origin, dir, length).map(|t| (t, s)))
            .filter(|&(t, _)| t > 0.0 || fresh)
            .collect();
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (t, sensor) in crossings {
            sensor.record(p);
            if sensor.is_absorbing() {
                p.move_by(t);
                p.detect();
                return true;
            }
        }
        false
    }

    fn interact<R: Rng + ?Sized>(
        &self, p: &mut Particle, material: &Material, rng: &mut R, tally: &mut StatsSnapshot,
    ) {
        let (kind, energy) = (p.kind(), p.energy());
        match material.sample_interaction(kind, energy, rng) {
            InteractionType::Transmission => (),
            InteractionType::Absorption | InteractionType::Capture => {
                tally.total_collisions += 1;
                p.absorb();
            }
            InteractionType::Scattering => {
                tally.total_collisions += 1;
                let direction = material.sample_scattering(p.direction(), kind, energy, rng);
                let loss = material.sample_energy_loss(energy, rng);
                p.scatter(direction, loss);
                if p.energy() <= 0.0 {
                    p.absorb();
                }
            }
        }
    }

    /// Turns the particle into `splitting_factor` copies sharing its weight.
    fn split(&self, p: &mut Particle, media: &[ObjectId], bank: &mut Vec<(Particle, MediumStack)>) {
        let factor = self.config.splitting_factor;
        if factor < 2 || p.generation() >= self.config.max_split_generation {
            return;
        }
        let weight = p.weight() / factor as f32;
        for _ in 1..factor {
            bank.push((p.split_copy(weight), media.to_vec()));
        }
        p.set_weight(weight);
        p.set_generation(p.generation() + 1);
    }

    /// Russian roulette: a particle lighter than the threshold survives with probability
    /// `w / threshold` and then carries the threshold weight.
    fn roulette<R: Rng + ?Sized>(&self, p: &mut Particle, rng: &mut R) {
        let threshold = self.config.russian_roulette_threshold;
        let weight = p.weight();
        if p.is_terminated() || weight >= threshold {
            return;
        }
        let survival = (weight / threshold).min(1.0);
        if survival > 0.0 && rng.gen::<f32>() < survival {
            p.set_weight(weight / survival);
        } else {
            p.absorb();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use math::hcm::{point3, vec3, Point3, Vec3};
    use material::{AttenuationSample, InteractionModel};
    use radiometry::RadiationType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shape::{Cuboid, Sphere};
    use tlas::Object3D;

    fn absorber(mu: f32, scatter: f32) -> Material {
        let mut m = Material::new("absorber", 1.0).unwrap();
        for e in [1.0, 1e4] {
            m.add_attenuation(RadiationType::Gamma, AttenuationSample::linear(e, mu)).unwrap();
        }
        m.set_interaction_model(InteractionModel {
            gamma_scatter_probability: scatter,
            ..InteractionModel::default()
        });
        m
    }

    fn base_config() -> SimulationConfig {
        SimulationConfig {
            use_russian_roulette: false,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn vacuum_particle_escapes_in_one_step() {
        let scene = Scene::new();
        let materials = MaterialCatalog::new();
        let config = base_config();
        let transport = Transport::new(&scene, &materials, &config);
        let mut p = Particle::new(RadiationType::Gamma, 100.0, Point3::ORIGIN, Vec3::X);
        let mut tally = StatsSnapshot::default();
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = transport.run_history(&mut p, &mut rng, &mut tally).unwrap();
        assert_eq!(outcome.state, ParticleState::Escaped);
        assert_eq!(outcome.steps, 1);
        assert_eq!(tally.particles_escaped, 1);
        assert_eq!(tally.ray_intersections, 1);
    }

    #[test]
    fn born_inside_a_black_absorber_is_absorbed() {
        let mut materials = MaterialCatalog::new();
        let id = materials.add(absorber(1e4, 0.0)).unwrap();
        let mut scene = Scene::new();
        scene
            .add_object(Object3D::new("block", Cuboid::new(vec3(10.0, 10.0, 10.0)).unwrap()).with_material(id))
            .unwrap();
        scene.build_acceleration_structure();
        let config = base_config();
        let transport = Transport::new(&scene, &materials, &config);
        let mut rng = StdRng::seed_from_u64(1);
        let mut tally = StatsSnapshot::default();
        for _ in 0..100 {
            let mut p = Particle::new(RadiationType::Gamma, 100.0, Point3::ORIGIN, Vec3::Y);
            transport.run_history(&mut p, &mut rng, &mut tally).unwrap();
            assert_eq!(p.state(), ParticleState::Absorbed);
            assert!(p.position().distance_to(Point3::ORIGIN) < 0.01);
        }
        assert_eq!(tally.total_collisions, 100);
    }

    #[test]
    fn energy_and_step_limits_terminate() {
        let scene = Scene::new();
        let materials = MaterialCatalog::new();
        let config = SimulationConfig {
            energy_cutoff: 50.0,
            ..base_config()
        };
        let transport = Transport::new(&scene, &materials, &config);
        let mut rng = StdRng::seed_from_u64(2);
        let mut tally = StatsSnapshot::default();
        let mut p = Particle::new(RadiationType::Gamma, 10.0, Point3::ORIGIN, Vec3::X);
        let outcome = transport.run_history(&mut p, &mut rng, &mut tally).unwrap();
        assert_eq!(outcome.state, ParticleState::Absorbed);
        assert_eq!(outcome.steps, 0);

        // A scattering-only medium with a tiny mean free path runs into the step limit.
        let mut materials = MaterialCatalog::new();
        let id = materials.add(absorber(100.0, 1.0)).unwrap();
        let mut scene = Scene::new();
        scene
            .add_object(Object3D::new("fog", Sphere::new(100.0).unwrap()).with_material(id))
            .unwrap();
        let config = SimulationConfig {
            max_bounces: 20,
            energy_cutoff: 0.0,
            ..base_config()
        };
        let transport = Transport::new(&scene, &materials, &config);
        let mut p = Particle::new(RadiationType::Gamma, 1000.0, Point3::ORIGIN, Vec3::X);
        let outcome = transport.run_history(&mut p, &mut rng, &mut tally).unwrap();
        assert!(outcome.truncated);
        assert_eq!(outcome.steps, 20);
        assert_eq!(outcome.state, ParticleState::Absorbed);
        assert_eq!(tally.particles_truncated, 1);
    }

    #[test]
    fn absorbing_sensor_stops_particle_at_entry() {
        let materials = MaterialCatalog::new();
        let mut scene = Scene::new();
        scene
            .add_sensor(Sensor::point("passive", point3(3.0, 0.0, 0.0), 0.5))
            .unwrap();
        scene
            .add_sensor(Sensor::volume("wall", point3(10.0, 0.0, 0.0), vec3(2.0, 4.0, 4.0)).absorbing())
            .unwrap();
        let config = base_config();
        let transport = Transport::new(&scene, &materials, &config);
        let mut rng = StdRng::seed_from_u64(3);
        let mut tally = StatsSnapshot::default();
        let mut p = Particle::new(RadiationType::Gamma, 100.0, Point3::ORIGIN, Vec3::X);
        transport.run_history(&mut p, &mut rng, &mut tally).unwrap();
        assert_eq!(p.state(), ParticleState::Detected);
        assert!((p.position().x - 9.0).abs() < 1e-4);
        assert_eq!(scene.sensor("passive").unwrap().tally().total_counts, 1);
        assert_eq!(scene.sensor("wall").unwrap().tally().total_counts, 1);
        assert_eq!(tally.particles_detected, 1);
    }

    #[test]
    fn splitting_conserves_weight() {
        let mut materials = MaterialCatalog::new();
        let id = materials.add(absorber(1e-6, 0.0)).unwrap();
        let mut scene = Scene::new();
        for (i, x) in [5.0f32, 10.0, 15.0, 20.0].iter().enumerate() {
            let block = Object3D::new(&format!("block{}", i), Cuboid::new(vec3(1.0, 4.0, 4.0)).unwrap())
                .with_transform(geometry::InstanceTransform::translater(vec3(*x, 0.0, 0.0)))
                .with_material(id);
            scene.add_object(block).unwrap();
        }
        scene
            .add_sensor(Sensor::volume("end", point3(30.0, 0.0, 0.0), vec3(1.0, 4.0, 4.0)).absorbing())
            .unwrap();
        scene.build_acceleration_structure();
        let config = SimulationConfig {
            use_splitting: true,
            splitting_factor: 2,
            max_split_generation: 3,
            ..base_config()
        };
        let transport = Transport::new(&scene, &materials, &config);
        let mut rng = StdRng::seed_from_u64(4);
        let mut tally = StatsSnapshot::default();
        let mut p = Particle::new(RadiationType::Gamma, 100.0, Point3::ORIGIN, Vec3::X);
        let outcome = transport.run_history(&mut p, &mut rng, &mut tally).unwrap();
        // Three generations of binary splits.
        assert_eq!(outcome.split_copies, 7);
        assert_eq!(tally.particles_transported, 8);
        assert_eq!(tally.particles_detected, 8);
        let end = scene.sensor("end").unwrap().tally();
        assert!((end.weighted_counts - 1.0).abs() < 1e-6);
        assert_eq!(p.generation(), 3);
    }

    #[test]
    fn scatter_down_to_zero_energy_absorbs() {
        let mut materials = MaterialCatalog::new();
        let mut fog = absorber(100.0, 1.0);
        fog.set_interaction_model(InteractionModel {
            gamma_scatter_probability: 1.0,
            scatter_energy_loss: 5.0,
            ..InteractionModel::default()
        });
        let id = materials.add(fog).unwrap();
        let mut scene = Scene::new();
        scene
            .add_object(Object3D::new("fog", Sphere::new(100.0).unwrap()).with_material(id))
            .unwrap();
        let config = SimulationConfig {
            max_bounces: 200,
            energy_cutoff: 0.0,
            ..base_config()
        };
        let transport = Transport::new(&scene, &materials, &config);
        let mut rng = StdRng::seed_from_u64(5);
        let mut tally = StatsSnapshot::default();
        for _ in 0..20 {
            let mut p = Particle::new(RadiationType::Gamma, 1000.0, Point3::ORIGIN, Vec3::X);
            let outcome = transport.run_history(&mut p, &mut rng, &mut tally).unwrap();
            assert_eq!(outcome.state, ParticleState::Absorbed);
            assert!(!outcome.truncated);
            assert!(outcome.steps < 200, "{} steps", outcome.steps);
            assert_eq!(p.energy(), 0.0);
        }
        assert_eq!(tally.particles_truncated, 0);
    }
}
