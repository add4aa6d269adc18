use std::fmt::{Display, Formatter};

use math::hcm::{Point3, Vec3};

use crate::radiation::RadiationType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleState {
    Active,
    Absorbed,
    Detected,
    Escaped,
    /// Transient state between a collision and the particle resuming transport.
    Scattered,
}

impl ParticleState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ParticleState::Absorbed | ParticleState::Detected | ParticleState::Escaped
        )
    }
}

/// A single history being transported through the scene.
///
/// The radiation type never changes. Energy and weight stay non-negative, and the direction is
/// kept at unit length by every mutator. Once the particle is absorbed, detected or escaped,
/// further transitions are ignored.
#[derive(Debug, Clone)]
pub struct Particle {
    kind: RadiationType,
    energy: f32,
    position: Point3,
    direction: Vec3,
    weight: f32,
    state: ParticleState,
    generation: u32,
    /// ns
    age: f64,
    /// cm
    path_length: f32,
    collisions: u32,
}

impl Particle {
    pub fn new(kind: RadiationType, energy: f32, position: Point3, direction: Vec3) -> Self {
        Self {
            kind,
            energy: energy.max(0.0),
            position,
            direction: direction.try_hat().unwrap_or(Vec3::Z),
            weight: 1.0,
            state: ParticleState::Active,
            generation: 0,
            age: 0.0,
            path_length: 0.0,
            collisions: 0,
        }
    }

    pub fn kind(&self) -> RadiationType {
        self.kind
    }
    pub fn energy(&self) -> f32 {
        self.energy
    }
    pub fn position(&self) -> Point3 {
        self.position
    }
    pub fn direction(&self) -> Vec3 {
        self.direction
    }
    pub fn weight(&self) -> f32 {
        self.weight
    }
    pub fn state(&self) -> ParticleState {
        self.state
    }
    pub fn generation(&self) -> u32 {
        self.generation
    }
    pub fn age(&self) -> f64 {
        self.age
    }
    pub fn path_length(&self) -> f32 {
        self.path_length
    }
    pub fn collisions(&self) -> u32 {
        self.collisions
    }

    pub fn set_energy(&mut self, energy: f32) {
        self.energy = energy.max(0.0);
    }
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight.max(0.0);
    }
    pub fn set_position(&mut self, position: Point3) {
        self.position = position;
    }
    /// Zero or non-finite directions are ignored.
    pub fn set_direction(&mut self, direction: Vec3) {
        if let Some(d) = direction.try_hat() {
            self.direction = d;
        }
    }
    pub fn set_generation(&mut self, generation: u32) {
        self.generation = generation;
    }

    /// Active and carrying energy.
    pub fn is_active(&self) -> bool {
        self.state == ParticleState::Active && self.energy > 0.0
    }
    pub fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }

    /// Advances the particle along its direction. Path length grows by `distance` and the age by
    /// the flight time at the current speed; a particle at rest does not age.
    pub fn move_by(&mut self, distance: f32) {
        self.position += self.direction * distance;
        self.path_length += distance;
        let speed = self.velocity();
        if speed > 0.0 {
            self.age += distance as f64 / speed;
        }
    }

    /// Sets a new direction after a collision and removes `energy_loss` from the energy, flooring
    /// at zero. The particle passes through `Scattered` and resumes as `Active` if energy
    /// remains.
    pub fn scatter(&mut self, new_direction: Vec3, energy_loss: f32) {
        if self.is_terminated() {
            return;
        }
        self.set_direction(new_direction);
        self.energy = (self.energy - energy_loss).max(0.0);
        self.collisions += 1;
        self.state = ParticleState::Scattered;
        if self.energy > 0.0 {
            self.state = ParticleState::Active;
        }
    }

    pub fn absorb(&mut self) {
        if !self.is_terminated() {
            self.state = ParticleState::Absorbed;
            self.energy = 0.0;
        }
    }
    pub fn detect(&mut self) {
        if !self.is_terminated() {
            self.state = ParticleState::Detected;
        }
    }
    pub fn escape(&mut self) {
        if !self.is_terminated() {
            self.state = ParticleState::Escaped;
        }
    }

    /// Copy used by splitting: same phase-space point, given weight, next generation.
    pub fn split_copy(&self, weight: f32) -> Self {
        let mut copy = self.clone();
        copy.set_weight(weight);
        copy.generation = self.generation + 1;
        copy
    }

    /// Speed in cm/ns.
    pub fn velocity(&self) -> f64 {
        self.kind.speed(self.energy)
    }
    /// keV/c
    pub fn momentum(&self) -> f32 {
        self.kind.momentum(self.energy)
    }
    /// keV/c^2
    pub fn rest_mass(&self) -> f32 {
        self.kind.rest_energy()
    }
    pub fn charge(&self) -> i32 {
        self.kind.charge()
    }
    pub fn mass_number(&self) -> u32 {
        self.kind.mass_number()
    }
}

impl Display for Particle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Particle{{{} E={:.2}keV pos={} dir={} w={:.3} state={:?} gen={} age={:.3}ns \
             path={:.3}cm collisions={}}}",
            self.kind,
            self.energy,
            self.position,
            self.direction,
            self.weight,
            self.state,
            self.generation,
            self.age,
            self.path_length,
            self.collisions
        )
    }
}
