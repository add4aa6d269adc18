/// Physical constants used by the transport code.
pub mod constants;
/// The `Particle` type and its state machine.
pub mod particle;
/// Kinds of ionizing radiation and their rest properties.
pub mod radiation;

pub use particle::{Particle, ParticleState};
pub use radiation::RadiationType;
