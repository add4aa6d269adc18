use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("at least one worker thread is required")]
    ZeroThreads,
    #[error("particle budget must be positive")]
    ZeroParticles,
    #[error("at least one transport step per history is required")]
    ZeroBounces,
    #[error("batch size must be positive")]
    ZeroBatchSize,
    #[error("{what} must be finite and non-negative, got {value}")]
    InvalidCutoff { what: &'static str, value: f64 },
    #[error("Russian roulette threshold must be positive and finite, got {0}")]
    InvalidRouletteThreshold(f32),
    #[error("splitting factor must be at least 1")]
    ZeroSplittingFactor,
}

/// Parameters of a simulation run. Field names are camelCase when (de)serialized; missing fields
/// take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfig {
    /// Number of primary particles emitted per run.
    pub max_particles: u64,
    /// Transport steps after which a history is truncated.
    pub max_bounces: u32,
    /// keV; particles below are absorbed.
    pub energy_cutoff: f32,
    /// ns; particles older than this escape.
    pub time_cutoff: f64,
    pub num_threads: usize,
    pub use_russian_roulette: bool,
    pub russian_roulette_threshold: f32,
    pub use_splitting: bool,
    pub splitting_factor: u32,
    pub max_split_generation: u32,
    /// Emission slots a worker claims at once.
    pub batch_size: u64,
    /// Fixed seed for reproducible runs; each worker or batch derives its own stream from it.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_particles: 1_000_000,
            max_bounces: 100,
            energy_cutoff: 1.0,
            time_cutoff: 1e6,
            num_threads: default_num_threads(),
            use_russian_roulette: true,
            russian_roulette_threshold: 0.1,
            use_splitting: false,
            splitting_factor: 2,
            max_split_generation: 3,
            batch_size: 1000,
            seed: None,
        }
    }
}

pub fn default_num_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if self.max_particles == 0 {
            return Err(ConfigError::ZeroParticles);
        }
        if self.max_bounces == 0 {
            return Err(ConfigError::ZeroBounces);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        let energy_cutoff = self.energy_cutoff as f64;
        if !(energy_cutoff.is_finite() && energy_cutoff >= 0.0) {
            return Err(ConfigError::InvalidCutoff {
                what: "energy cutoff",
                value: energy_cutoff,
            });
        }
        if !(self.time_cutoff.is_finite() && self.time_cutoff >= 0.0) {
            return Err(ConfigError::InvalidCutoff {
                what: "time cutoff",
                value: self.time_cutoff,
            });
        }
        let threshold = self.russian_roulette_threshold;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(ConfigError::InvalidRouletteThreshold(threshold));
        }
        if self.splitting_factor == 0 {
            return Err(ConfigError::ZeroSplittingFactor);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.max_particles, 1_000_000);
        assert!(config.num_threads >= 1);
        assert!(!config.use_splitting);
    }

    #[test]
    fn rejects_bad_values() {
        let base = SimulationConfig::default();
        let cases = [
            (SimulationConfig { num_threads: 0, ..base.clone() }, ConfigError::ZeroThreads),
            (SimulationConfig { max_particles: 0, ..base.clone() }, ConfigError::ZeroParticles),
            (SimulationConfig { batch_size: 0, ..base.clone() }, ConfigError::ZeroBatchSize),
            (
                SimulationConfig { russian_roulette_threshold: 0.0, ..base.clone() },
                ConfigError::InvalidRouletteThreshold(0.0),
            ),
            (SimulationConfig { splitting_factor: 0, ..base.clone() }, ConfigError::ZeroSplittingFactor),
        ];
        for (config, expected) in cases.iter() {
            assert_eq!(config.validate().as_ref(), Err(expected));
        }
        let negative = SimulationConfig { energy_cutoff: -1.0, ..base.clone() };
        assert!(matches!(negative.validate(), Err(ConfigError::InvalidCutoff { .. })));
        let nan = SimulationConfig { time_cutoff: f64::NAN, ..base };
        assert!(matches!(nan.validate(), Err(ConfigError::InvalidCutoff { .. })));
    }
}
