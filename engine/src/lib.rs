pub mod config;
mod control;
pub mod solver;
pub mod stats;
mod transport;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

use material::MaterialCatalog;
use radiometry::Particle;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use scene::Scene;
use source::Source;
use thiserror::Error;
use tlas::ObjectId;

pub use config::{ConfigError, SimulationConfig};
pub use control::SimulationState;
pub use stats::{SimulationStats, StatsSnapshot};
pub use transport::{TransportOutcome, RAY_T_MIN};

use control::RunControl;
use transport::Transport;

/// Splitting factors above this are clamped.
pub const MAX_SPLITTING_FACTOR: u32 = 16;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("a simulation is already running")]
    Busy,
    #[error("the scene changed since its acceleration structure was built")]
    StaleAccelerationStructure,
    #[error("the scene has no enabled source")]
    NoEnabledSources,
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("a ray hit object {0}, which is not in the scene")]
    MissingObject(ObjectId),
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
    #[error("could not start worker thread: {0}")]
    Spawn(String),
}

/// State shared between the engine and its workers.
#[derive(Debug)]
struct Shared {
    control: RunControl,
    stats: SimulationStats,
    /// Next unclaimed emission slot of the run.
    next_slot: AtomicU64,
    live_workers: AtomicUsize,
    last_error: Mutex<Option<String>>,
}

impl Shared {
    fn last_error(&self) -> MutexGuard<'_, Option<String>> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fail(&self, error: &EngineError) {
        log::error!("Simulation failed: {}", error);
        *self.last_error() = Some(error.to_string());
        self.control.fail();
    }
}

/// Random stream `index` of a run: seeded from `seed + index` when a seed is given, from system
/// entropy otherwise.
fn stream_rng(seed: Option<u64>, index: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index)),
        None => StdRng::from_entropy(),
    }
}

/// Number of `batch`-sized pieces needed to cover `total` items.
fn batch_count(total: u64, batch: u64) -> u64 {
    total.div_ceil(batch)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

/// Multithreaded Monte Carlo transport over a shared, read-only scene.
///
/// A run emits `max_particles` primaries from the scene's enabled sources. Workers claim
/// emission slots in batches, so every slot is emitted exactly once whatever the thread count.
/// Between transport steps each worker checks the run control, which makes pausing and
/// stopping cooperative.
pub struct MonteCarloEngine {
    scene: Arc<Scene>,
    materials: Arc<MaterialCatalog>,
    config: SimulationConfig,
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl MonteCarloEngine {
    pub fn new(scene: Arc<Scene>, materials: Arc<MaterialCatalog>) -> Self {
        Self {
            scene,
            materials,
            config: SimulationConfig::default(),
            shared: Arc::new(Shared {
                control: RunControl::new(),
                stats: SimulationStats::default(),
                next_slot: AtomicU64::new(0),
                live_workers: AtomicUsize::new(0),
                last_error: Mutex::new(None),
            }),
            workers: vec![],
        }
    }

    pub fn with_config(
        scene: Arc<Scene>, materials: Arc<MaterialCatalog>, config: SimulationConfig,
    ) -> Result<Self, EngineError> {
        let mut engine = Self::new(scene, materials);
        engine.set_config(config)?;
        Ok(engine)
    }

    pub fn scene(&self) -> &Arc<Scene> {
        &self.scene
    }
    pub fn materials(&self) -> &Arc<MaterialCatalog> {
        &self.materials
    }
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
    pub fn state(&self) -> SimulationState {
        self.shared.control.state()
    }
    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }
    /// Message of the fault that put the engine in the `Error` state.
    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error().clone()
    }

    /// Replaces the scene and materials. Rejected while a run is active.
    pub fn set_scene(&mut self, scene: Arc<Scene>, materials: Arc<MaterialCatalog>) -> Result<(), EngineError> {
        if self.is_running() {
            return Err(EngineError::Busy);
        }
        self.scene = scene;
        self.materials = materials;
        Ok(())
    }

    pub fn set_config(&mut self, config: SimulationConfig) -> Result<(), EngineError> {
        if self.is_running() {
            return Err(EngineError::Busy);
        }
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn enable_russian_roulette(&mut self, enable: bool, threshold: f32) -> Result<(), EngineError> {
        self.set_config(SimulationConfig {
            use_russian_roulette: enable,
            russian_roulette_threshold: threshold,
            ..self.config.clone()
        })
    }

    pub fn enable_splitting(&mut self, enable: bool, factor: u32) -> Result<(), EngineError> {
        let splitting_factor = if factor > MAX_SPLITTING_FACTOR {
            log::warn!("Splitting factor {} clamped to {}", factor, MAX_SPLITTING_FACTOR);
            MAX_SPLITTING_FACTOR
        } else {
            factor
        };
        self.set_config(SimulationConfig {
            use_splitting: enable,
            splitting_factor,
            ..self.config.clone()
        })
    }

    /// Checks the config and scene before a run.
    fn preflight(&self) -> Result<(), EngineError> {
        self.config.validate()?;
        if self.scene.is_acceleration_structure_dirty() {
            return Err(EngineError::StaleAccelerationStructure);
        }
        if self.scene.enabled_sources().next().is_none() {
            return Err(EngineError::NoEnabledSources);
        }
        Ok(())
    }

    // Threaded runs
    // --------------------------------------------------------------------------------------------

    pub fn start_simulation(&mut self) -> Result<(), EngineError> {
        if self.is_running() {
            return Err(EngineError::Busy);
        }
        self.join_workers();
        self.preflight()?;

        let config = &self.config;
        let batches = batch_count(config.max_particles, config.batch_size);
        let num_workers = if (config.num_threads as u64) > batches {
            log::warn!(
                "{} threads requested for {} batches; starting {} workers",
                config.num_threads,
                batches,
                batches
            );
            batches as usize
        } else {
            config.num_threads
        };

        let shared = &self.shared;
        shared.stats.reset();
        shared.stats.mark_start();
        shared.next_slot.store(0, Ordering::SeqCst);
        shared.live_workers.store(num_workers, Ordering::SeqCst);
        *shared.last_error() = None;
        if !shared.control.begin() {
            return Err(EngineError::Busy);
        }
        log::info!(
            "Starting simulation: {} particles on {} workers",
            config.max_particles,
            num_workers
        );

        for index in 0..num_workers {
            let scene = self.scene.clone();
            let materials = self.materials.clone();
            let config = self.config.clone();
            let shared = self.shared.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("transport-{}", index))
                .spawn(move || worker_main(index, &scene, &materials, &config, &shared));
            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    let error = EngineError::Spawn(e.to_string());
                    self.shared.fail(&error);
                    self.join_workers();
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    pub fn pause_simulation(&self) -> bool {
        let paused = self.shared.control.pause();
        if paused {
            log::info!("Simulation paused");
        }
        paused
    }

    pub fn resume_simulation(&self) -> bool {
        let resumed = self.shared.control.resume();
        if resumed {
            log::info!("Simulation resumed");
        }
        resumed
    }

    /// Stops the workers and waits for them to exit. An interrupted run goes back to `Idle`;
    /// `Completed` and `Error` are kept.
    pub fn stop_simulation(&mut self) {
        self.shared.control.request_stop();
        self.join_workers();
        if self.shared.control.finish(SimulationState::Idle) {
            self.shared.stats.mark_end();
            log::info!("Simulation stopped");
        }
    }

    /// Blocks until the run completes or fails, then joins the workers. A paused run must be
    /// resumed or stopped from another thread for this to return.
    pub fn wait_for_completion(&mut self) -> SimulationState {
        let state = self.shared.control.wait_until_settled();
        self.join_workers();
        state
    }

    fn join_workers(&mut self) {
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("A transport worker could not be joined");
            }
        }
    }

    /// Fraction of the particle budget emitted so far, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.state() == SimulationState::Completed {
            return 1.0;
        }
        let emitted = self.shared.stats.particles_emitted() as f64;
        (emitted / self.config.max_particles as f64).min(1.0) as f32
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.shared.stats.reset();
    }

    // Synchronous transport
    // --------------------------------------------------------------------------------------------

    /// Transports one particle (and its split copies) on the calling thread.
    pub fn transport_particle(&self, particle: &mut Particle) -> Result<TransportOutcome, EngineError> {
        let mut rng = StdRng::from_entropy();
        self.transport_particle_with_rng(particle, &mut rng)
    }

    pub fn transport_particle_with_rng<R: Rng + ?Sized>(
        &self, particle: &mut Particle, rng: &mut R,
    ) -> Result<TransportOutcome, EngineError> {
        let transport = Transport::new(&self.scene, &self.materials, &self.config);
        let mut tally = StatsSnapshot::default();
        let outcome = transport.run_history(particle, rng, &mut tally);
        self.shared.stats.add(&tally);
        outcome
    }

    /// Emits and transports `count` particles on the rayon pool and blocks until done. Each
    /// chunk of `batch_size` particles has its own random stream and tally; the tallies are
    /// merged into the engine statistics once at the end.
    pub fn run_batch(&self, count: u64) -> Result<StatsSnapshot, EngineError> {
        if self.is_running() {
            return Err(EngineError::Busy);
        }
        self.preflight()?;
        let sources: Vec<&Source> = self.scene.enabled_sources().collect();
        let (scene, materials, config) = (&*self.scene, &*self.materials, &self.config);
        let chunk = config.batch_size;
        let chunks = batch_count(count, chunk);

        self.shared.stats.mark_start_if_unset();
        let start = Instant::now();
        let tallies = (0..chunks)
            .into_par_iter()
            .map(|c| {
                let mut rng = stream_rng(config.seed, c);
                let n = chunk.min(count - c * chunk);
                let transport = Transport::new(scene, materials, config);
                let mut tally = StatsSnapshot::default();
                transport.run_emissions(&sources, n, &mut rng, &mut tally)?;
                Ok(tally)
            })
            .collect::<Result<Vec<StatsSnapshot>, EngineError>>()?;

        let mut total = StatsSnapshot::default();
        for tally in tallies.iter() {
            total.merge(tally);
        }
        total.elapsed_secs = start.elapsed().as_secs_f64();
        self.shared.stats.add(&total);
        self.shared.stats.mark_end();
        log::info!(
            "Batch of {} particles done in {:.3} s",
            count,
            total.elapsed_secs
        );
        Ok(total)
    }
}

impl Drop for MonteCarloEngine {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop_simulation();
        }
    }
}

fn worker_main(
    index: usize, scene: &Scene, materials: &MaterialCatalog, config: &SimulationConfig,
    shared: &Shared,
) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut rng = stream_rng(config.seed, index as u64);
        run_worker(scene, materials, config, shared, &mut rng)
    }));
    let failure = match result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(payload) => Some(EngineError::WorkerPanicked(panic_message(payload.as_ref()))),
    };
    if let Some(error) = failure {
        shared.fail(&error);
    }
    if shared.live_workers.fetch_sub(1, Ordering::SeqCst) == 1 {
        shared.stats.mark_end();
        if !shared.control.stop_requested() && shared.control.finish(SimulationState::Completed) {
            log::info!(
                "Simulation completed: {} particles in {:.3} s",
                shared.stats.particles_emitted(),
                shared.stats.elapsed_secs()
            );
        }
    }
}

/// Claims batches of emission slots until the budget is used up or the run is stopped. The
/// local tally is flushed after every batch.
fn run_worker(
    scene: &Scene, materials: &MaterialCatalog, config: &SimulationConfig, shared: &Shared,
    rng: &mut StdRng,
) -> Result<(), EngineError> {
    let sources: Vec<&Source> = scene.enabled_sources().collect();
    let transport = Transport::new(scene, materials, config).with_control(&shared.control);
    while shared.control.checkpoint() {
        let first = shared.next_slot.fetch_add(config.batch_size, Ordering::Relaxed);
        if first >= config.max_particles {
            break;
        }
        let last = (first + config.batch_size).min(config.max_particles);
        let mut tally = StatsSnapshot::default();
        let result = transport.run_emissions(&sources, last - first, rng, &mut tally);
        shared.stats.add(&tally);
        result?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn batch_count_rounds_up_without_overflow() {
        assert_eq!(batch_count(0, 10), 0);
        assert_eq!(batch_count(10, 10), 1);
        assert_eq!(batch_count(11, 10), 2);
        assert_eq!(batch_count(u64::MAX, 1000), u64::MAX / 1000 + 1);
        assert_eq!(batch_count(u64::MAX, u64::MAX), 1);
    }
}
