use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use engine::{EngineError, MonteCarloEngine, SimulationConfig, SimulationState};
use material::MaterialCatalog;
use math::hcm::Point3;
use scene::preset::shielding_demo;
use scene::Scene;
use shape::Sphere;
use radiometry::RadiationType;
use source::Source;
use tlas::Object3D;

fn shielding_engine(max_particles: u64) -> MonteCarloEngine {
    let (scene, materials) = shielding_demo().unwrap();
    let config = SimulationConfig {
        max_particles,
        num_threads: 2,
        batch_size: 100,
        seed: Some(1),
        ..SimulationConfig::default()
    };
    MonteCarloEngine::with_config(Arc::new(scene), Arc::new(materials), config).unwrap()
}

#[test]
fn run_to_completion() {
    let mut engine = shielding_engine(5_000);
    assert_eq!(engine.state(), SimulationState::Idle);
    assert_eq!(engine.progress(), 0.0);
    engine.start_simulation().unwrap();
    assert_eq!(engine.wait_for_completion(), SimulationState::Completed);
    assert_eq!(engine.state(), SimulationState::Completed);
    assert_eq!(engine.progress(), 1.0);

    let stats = engine.stats();
    assert_eq!(stats.particles_emitted, 5_000);
    assert_eq!(stats.terminated(), stats.particles_transported);
    assert!(stats.particles_transported >= stats.particles_emitted);
    assert!(stats.elapsed_secs > 0.0);
    assert!(engine.last_error().is_none());
    let emitted: u64 = engine.scene().sources().iter().map(|s| s.emitted_count()).sum();
    assert_eq!(emitted, 5_000);

    // Completed is kept by stop, and a new run can start.
    engine.stop_simulation();
    assert_eq!(engine.state(), SimulationState::Completed);
    engine.start_simulation().unwrap();
    assert_eq!(engine.wait_for_completion(), SimulationState::Completed);
    assert_eq!(engine.stats().particles_emitted, 5_000);
}

#[test]
fn pause_resume_and_stop() {
    let mut engine = shielding_engine(50_000_000);
    engine.start_simulation().unwrap();
    assert_eq!(engine.state(), SimulationState::Running);
    assert!(matches!(engine.start_simulation(), Err(EngineError::Busy)));
    assert!(matches!(
        engine.set_config(SimulationConfig::default()),
        Err(EngineError::Busy)
    ));
    assert!(matches!(engine.run_batch(10), Err(EngineError::Busy)));

    sleep(Duration::from_millis(50));
    assert!(engine.pause_simulation());
    assert_eq!(engine.state(), SimulationState::Paused);
    assert!(!engine.pause_simulation());
    sleep(Duration::from_millis(50));
    let paused_at = engine.stats().particles_emitted;
    sleep(Duration::from_millis(100));
    assert_eq!(engine.stats().particles_emitted, paused_at);

    assert!(engine.resume_simulation());
    assert_eq!(engine.state(), SimulationState::Running);
    sleep(Duration::from_millis(50));
    engine.stop_simulation();
    assert_eq!(engine.state(), SimulationState::Idle);
    let progress = engine.progress();
    assert!(progress > 0.0 && progress < 1.0, "{}", progress);
    let stats = engine.stats();
    assert!(stats.particles_emitted >= paused_at);
    // Stopping mid-history leaves at most one unfinished history per worker.
    assert!(stats.particles_transported + 2 >= stats.particles_emitted);
}

#[test]
fn stop_while_paused() {
    let mut engine = shielding_engine(50_000_000);
    engine.start_simulation().unwrap();
    assert!(engine.pause_simulation());
    engine.stop_simulation();
    assert_eq!(engine.state(), SimulationState::Idle);
    assert!(!engine.resume_simulation());
}

#[test]
fn start_is_rejected_for_unusable_scenes() {
    let mut empty = MonteCarloEngine::new(Arc::new(Scene::new()), Arc::new(MaterialCatalog::new()));
    assert_eq!(empty.start_simulation(), Err(EngineError::NoEnabledSources));
    assert_eq!(empty.state(), SimulationState::Idle);

    let mut scene = Scene::new();
    scene
        .add_source(Source::gamma_point("g", 100.0, 1.0))
        .unwrap();
    scene.build_acceleration_structure();
    scene
        .add_object(Object3D::new("late", Sphere::new(1.0).unwrap()))
        .unwrap();
    let mut stale = MonteCarloEngine::new(Arc::new(scene), Arc::new(MaterialCatalog::new()));
    assert_eq!(stale.start_simulation(), Err(EngineError::StaleAccelerationStructure));
    assert_eq!(stale.run_batch(10), Err(EngineError::StaleAccelerationStructure));

    let mut scene = Scene::new();
    let mut disabled = Source::gamma_point("g", 100.0, 1.0);
    disabled.set_enabled(false);
    scene.add_source(disabled).unwrap();
    let mut engine = MonteCarloEngine::new(Arc::new(scene), Arc::new(MaterialCatalog::new()));
    assert_eq!(engine.start_simulation(), Err(EngineError::NoEnabledSources));
}

#[test]
fn config_changes_are_validated() {
    let mut engine = shielding_engine(100);
    let zero_threads = SimulationConfig {
        num_threads: 0,
        ..SimulationConfig::default()
    };
    assert!(matches!(engine.set_config(zero_threads), Err(EngineError::Config(_))));
    assert!(engine.enable_russian_roulette(true, -1.0).is_err());
    engine.enable_russian_roulette(true, 0.25).unwrap();
    assert_eq!(engine.config().russian_roulette_threshold, 0.25);
    engine.enable_splitting(true, 100).unwrap();
    assert_eq!(engine.config().splitting_factor, engine::MAX_SPLITTING_FACTOR);
    assert!(engine.enable_splitting(true, 0).is_err());
    // Unchanged after the rejected update.
    assert_eq!(engine.config().max_particles, 100);
}

#[test]
fn more_threads_than_batches() {
    let mut scene = Scene::new();
    scene
        .add_source(Source::isotropic("n", RadiationType::Neutron).with_position(Point3::ORIGIN))
        .unwrap();
    let config = SimulationConfig {
        max_particles: 10,
        batch_size: 5,
        num_threads: 8,
        ..SimulationConfig::default()
    };
    let mut engine = MonteCarloEngine::with_config(Arc::new(scene), Arc::new(MaterialCatalog::new()), config).unwrap();
    engine.start_simulation().unwrap();
    assert_eq!(engine.wait_for_completion(), SimulationState::Completed);
    assert_eq!(engine.stats().particles_emitted, 10);
    assert_eq!(engine.stats().particles_escaped, 10);
}

#[test]
fn largest_budget_starts_and_stops() {
    let mut engine = shielding_engine(u64::MAX);
    engine.start_simulation().unwrap();
    assert_eq!(engine.state(), SimulationState::Running);
    sleep(Duration::from_millis(20));
    engine.stop_simulation();
    assert_eq!(engine.state(), SimulationState::Idle);
    assert!(engine.progress() < 1.0);
}
