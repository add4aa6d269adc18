use std::f32::consts::LN_2;
use std::sync::Arc;

use engine::solver::analytical_attenuation;
use engine::{MonteCarloEngine, SimulationConfig};
use math::hcm::Vec3;
use scene::preset::slab_experiment;
use source::SourceKind;

#[test]
fn uncollided_ratio_matches_exponential_attenuation() {
    let thickness = 1.0;
    let (mut scene, materials) = slab_experiment(thickness).unwrap();
    // Narrow beam filling both detectors, so nearly every history crosses the slab head-on.
    let source = scene.source_mut("Source").unwrap();
    source.set_kind(SourceKind::Directional { beam_angle: 0.1 });
    source.set_direction(Vec3::Z);

    let config = SimulationConfig {
        seed: Some(42),
        batch_size: 1000,
        ..SimulationConfig::default()
    };
    let engine = MonteCarloEngine::with_config(Arc::new(scene), Arc::new(materials), config).unwrap();
    let n = 100_000;
    let stats = engine.run_batch(n).unwrap();
    assert_eq!(stats.particles_emitted, n);
    assert_eq!(stats.particles_transported, n);
    assert_eq!(stats.terminated(), n);
    assert_eq!(stats.particles_detected, 0);

    let scene = engine.scene();
    let before = scene.sensor("Before").unwrap().tally();
    let after = scene.sensor("After").unwrap().tally();
    assert!(before.total_counts as f64 > 0.99 * n as f64, "{:?}", before);
    let ratio = after.total_counts as f64 / before.total_counts as f64;
    let expected = analytical_attenuation(thickness, LN_2 / thickness);
    assert!(
        (ratio - expected).abs() < 0.03 * expected,
        "ratio {} vs expected {}",
        ratio,
        expected
    );
    assert_eq!(scene.source("Source").unwrap().emitted_count(), n);
}

#[test]
fn seeded_batches_are_reproducible() {
    let run = || {
        let (scene, materials) = slab_experiment(2.0).unwrap();
        let config = SimulationConfig {
            seed: Some(7),
            batch_size: 250,
            ..SimulationConfig::default()
        };
        let engine = MonteCarloEngine::with_config(Arc::new(scene), Arc::new(materials), config).unwrap();
        let stats = engine.run_batch(5000).unwrap();
        let after = engine.scene().sensor("After").unwrap().tally().total_counts;
        (stats.particles_absorbed, stats.particles_escaped, after)
    };
    assert_eq!(run(), run());
}
