mod cli_options;

use std::sync::Arc;
use std::time::Duration;

use engine::{MonteCarloEngine, SimulationConfig, SimulationState};
use indicatif::{ProgressBar, ProgressStyle};

use cli_options::CliOptions;

fn main() {
    env_logger::init();

    let options = match cli_options::parse_args(std::env::args().collect()) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{}\nusage: {}", message, CliOptions::message());
            std::process::exit(2);
        }
    };
    if options.help {
        println!("usage: {}", CliOptions::message());
        return;
    }

    let (scene, materials) = match scene::preset::load(&options.scene_name) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!(
                "Cannot build scene '{}': {} (available: {})",
                options.scene_name,
                e,
                scene::preset::PRESET_NAMES.join(", ")
            );
            std::process::exit(1);
        }
    };
    log::info!("{}", scene.summary());

    let mut config = SimulationConfig::default();
    if let Some(particles) = options.particles {
        config.max_particles = particles;
    }
    if let Some(threads) = options.threads {
        config.num_threads = threads;
    }
    if let Some(bounces) = options.bounces {
        config.max_bounces = bounces;
    }
    config.seed = options.seed;

    let mut engine = match MonteCarloEngine::with_config(Arc::new(scene), Arc::new(materials), config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = engine.start_simulation() {
        eprintln!("Cannot start simulation: {}", e);
        std::process::exit(1);
    }

    let bar = ProgressBar::new(engine.config().max_particles);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{elapsed_precise} [{bar:50}] {pos}/{len} particles ({eta})")
            .progress_chars("=> "),
    );
    while engine.is_running() {
        bar.set_position(engine.stats().particles_emitted);
        std::thread::sleep(Duration::from_millis(100));
    }
    let state = engine.wait_for_completion();
    bar.set_position(engine.stats().particles_emitted);
    bar.finish();

    report(&engine, state);
    if state == SimulationState::Error {
        std::process::exit(1);
    }
}

fn report(engine: &MonteCarloEngine, state: SimulationState) {
    println!("Simulation {:?}", state);
    if let Some(error) = engine.last_error() {
        println!("Error: {}", error);
    }
    let stats = engine.stats();
    println!("{}", stats);

    // Source activities convert the emitted count into an exposure time.
    let scene = engine.scene();
    let intensity: f64 = scene.enabled_sources().map(|s| s.intensity() as f64).sum();
    let exposure_secs = if intensity > 0.0 {
        stats.particles_emitted as f64 / intensity
    } else {
        0.0
    };
    println!("Equivalent exposure: {:.4e} s", exposure_secs);
    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>10} {:>12} {:>12} {:>14}",
        "sensor", "counts", "gamma", "neutron", "muon", "weighted", "rate (1/s)", "dose (uSv/h)"
    );
    for sensor in scene.sensors() {
        let t = sensor.tally();
        println!(
            "{:<20} {:>10} {:>10} {:>10} {:>10} {:>12.2} {:>12.4e} {:>14.4e}",
            sensor.name(),
            t.total_counts,
            t.gamma_counts,
            t.neutron_counts,
            t.muon_counts,
            t.weighted_counts,
            t.count_rate(exposure_secs),
            t.dose_rate_usv_per_h(exposure_secs)
        );
    }
    let total = scene.total_sensor_tally();
    println!(
        "Total: {} counts, {:.3e} keV deposited, {:.3e} J",
        total.total_counts, total.energy_kev, total.dose_joules
    );
}
