use engine::{ConfigError, SimulationConfig};

#[test]
fn serializes_with_camel_case_names() {
    let config = SimulationConfig {
        num_threads: 4,
        seed: Some(12),
        ..SimulationConfig::default()
    };
    let json = serde_json::to_value(&config).unwrap();
    for key in [
        "maxParticles",
        "maxBounces",
        "energyCutoff",
        "timeCutoff",
        "numThreads",
        "useRussianRoulette",
        "russianRouletteThreshold",
        "useSplitting",
        "splittingFactor",
        "maxSplitGeneration",
        "batchSize",
        "seed",
    ] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(json["numThreads"], 4);
    assert_eq!(json["seed"], 12);

    let text = serde_json::to_string(&config).unwrap();
    let back: SimulationConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(back, config);
}

#[test]
fn missing_fields_take_defaults() {
    let config: SimulationConfig =
        serde_json::from_str(r#"{ "maxParticles": 500, "useSplitting": true }"#).unwrap();
    let defaults = SimulationConfig::default();
    assert_eq!(config.max_particles, 500);
    assert!(config.use_splitting);
    assert_eq!(config.max_bounces, defaults.max_bounces);
    assert_eq!(config.splitting_factor, defaults.splitting_factor);
    assert_eq!(config.seed, None);
    assert_eq!(config.validate(), Ok(()));

    let bad: SimulationConfig = serde_json::from_str(r#"{ "numThreads": 0 }"#).unwrap();
    assert_eq!(bad.validate(), Err(ConfigError::ZeroThreads));
}
