use std::collections::HashMap;
use std::str::FromStr;

pub struct CliOptions {
    pub scene_name: String,
    pub particles: Option<u64>,
    pub threads: Option<usize>,
    pub bounces: Option<u32>,
    pub seed: Option<u64>,
    pub help: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            scene_name: "shielding".to_owned(),
            particles: None,
            threads: None,
            bounces: None,
            seed: None,
            help: false,
        }
    }
}

impl CliOptions {
    pub fn message() -> &'static str {
        r#"
        --scene <shielding | slab | moderator | cosmic>
        --particles <count>
        --threads <count>
        --bounces <max steps per history>
        --seed <integer>
        --help
        "#
    }
}

fn parse_value<T: FromStr>(key: &str, value: Option<String>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("Missing value for {}", key))?;
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid value '{}' for {}", value, key))
}

pub fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut pairs: HashMap<String, Option<String>> = HashMap::new();
    let mut args = args.into_iter().rev().collect::<Vec<_>>();
    args.pop(); // Removes args[0]

    while let Some(key) = args.pop() {
        if !key.starts_with('-') {
            return Err(format!("Unrecognized key {}", key));
        }
        match args.last() {
            None => {
                pairs.insert(key, None);
            }
            Some(value) => {
                if value.starts_with('-') {
                    pairs.insert(key, None);
                } else {
                    let value = args.pop();
                    pairs.insert(key, value);
                }
            }
        }
    }
    let mut options = CliOptions::default();
    for (k, v) in pairs.into_iter() {
        match k.as_str() {
            "--scene" => options.scene_name = parse_value(&k, v)?,
            "--particles" => options.particles = Some(parse_value(&k, v)?),
            "--threads" => options.threads = Some(parse_value(&k, v)?),
            "--bounces" => options.bounces = Some(parse_value(&k, v)?),
            "--seed" => options.seed = Some(parse_value(&k, v)?),
            "--help" => options.help = true,
            _ => return Err(format!("Unrecognized key {}", k)),
        }
    }
    Ok(options)
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        std::iter::once("radsim")
            .chain(s.split_whitespace())
            .map(|a| a.to_owned())
            .collect()
    }

    #[test]
    fn parses_known_options() {
        let options = parse_args(args("--scene slab --particles 2000 --seed 9 --threads 3")).unwrap();
        assert_eq!(options.scene_name, "slab");
        assert_eq!(options.particles, Some(2000));
        assert_eq!(options.seed, Some(9));
        assert_eq!(options.threads, Some(3));
        assert_eq!(options.bounces, None);
        assert!(!options.help);

        let defaults = parse_args(args("")).unwrap();
        assert_eq!(defaults.scene_name, "shielding");
        assert!(parse_args(args("--help")).unwrap().help);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(args("--particles lots")).is_err());
        assert!(parse_args(args("--particles")).is_err());
        assert!(parse_args(args("--colour red")).is_err());
        assert!(parse_args(args("stray")).is_err());
    }
}
