//! City Simulation Visualization
//!
//! Run with: cargo run -p viz
//!
//! Examples:
//!   cargo run -p viz -- --server http://127.0.0.1:5000 --cars 20 --pedestrians 10
//!   cargo run -p viz -- --config city.toml

use bevy::prelude::*;
use clap::Parser;
use std::path::{Path, PathBuf};

use city_sync::{ConfigError, SyncConfig};
use viz::{CityVizPlugin, SyncRunner};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "city.toml";

/// City Simulation Visualization
#[derive(Parser, Debug)]
#[command(name = "viz")]
#[command(about = "Live 3D mirror of a remote city traffic simulation")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulation server base URL
    #[arg(long)]
    server: Option<String>,

    /// Number of cars to request at init
    #[arg(long)]
    cars: Option<u32>,

    /// Number of pedestrians to request at init
    #[arg(long)]
    pedestrians: Option<u32>,

    /// Seed for the visual variant picker
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    /// Loads the config file, then applies command-line overrides on top.
    fn load_config(&self) -> Result<SyncConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SyncConfig::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG).exists() => {
                SyncConfig::from_file(Path::new(DEFAULT_CONFIG))?
            }
            None => SyncConfig::default(),
        };

        if let Some(server) = &self.server {
            config.server.base_url = server.clone();
        }
        if let Some(cars) = self.cars {
            config.server.cars = cars;
        }
        if let Some(pedestrians) = self.pedestrians {
            config.server.pedestrians = pedestrians;
        }
        if let Some(seed) = self.seed {
            config.variants.seed = seed;
        }

        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = args.load_config()?;
    let runner = SyncRunner::new(&config)?;

    App::new()
        .insert_resource(runner)
        .add_plugins(CityVizPlugin)
        .run();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("city.toml");
        fs::write(&path, "[server]\ncars = 5\npedestrians = 6\n\n[motion]\nspeed = 12.0\n").unwrap();

        let args = Args::parse_from([
            "viz",
            "--config",
            path.to_str().unwrap(),
            "--server",
            "http://sim.local:9000",
            "--cars",
            "30",
            "--seed",
            "7",
        ]);
        let config = args.load_config().unwrap();

        assert_eq!(config.server.base_url, "http://sim.local:9000");
        assert_eq!(config.server.cars, 30);
        assert_eq!(config.server.pedestrians, 6);
        assert_eq!(config.motion.speed, 12.0);
        assert_eq!(config.variants.seed, 7);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempdir().unwrap();
        let args = Args::parse_from([
            "viz",
            "--config",
            dir.path().join("nope.toml").to_str().unwrap(),
        ]);
        assert!(matches!(args.load_config(), Err(ConfigError::Io(_))));
    }
}
