use std::time::Duration;

use anyhow::Context;
use config::{Config, ConfigError, Environment, File, FileFormat};
use grid_navigation::{LatticeAStar, PlannerConfig};
use motion_primitives::{Footprint, Move};
use serde::Deserialize;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "PLANNER";

#[derive(Debug, Clone, Deserialize)]
pub struct RobotSettings {
    pub footprint_width: f64,
    pub footprint_height: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlannerSettings {
    pub move_step: f64,
    pub goal_tolerance: f64,
    pub max_expansions: usize,
    pub marker_capacity: usize,
    pub upstream_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicSettings {
    pub capacity: usize,
}

/// Simulated upstream: a static map, a start pose and a cycle of goals.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettings {
    pub map_width: usize,
    pub map_height: usize,
    pub resolution: f64,
    pub origin_x: f64,
    pub origin_y: f64,
    /// `[x_min, y_min, x_max, y_max]` in meters
    #[serde(default)]
    pub walls: Vec<[f64; 4]>,
    /// `[x, y, heading]`
    pub start: [f64; 3],
    #[serde(default)]
    pub start_noise: f64,
    #[serde(default)]
    pub goals: Vec<[f64; 3]>,
    pub publish_period_ms: u64,
    pub goal_period_ms: u64,
    pub run_for_secs: u64,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub robot: RobotSettings,
    pub planner: PlannerSettings,
    pub topics: TopicSettings,
    pub simulation: SimulationSettings,
}

impl Settings {
    /// Loads `config/default.toml` with `PLANNER__<SECTION>__<KEY>` overrides.
    pub fn load() -> Result<Self, ConfigError> {
        info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

        let settings = Config::builder()
            .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|config| config.try_deserialize::<Settings>());

        match settings {
            Ok(settings) => {
                info!("Successfully loaded configuration: {:?}", settings);
                Ok(settings)
            }
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                Err(e)
            }
        }
    }

    pub fn footprint(&self) -> anyhow::Result<Footprint> {
        Footprint::new(self.robot.footprint_width, self.robot.footprint_height)
            .context("invalid robot footprint")
    }

    pub fn planner_config(&self) -> anyhow::Result<PlannerConfig> {
        let moves = Move::eight_connected(self.planner.move_step).context("invalid move step")?;
        Ok(PlannerConfig::new(self.footprint()?, moves.to_vec())
            .with_marker_capacity(self.planner.marker_capacity)
            .with_upstream_timeout(Duration::from_millis(self.planner.upstream_timeout_ms)))
    }

    pub fn search(&self) -> LatticeAStar {
        LatticeAStar::new(self.planner.goal_tolerance, self.planner.max_expansions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_TOML: &str = include_str!("../config/default.toml");

    fn parse(toml: &str) -> Result<Settings, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn test_default_file_parses() {
        let settings = parse(DEFAULT_TOML).unwrap();
        assert_eq!(settings.robot.footprint_width, 0.15);
        assert_eq!(settings.planner.move_step, 0.05);
        assert_eq!(settings.planner.max_expansions, 200_000);
        assert_eq!(settings.planner.upstream_timeout_ms, 5000);
        assert_eq!(settings.topics.capacity, 16);
        assert_eq!(settings.simulation.goals.len(), 2);
    }

    #[test]
    fn test_planner_config_from_settings() {
        let settings = parse(DEFAULT_TOML).unwrap();
        let config = settings.planner_config().unwrap();
        assert_eq!(config.moves.len(), 8);
        assert_eq!(config.moves[0], Move::new(0.05, 0.0, 0.0));
        assert_eq!(config.marker_capacity, 1024);
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
        assert_eq!(settings.search().max_expansions(), 200_000);
    }

    #[test]
    fn test_invalid_footprint_is_rejected() {
        let toml = DEFAULT_TOML.replace("footprint_width = 0.15", "footprint_width = -1.0");
        let settings = parse(&toml).unwrap();
        assert!(settings.planner_config().is_err());
    }
}
