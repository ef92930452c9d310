use anyhow::{Context, Result};
use glam::Vec3;
use roulette_execution::table::TableConfig;
use roulette_execution::wheel::{RotatingWheel, StaticWheel, WheelGeometry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::telemetry::parse_level;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tick_ms() -> u64 {
    16
}

fn default_store_path() -> PathBuf {
    PathBuf::from("roulette.db")
}

fn default_center() -> [f32; 3] {
    [0.0, 0.0, 0.0]
}

fn default_radius() -> f32 {
    2.0
}

fn default_waypoints() -> usize {
    16
}

fn default_ring_height() -> f32 {
    0.1
}

fn default_pocket_radius() -> f32 {
    1.6
}

fn default_pocket_height() -> f32 {
    0.05
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Json,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

/// Physical layout of the wheel as the renderer sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WheelConfig {
    #[serde(default = "default_center")]
    pub center: [f32; 3],
    /// Radius of the ring the ball circles on.
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_waypoints")]
    pub waypoints: usize,
    #[serde(default = "default_ring_height")]
    pub ring_height: f32,
    #[serde(default = "default_pocket_radius")]
    pub pocket_radius: f32,
    #[serde(default = "default_pocket_height")]
    pub pocket_height: f32,
    /// Wheel spin in radians per second; zero keeps the pockets still.
    #[serde(default)]
    pub angular_speed: f32,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            center: default_center(),
            radius: default_radius(),
            waypoints: default_waypoints(),
            ring_height: default_ring_height(),
            pocket_radius: default_pocket_radius(),
            pocket_height: default_pocket_height(),
            angular_speed: 0.0,
        }
    }
}

impl WheelConfig {
    pub fn center(&self) -> Vec3 {
        Vec3::from_array(self.center)
    }

    pub fn geometry(&self) -> WheelGeometry {
        WheelGeometry::circular(self.center(), self.radius, self.waypoints, self.ring_height)
    }

    pub fn locator(&self) -> RotatingWheel {
        RotatingWheel::new(
            StaticWheel::new(self.center(), self.pocket_radius, self.pocket_height),
            self.angular_speed,
        )
    }

    pub fn validate(&self) -> Result<()> {
        self.geometry()
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid wheel geometry")?;
        if !(self.pocket_radius.is_finite() && self.pocket_radius > 0.0) {
            anyhow::bail!("wheel.pocket_radius must be positive");
        }
        if !self.angular_speed.is_finite() {
            anyhow::bail!("wheel.angular_speed must be finite");
        }
        Ok(())
    }
}

/// Host configuration, read from YAML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub wheel: WheelConfig,
    #[serde(default)]
    pub table: TableConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            tick_ms: default_tick_ms(),
            store: StoreConfig::default(),
            wheel: WheelConfig::default(),
            table: TableConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).context("Could not parse config file")
    }

    pub fn validate(&self) -> Result<()> {
        parse_level(&self.log_level)?;
        if self.tick_ms == 0 {
            anyhow::bail!("tick_ms must be greater than zero");
        }
        if self.store.path.as_os_str().is_empty() {
            anyhow::bail!("store.path must not be empty");
        }
        self.wheel.validate()?;
        self.table.validate().context("invalid table config")?;
        Ok(())
    }

    /// The subset worth logging at startup.
    pub fn summary(&self) -> String {
        format!(
            "store={:?}:{} tick_ms={} balance={} seed={:?}",
            self.store.backend,
            self.store.path.display(),
            self.tick_ms,
            self.table.starting_balance,
            self.table.deterministic_seed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_empty_config_with_defaults() {
        let config = Config::parse("{}").expect("config should parse");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.tick_ms, 16);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.path, PathBuf::from("roulette.db"));
        assert_eq!(config.wheel, WheelConfig::default());
        assert_eq!(config.table, TableConfig::default());
        config.validate().expect("defaults should validate");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parses_nested_overrides() {
        let yaml = r#"
log_level: debug
json_logs: true
store:
  backend: json
  path: /tmp/roulette.json
wheel:
  center: [1.0, 0.5, -1.0]
  angular_speed: 0.8
table:
  starting_balance: 250
  deterministic_seed: 7
  phases:
    settlement_hold_ms: 1500
  trajectory:
    roll_duration_secs: 8.0
"#;
        let config = Config::parse(yaml).expect("config should parse");
        assert!(config.json_logs);
        assert_eq!(config.store.backend, StoreBackend::Json);
        assert_eq!(config.wheel.center(), Vec3::new(1.0, 0.5, -1.0));
        assert_eq!(config.wheel.waypoints, 16);
        assert_eq!(config.table.starting_balance, 250);
        assert_eq!(config.table.deterministic_seed, Some(7));
        assert_eq!(config.table.phases.settlement_hold_ms, 1_500);
        assert_eq!(config.table.phases.max_spin_ms, 60_000);
        assert_eq!(config.table.trajectory.roll_duration_secs, 8.0);
        assert_eq!(config.table.trajectory.settle_duration_secs, 1.0);
        config.validate().expect("config should validate");
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = Config::parse("log_level: loud").unwrap();
        assert!(config.validate().is_err());

        let config = Config::parse("tick_ms: 0").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tick_ms"), "unexpected error: {err}");

        let config = Config::parse("wheel:\n  waypoints: 2").unwrap();
        assert!(config.validate().is_err());

        let config = Config::parse("table:\n  phases:\n    max_spin_ms: 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(Config::parse("store:\n  backend: redis").is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("Could not read config file"));
    }
}
