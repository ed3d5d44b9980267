use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

use crate::config::region::RegionParams;
use crate::weather::climate::ClimateRegistry;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Simulated days per real second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: f32,
    /// Days between automatic snapshots.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: u32,
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: u32,
    #[serde(default = "default_snapshot_directory")]
    pub snapshot_directory: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_map_path")]
    pub map_path: String,
    #[serde(default = "default_climate")]
    pub climate: String,
    /// Extra climate templates in TOML.
    #[serde(default)]
    pub climate_file: Option<String>,
    #[serde(default = "default_region_radius")]
    pub region_radius: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_start_date")]
    pub start_date: String,
    #[serde(default = "default_wind_direction")]
    pub wind_direction_deg: f64,
    #[serde(default = "default_prune_max_age_days")]
    pub prune_max_age_days: u32,
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
}

fn default_tick_rate() -> f32 {
    1.0
}
fn default_snapshot_interval() -> u32 {
    30
}
fn default_max_snapshots() -> u32 {
    10
}
fn default_snapshot_directory() -> String {
    "./snapshots".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_map_path() -> String {
    "maps/default".to_string()
}
fn default_climate() -> String {
    "Temperate".to_string()
}
fn default_region_radius() -> u32 {
    6
}
fn default_start_date() -> String {
    "2026-03-21".to_string()
}
fn default_wind_direction() -> f64 {
    270.0
}
fn default_prune_max_age_days() -> u32 {
    30
}
fn default_forecast_days() -> u32 {
    3
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            tick_rate_hz: default_tick_rate(),
            snapshot_interval: default_snapshot_interval(),
            max_snapshots: default_max_snapshots(),
            snapshot_directory: default_snapshot_directory(),
            log_level: default_log_level(),
            map_path: default_map_path(),
            climate: default_climate(),
            climate_file: None,
            region_radius: default_region_radius(),
            seed: 0,
            start_date: default_start_date(),
            wind_direction_deg: default_wind_direction(),
            prune_max_age_days: default_prune_max_age_days(),
            forecast_days: default_forecast_days(),
        }
    }
}

impl SimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content, path)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn from_file_or_default(path: &Path) -> Result<Self, String> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str, source_path: &Path) -> Result<Self, String> {
        let config: SimulationConfig =
            toml::from_str(content).map_err(|e| format!("{}: {}", source_path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        if !(self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0) {
            errors.push(format!(
                "tick_rate_hz must be finite and > 0.0, got {}. Example: tick_rate_hz = 1.0",
                self.tick_rate_hz
            ));
        }

        if self.snapshot_interval == 0 {
            errors.push(format!(
                "snapshot_interval must be > 0, got {}. Example: snapshot_interval = 30",
                self.snapshot_interval
            ));
        }

        if self.max_snapshots == 0 {
            errors.push(format!(
                "max_snapshots must be > 0, got {}. Example: max_snapshots = 10",
                self.max_snapshots
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            errors.push(format!(
                "log_level must be one of {:?}, got '{}'. Example: log_level = \"info\"",
                valid_levels, self.log_level
            ));
        }

        if self.map_path.trim().is_empty() {
            errors.push("map_path must not be empty. Example: map_path = \"maps/default\"".to_string());
        }

        if !(1..=64).contains(&self.region_radius) {
            errors.push(format!(
                "region_radius must be 1-64, got {}. Example: region_radius = 6",
                self.region_radius
            ));
        }

        if NaiveDate::parse_from_str(&self.start_date, DATE_FORMAT).is_err() {
            errors.push(format!(
                "start_date must be YYYY-MM-DD, got '{}'. Example: start_date = \"2026-03-21\"",
                self.start_date
            ));
        }

        if !self.wind_direction_deg.is_finite() || !(0.0..360.0).contains(&self.wind_direction_deg)
        {
            errors.push(format!(
                "wind_direction_deg must be 0-360, got {}. Example: wind_direction_deg = 270",
                self.wind_direction_deg
            ));
        }

        if self.prune_max_age_days == 0 {
            errors.push(format!(
                "prune_max_age_days must be > 0, got {}. Example: prune_max_age_days = 30",
                self.prune_max_age_days
            ));
        }

        if !(1..=14).contains(&self.forecast_days) {
            errors.push(format!(
                "forecast_days must be 1-14, got {}. Example: forecast_days = 3",
                self.forecast_days
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }

    pub fn start_date(&self) -> Result<NaiveDate, String> {
        NaiveDate::parse_from_str(&self.start_date, DATE_FORMAT)
            .map_err(|e| format!("Invalid start_date '{}': {}", self.start_date, e))
    }

    pub fn region_params(&self) -> RegionParams {
        RegionParams {
            seed: self.seed,
            radius: self.region_radius,
            climate: self.climate.clone(),
            map_path: self.map_path.clone(),
            ..Default::default()
        }
    }

    /// Built-in climates plus any from `climate_file`.
    pub fn climate_registry(&self) -> Result<ClimateRegistry, String> {
        match &self.climate_file {
            Some(file) => ClimateRegistry::from_file(Path::new(file))
                .map_err(|e| format!("Error loading climates from {}:\n{}", file, e)),
            None => Ok(ClimateRegistry::builtin()),
        }
    }
}
