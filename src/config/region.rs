use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters used to procedurally generate a region map.
/// Stored with the region for reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionParams {
    /// 0 picks a random seed at generation time.
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_radius")]
    pub radius: u32,
    #[serde(default = "default_climate")]
    pub climate: String,
    #[serde(default = "default_map_path")]
    pub map_path: String,
    #[serde(default = "default_moisture_roughness")]
    pub moisture_roughness: f64,
    #[serde(default = "default_elevation_peak")]
    pub elevation_peak_m: f64,
}

fn default_radius() -> u32 {
    6
}

fn default_climate() -> String {
    "Temperate".to_string()
}

fn default_map_path() -> String {
    "maps/default".to_string()
}

fn default_moisture_roughness() -> f64 {
    1.0
}

fn default_elevation_peak() -> f64 {
    3000.0
}

impl Default for RegionParams {
    fn default() -> Self {
        RegionParams {
            seed: 0,
            radius: default_radius(),
            climate: default_climate(),
            map_path: default_map_path(),
            moisture_roughness: default_moisture_roughness(),
            elevation_peak_m: default_elevation_peak(),
        }
    }
}

impl RegionParams {
    /// Load region parameters from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        let params: Self = toml::from_str(&content)
            .map_err(|e| format!("Invalid TOML in {}: {}", path.display(), e))?;
        params.validate()?;
        Ok(params)
    }

    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=64).contains(&self.radius) {
            return Err(format!("radius must be 1-64, got {}", self.radius));
        }
        if self.map_path.trim().is_empty() {
            return Err("map_path must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.moisture_roughness) {
            return Err(format!(
                "moisture_roughness must be 0.0-2.0, got {}",
                self.moisture_roughness
            ));
        }
        if !(0.0..=9000.0).contains(&self.elevation_peak_m) {
            return Err(format!(
                "elevation_peak_m must be 0-9000, got {}",
                self.elevation_peak_m
            ));
        }
        Ok(())
    }
}
