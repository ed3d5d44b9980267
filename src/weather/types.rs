use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hex::CubeCoord;

// === Enums ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherType {
    Clear,
    Cloudy,
    Rain,
    Storm,
    Snow,
    Fog,
    Wind,
    Hot,
    Cold,
}

impl WeatherType {
    /// Canonical iteration order. Weather selection walks this order, so it
    /// must never change or seeded results stop reproducing.
    pub const ALL: [WeatherType; 9] = [
        WeatherType::Clear,
        WeatherType::Cloudy,
        WeatherType::Rain,
        WeatherType::Storm,
        WeatherType::Snow,
        WeatherType::Fog,
        WeatherType::Wind,
        WeatherType::Hot,
        WeatherType::Cold,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            WeatherType::Clear => "clear",
            WeatherType::Cloudy => "cloudy",
            WeatherType::Rain => "rain",
            WeatherType::Storm => "storm",
            WeatherType::Snow => "snow",
            WeatherType::Fog => "fog",
            WeatherType::Wind => "wind",
            WeatherType::Hot => "hot",
            WeatherType::Cold => "cold",
        }
    }

    pub fn from_name(name: &str) -> Option<WeatherType> {
        WeatherType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Severity band `(min, max)` a condition of this type is drawn from.
    pub fn severity_range(self) -> (f64, f64) {
        match self {
            WeatherType::Clear => (0.0, 0.2),
            WeatherType::Cloudy => (0.2, 0.4),
            WeatherType::Rain => (0.3, 0.6),
            WeatherType::Storm => (0.7, 1.0),
            WeatherType::Snow => (0.3, 0.7),
            WeatherType::Fog => (0.3, 0.6),
            WeatherType::Wind => (0.4, 0.8),
            WeatherType::Hot => (0.5, 0.9),
            WeatherType::Cold => (0.5, 0.9),
        }
    }

    /// Baseline wind speed in km/h before severity scaling.
    pub fn base_wind_kmh(self) -> f64 {
        match self {
            WeatherType::Clear => 5.0,
            WeatherType::Cloudy => 10.0,
            WeatherType::Rain => 20.0,
            WeatherType::Storm => 50.0,
            WeatherType::Snow => 15.0,
            WeatherType::Fog => 5.0,
            WeatherType::Wind => 40.0,
            WeatherType::Hot => 10.0,
            WeatherType::Cold => 15.0,
        }
    }

    /// Fraction of clear-sky visibility retained.
    pub fn visibility_factor(self) -> f64 {
        match self {
            WeatherType::Clear => 1.0,
            WeatherType::Cloudy => 0.9,
            WeatherType::Rain => 0.5,
            WeatherType::Storm => 0.3,
            WeatherType::Snow => 0.4,
            WeatherType::Fog => 0.2,
            WeatherType::Wind => 0.8,
            WeatherType::Hot => 0.95,
            WeatherType::Cold => 0.95,
        }
    }

    pub fn is_precipitating(self) -> bool {
        matches!(self, WeatherType::Rain | WeatherType::Storm | WeatherType::Snow)
    }

    /// Wet types that moisture boosts.
    pub fn is_wet(self) -> bool {
        matches!(self, WeatherType::Rain | WeatherType::Fog | WeatherType::Storm)
    }
}

impl fmt::Display for WeatherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

    pub fn next(self) -> Season {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }

    /// Northern-hemisphere season for a 1-based day of year.
    ///
    /// Spring 80-171, summer 172-263, autumn 264-354, winter otherwise.
    pub fn for_day(day_of_year: u32) -> Season {
        match day_of_year {
            80..=171 => Season::Spring,
            172..=263 => Season::Summer,
            264..=354 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }

    pub fn from_name(name: &str) -> Option<Season> {
        Season::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// === Value types ===

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub weather_type: WeatherType,
    /// 0.0-1.0
    pub severity: f64,
    pub duration_hours: f64,
}

/// Weather for one hex at one point in simulated time.
///
/// Produced fresh by every generation call and never patched afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherState {
    pub hex_coord: CubeCoord,
    pub current_weather: WeatherCondition,
    pub temperature_c: f64,
    pub wind_speed_kmh: f64,
    /// Water equivalent, mm/h
    pub precipitation_mm_per_hour: f64,
    pub visibility_meters: f64,
    pub last_update: DateTime<Utc>,
}

impl WeatherState {
    pub fn weather_type(&self) -> WeatherType {
        self.current_weather.weather_type
    }

    /// Compare everything except `last_update`.
    pub fn same_conditions(&self, other: &WeatherState) -> bool {
        self.hex_coord == other.hex_coord
            && self.current_weather == other.current_weather
            && self.temperature_c == other.temperature_c
            && self.wind_speed_kmh == other.wind_speed_kmh
            && self.precipitation_mm_per_hour == other.precipitation_mm_per_hour
            && self.visibility_meters == other.visibility_meters
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub weather: WeatherState,
    pub date: DateTime<Utc>,
    /// 0.3-1.0
    pub confidence: f64,
}

/// Archived weather snapshot kept per hex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub weather: WeatherState,
    pub date: DateTime<Utc>,
}
