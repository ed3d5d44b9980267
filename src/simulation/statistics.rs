use std::collections::BTreeMap;

use crate::weather::types::{WeatherState, WeatherType};

/// Per-day aggregate metrics over every hex of a region.
#[derive(Debug, Clone)]
pub struct DayStatistics {
    pub type_distribution: BTreeMap<WeatherType, u32>,
    pub avg_temperature_c: f64,
    pub avg_wind_speed_kmh: f64,
    pub avg_precipitation_mm: f64,
    pub avg_visibility_m: f64,
    pub diversity_index: f64,
    pub hex_count: u32,
    pub duration_ms: f32,
}

impl DayStatistics {
    /// Most common weather type, ties broken by canonical order.
    pub fn dominant_type(&self) -> Option<WeatherType> {
        self.type_distribution
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(t, _)| *t)
    }
}

/// Compute statistics for one simulated day.
pub fn compute_statistics(states: &[WeatherState], duration_ms: f32) -> DayStatistics {
    let total = states.len() as f64;
    if states.is_empty() {
        return DayStatistics {
            type_distribution: BTreeMap::new(),
            avg_temperature_c: 0.0,
            avg_wind_speed_kmh: 0.0,
            avg_precipitation_mm: 0.0,
            avg_visibility_m: 0.0,
            diversity_index: 0.0,
            hex_count: 0,
            duration_ms,
        };
    }

    let mut distribution: BTreeMap<WeatherType, u32> = BTreeMap::new();
    let mut total_temp = 0.0_f64;
    let mut total_wind = 0.0_f64;
    let mut total_precip = 0.0_f64;
    let mut total_visibility = 0.0_f64;

    for state in states {
        *distribution.entry(state.weather_type()).or_insert(0) += 1;
        total_temp += state.temperature_c;
        total_wind += state.wind_speed_kmh;
        total_precip += state.precipitation_mm_per_hour;
        total_visibility += state.visibility_meters;
    }

    let diversity = shannon_diversity(&distribution, states.len() as u32);

    DayStatistics {
        type_distribution: distribution,
        avg_temperature_c: total_temp / total,
        avg_wind_speed_kmh: total_wind / total,
        avg_precipitation_mm: total_precip / total,
        avg_visibility_m: total_visibility / total,
        diversity_index: diversity,
        hex_count: states.len() as u32,
        duration_ms,
    }
}

/// Shannon diversity index normalized to [0, 1].
/// 0 = every hex shares one weather type, 1 = all present types equally common.
fn shannon_diversity(distribution: &BTreeMap<WeatherType, u32>, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }

    let total_f = total as f64;
    let mut entropy = 0.0_f64;
    let mut non_zero_types = 0_u32;

    for &count in distribution.values() {
        if count > 0 {
            non_zero_types += 1;
            let p = count as f64 / total_f;
            entropy -= p * p.ln();
        }
    }

    if non_zero_types <= 1 {
        return 0.0;
    }

    // Normalize by max possible entropy (ln of number of types present)
    let max_entropy = (non_zero_types as f64).ln();
    if max_entropy == 0.0 {
        0.0
    } else {
        entropy / max_entropy
    }
}
