use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::weather::climate::{ClimateTemplate, WeatherDistribution};

/// Moisture above which wet weather gets more likely.
pub const MOISTURE_BOOST_THRESHOLD: f64 = 0.6;
const MOISTURE_BOOST_SLOPE: f64 = 1.25;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureModifier {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    /// Shifts both bounds, after the min/max deltas.
    #[serde(default)]
    pub avg: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindModifier {
    /// km/h added to generated wind speed
    pub speed: f64,
}

/// Per-hex overrides layered on top of a climate template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateModifierInput {
    #[serde(default)]
    pub temperature: Option<TemperatureModifier>,
    #[serde(default)]
    pub wind: Option<WindModifier>,
    /// 0.0-1.0
    #[serde(default)]
    pub cloud_cover: Option<f64>,
    /// -1.0-1.0
    #[serde(default)]
    pub sunlight: Option<f64>,
    /// 0.0-1.0
    #[serde(default)]
    pub moisture: Option<f64>,
}

/// Non-finite inputs count as absent.
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Template with the hex's temperature deltas applied.
///
/// The base template is never touched; without modifiers it is returned
/// borrowed. Non-finite deltas are ignored.
pub fn apply<'a>(
    base: &'a ClimateTemplate,
    modifiers: Option<&ClimateModifierInput>,
) -> Cow<'a, ClimateTemplate> {
    let Some(temp) = modifiers.and_then(|m| m.temperature) else {
        return Cow::Borrowed(base);
    };

    let mut modified = base.clone();
    let range = &mut modified.base_temperature;
    if let Some(delta) = finite(temp.min) {
        range.min += delta;
    }
    if let Some(delta) = finite(temp.max) {
        range.max += delta;
    }
    if let Some(shift) = finite(temp.avg) {
        range.min += shift;
        range.max += shift;
    }
    Cow::Owned(modified)
}

/// Extra wind speed in km/h; 0 when absent or not finite.
pub fn wind_modifier(modifiers: Option<&ClimateModifierInput>) -> f64 {
    finite(modifiers.and_then(|m| m.wind).map(|w| w.speed)).unwrap_or(0.0)
}

/// Visibility multiplier from cloud cover and sunlight, never negative.
pub fn visibility_modifier(modifiers: Option<&ClimateModifierInput>) -> f64 {
    let Some(m) = modifiers else {
        return 1.0;
    };
    let cloud = finite(m.cloud_cover).unwrap_or(0.0).clamp(0.0, 1.0);
    let sun = finite(m.sunlight).unwrap_or(0.0).clamp(-1.0, 1.0);
    ((1.0 - cloud * 0.5) * (1.0 + sun * 0.3)).max(0.0)
}

/// Multiplier for wet weather types: 1.0 up to the threshold, reaching 1.5 at moisture 1.0.
pub fn moisture_boost(moisture: Option<f64>) -> f64 {
    match finite(moisture) {
        Some(m) if m > MOISTURE_BOOST_THRESHOLD => {
            1.0 + (m.min(1.0) - MOISTURE_BOOST_THRESHOLD) * MOISTURE_BOOST_SLOPE
        }
        _ => 1.0,
    }
}

/// Season table with rain, fog and storm scaled by the moisture boost,
/// renormalized. Returned unchanged when there is no boost.
pub fn apply_moisture_boost(
    probabilities: &WeatherDistribution,
    modifiers: Option<&ClimateModifierInput>,
) -> WeatherDistribution {
    let boost = moisture_boost(modifiers.and_then(|m| m.moisture));
    if boost <= 1.0 {
        return *probabilities;
    }

    let mut boosted = *probabilities;
    for (weather_type, p) in probabilities.iter() {
        if weather_type.is_wet() {
            boosted.set(weather_type, p * boost);
        }
    }
    boosted.normalized().unwrap_or(*probabilities)
}
