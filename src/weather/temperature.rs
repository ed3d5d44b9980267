use std::f64::consts::PI;

use crate::weather::climate::ClimateTemplate;
use crate::weather::modifiers::ClimateModifierInput;

/// Warmest day of the year for the annual cycle.
const PEAK_DAY: f64 = 196.0;
/// Warmest hour of the day.
const PEAK_HOUR: f64 = 15.0;

/// Baseline temperature before weather noise, in °C.
///
/// `climate` has already had the hex's modifiers applied. `tile` is the raw
/// per-hex input, absent when the caller has no terrain context.
pub trait TemperatureSource: Send + Sync {
    fn temperature_at(
        &self,
        climate: &ClimateTemplate,
        tile: Option<&ClimateModifierInput>,
        hour_of_day: u32,
        day_of_year: u32,
    ) -> f64;
}

/// Annual and diurnal cosine curves around the climate's midpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalBaseline;

impl TemperatureSource for SeasonalBaseline {
    fn temperature_at(
        &self,
        climate: &ClimateTemplate,
        _tile: Option<&ClimateModifierInput>,
        hour_of_day: u32,
        day_of_year: u32,
    ) -> f64 {
        let range = climate.base_temperature;
        let variation = climate.seasonal_variation;

        let annual = (variation / 2.0) * (2.0 * PI * (day_of_year as f64 - PEAK_DAY) / 365.0).cos();
        let diurnal = (range.span() / 4.0) * (2.0 * PI * (hour_of_day as f64 - PEAK_HOUR) / 24.0).cos();

        let low = range.min - variation / 2.0;
        let high = range.max + variation / 2.0;
        clamp_finite(range.midpoint() + annual + diurnal, low, high)
    }
}

/// Clamp into `[low, high]` (either order), never panicking. Non-finite
/// values fall back to the nearest finite bound, or 0.
pub(crate) fn clamp_finite(value: f64, low: f64, high: f64) -> f64 {
    // f64::min/max ignore a NaN operand, so NaN bounds drop out here.
    let (low, high) = (low.min(high), high.max(low));
    let value = if value.is_finite() {
        value
    } else {
        match (low.is_finite(), high.is_finite()) {
            (true, true) => (low + high) / 2.0,
            (true, false) => low,
            (false, true) => high,
            (false, false) => 0.0,
        }
    };
    let clamped = value.max(low).min(high);
    if clamped.is_finite() { clamped } else { value }
}
