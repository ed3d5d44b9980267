use chrono::{DateTime, Datelike, Duration, Utc};
use std::fmt;

use crate::weather::climate::ClimateTemplate;
use crate::weather::generator::{GenerationOptions, WeatherGenerator, season_for_day};
use crate::weather::modifiers::ClimateModifierInput;
use crate::weather::rain_shadow::{ElevationSampler, RainShadowModel};
use crate::weather::temperature::TemperatureSource;
use crate::weather::types::{ForecastEntry, WeatherState};

pub const DEFAULT_FORECAST_DAYS: u32 = 3;
/// Forecasts are generated for midday.
const FORECAST_HOUR: u32 = 12;
const MIN_CONFIDENCE: f64 = 0.3;
const CONFIDENCE_DECAY_PER_DAY: f64 = 0.2;

#[derive(Clone, Copy)]
pub struct ForecastOptions<'a> {
    /// Starting point of the chain; its hex fixes the seeds.
    pub current_weather: &'a WeatherState,
    pub climate: &'a ClimateTemplate,
    pub current_date: DateTime<Utc>,
    pub days_ahead: u32,
    pub wind_direction_deg: f64,
    pub elevation_at: Option<ElevationSampler<'a>>,
    pub modifiers: Option<&'a ClimateModifierInput>,
    /// `last_update` stamped on every forecast state; now when absent.
    pub generated_at: Option<DateTime<Utc>>,
}

impl<'a> ForecastOptions<'a> {
    pub fn new(
        current_weather: &'a WeatherState,
        climate: &'a ClimateTemplate,
        current_date: DateTime<Utc>,
    ) -> Self {
        Self {
            current_weather,
            climate,
            current_date,
            days_ahead: DEFAULT_FORECAST_DAYS,
            wind_direction_deg: crate::weather::generator::DEFAULT_WIND_DIRECTION_DEG,
            elevation_at: None,
            modifiers: None,
            generated_at: None,
        }
    }

    pub fn days(mut self, days_ahead: u32) -> Self {
        self.days_ahead = days_ahead;
        self
    }
}

/// Confidence for the forecast `days_ahead` days out: 1.0 for tomorrow,
/// dropping 0.2 per further day, never below 0.3.
pub fn confidence_for_day(days_ahead: u32) -> f64 {
    let decay = days_ahead.saturating_sub(1) as f64 * CONFIDENCE_DECAY_PER_DAY;
    (1.0 - decay).max(MIN_CONFIDENCE)
}

/// Per-hex seed base, independent of the wall clock.
pub fn forecast_seed_base(weather: &WeatherState) -> i64 {
    let c = weather.hex_coord;
    c.q as i64 * 1000 + c.r as i64 * 100 + c.s as i64
}

impl<T: TemperatureSource, R: RainShadowModel> WeatherGenerator<T, R> {
    /// Chain `days_ahead` daily states forward from the current weather,
    /// oldest first.
    pub fn forecast(&self, options: &ForecastOptions<'_>) -> Vec<ForecastEntry> {
        let base_seed = forecast_seed_base(options.current_weather);
        let coord = options.current_weather.hex_coord;
        let generated_at = options.generated_at.unwrap_or_else(Utc::now);

        let mut previous = options.current_weather.current_weather;
        let mut entries = Vec::with_capacity(options.days_ahead as usize);

        for day in 1..=options.days_ahead {
            let date = options.current_date + Duration::days(day as i64);
            let day_of_year = date.ordinal();

            let mut generation = GenerationOptions::new(
                options.climate,
                season_for_day(day_of_year),
                day_of_year,
            )
            .hour(FORECAST_HOUR)
            .at(coord)
            .previous(Some(previous))
            .wind_direction(options.wind_direction_deg)
            .modifiers(options.modifiers)
            .seed(base_seed + day as i64)
            .timestamp(generated_at);
            generation.elevation_at = options.elevation_at;

            let weather = self.generate(&generation);
            previous = weather.current_weather;
            entries.push(ForecastEntry {
                weather,
                date,
                confidence: confidence_for_day(day),
            });
        }

        entries
    }
}

/// Forecast with the default temperature baseline and rain shadow.
pub fn generate_forecast(options: &ForecastOptions<'_>) -> Vec<ForecastEntry> {
    WeatherGenerator::default().forecast(options)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.7 {
            ConfidenceLevel::High
        } else if confidence >= 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
