use chrono::{DateTime, Utc};

use crate::hex::CubeCoord;
use crate::weather::climate::ClimateTemplate;
use crate::weather::modifiers::{self, ClimateModifierInput};
use crate::weather::rain_shadow::{ElevationSampler, RainShadowModel, RaycastRainShadow};
use crate::weather::rng::SeededRng;
use crate::weather::temperature::{SeasonalBaseline, TemperatureSource, clamp_finite};
use crate::weather::transition::{self, DEFAULT_TRANSITION_WEIGHT};
use crate::weather::types::{Season, WeatherCondition, WeatherState, WeatherType};

pub const DEFAULT_HOUR_OF_DAY: u32 = 12;
/// Prevailing westerlies.
pub const DEFAULT_WIND_DIRECTION_DEG: f64 = 270.0;
/// Clear-sky visibility in meters.
const BASE_VISIBILITY_M: f64 = 10_000.0;
/// Total spread of temperature noise in °C (±2).
const TEMPERATURE_NOISE_C: f64 = 4.0;

/// Inputs for one generation call.
#[derive(Clone, Copy)]
pub struct GenerationOptions<'a> {
    pub climate: &'a ClimateTemplate,
    pub season: Season,
    pub previous_weather: Option<WeatherCondition>,
    pub day_of_year: u32,
    pub hour_of_day: u32,
    /// Origin when absent.
    pub hex_coord: Option<CubeCoord>,
    pub wind_direction_deg: f64,
    pub elevation_at: Option<ElevationSampler<'a>>,
    /// Defaults to `day_of_year`.
    pub seed: Option<i64>,
    pub modifiers: Option<&'a ClimateModifierInput>,
    /// `last_update` of the result; now when absent.
    pub timestamp: Option<DateTime<Utc>>,
}

impl<'a> GenerationOptions<'a> {
    pub fn new(climate: &'a ClimateTemplate, season: Season, day_of_year: u32) -> Self {
        Self {
            climate,
            season,
            previous_weather: None,
            day_of_year,
            hour_of_day: DEFAULT_HOUR_OF_DAY,
            hex_coord: None,
            wind_direction_deg: DEFAULT_WIND_DIRECTION_DEG,
            elevation_at: None,
            seed: None,
            modifiers: None,
            timestamp: None,
        }
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn previous(mut self, previous: Option<WeatherCondition>) -> Self {
        self.previous_weather = previous;
        self
    }

    pub fn hour(mut self, hour_of_day: u32) -> Self {
        self.hour_of_day = hour_of_day;
        self
    }

    pub fn at(mut self, coord: CubeCoord) -> Self {
        self.hex_coord = Some(coord);
        self
    }

    pub fn wind_direction(mut self, degrees: f64) -> Self {
        self.wind_direction_deg = degrees;
        self
    }

    pub fn elevation(mut self, sampler: ElevationSampler<'a>) -> Self {
        self.elevation_at = Some(sampler);
        self
    }

    pub fn modifiers(mut self, modifiers: Option<&'a ClimateModifierInput>) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }
}

/// Optional inputs for [`WeatherGenerator::advance`].
#[derive(Clone, Copy, Default)]
pub struct AdvanceOptions<'a> {
    pub hour_of_day: Option<u32>,
    pub wind_direction_deg: Option<f64>,
    pub elevation_at: Option<ElevationSampler<'a>>,
    pub seed: Option<i64>,
    pub modifiers: Option<&'a ClimateModifierInput>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Produces weather states from climate, season and the previous weather.
///
/// Generation is a pure function of its options apart from `last_update`:
/// the same seed and inputs always give the same conditions.
#[derive(Debug, Clone)]
pub struct WeatherGenerator<T = SeasonalBaseline, R = RaycastRainShadow> {
    temperature: T,
    rain_shadow: R,
    transition_weight: f64,
}

impl Default for WeatherGenerator {
    fn default() -> Self {
        Self::new(SeasonalBaseline, RaycastRainShadow::default())
    }
}

impl<T: TemperatureSource, R: RainShadowModel> WeatherGenerator<T, R> {
    pub fn new(temperature: T, rain_shadow: R) -> Self {
        Self {
            temperature,
            rain_shadow,
            transition_weight: DEFAULT_TRANSITION_WEIGHT,
        }
    }

    pub fn with_transition_weight(mut self, weight: f64) -> Self {
        self.transition_weight = weight.clamp(0.0, 1.0);
        self
    }

    pub fn rain_shadow(&self) -> &R {
        &self.rain_shadow
    }

    pub fn generate(&self, options: &GenerationOptions<'_>) -> WeatherState {
        let tile = options.modifiers;
        let climate = modifiers::apply(options.climate, tile);

        let season_probs =
            modifiers::apply_moisture_boost(climate.probabilities(options.season), tile);
        let probabilities = transition::blend(
            &season_probs,
            options.previous_weather.map(|w| w.weather_type),
            self.transition_weight,
        );

        // Draw order is part of the reproducibility contract.
        let mut rng = SeededRng::new(options.seed.unwrap_or(options.day_of_year as i64));
        let weather_type = transition::select_type(&probabilities, rng.next_f64());

        let (sev_min, sev_max) = weather_type.severity_range();
        let severity = rng.range(sev_min, sev_max);

        let duration_hours = climate.transition_speed_hours * (0.5 + rng.next_f64());

        let baseline =
            self.temperature
                .temperature_at(&climate, tile, options.hour_of_day, options.day_of_year);
        let baseline = if baseline.is_finite() {
            baseline
        } else {
            let range = climate.base_temperature;
            clamp_finite(range.midpoint(), range.min, range.max)
        };
        let temperature_c = baseline + (rng.next_f64() - 0.5) * TEMPERATURE_NOISE_C;

        let base_wind = weather_type.base_wind_kmh();
        let wind = (base_wind + base_wind * severity * rng.next_f64()).max(0.0);
        let wind_speed_kmh = (wind + modifiers::wind_modifier(tile)).max(0.0);

        let precipitation_mm_per_hour = self.precipitation(weather_type, severity, options);

        let visibility_meters = (BASE_VISIBILITY_M
            * weather_type.visibility_factor()
            * (1.0 - severity * 0.5)
            * modifiers::visibility_modifier(tile))
        .max(0.0);

        WeatherState {
            hex_coord: options.hex_coord.unwrap_or_default(),
            current_weather: WeatherCondition {
                weather_type,
                severity: severity.clamp(0.0, 1.0),
                duration_hours,
            },
            temperature_c,
            wind_speed_kmh,
            precipitation_mm_per_hour,
            visibility_meters,
            last_update: options.timestamp.unwrap_or_else(Utc::now),
        }
    }

    /// Next state for the same hex, chaining from the current conditions.
    pub fn advance(
        &self,
        current: &WeatherState,
        climate: &ClimateTemplate,
        day_of_year: u32,
        options: &AdvanceOptions<'_>,
    ) -> WeatherState {
        let generation = GenerationOptions {
            climate,
            season: season_for_day(day_of_year),
            previous_weather: Some(current.current_weather),
            day_of_year,
            hour_of_day: options.hour_of_day.unwrap_or(DEFAULT_HOUR_OF_DAY),
            hex_coord: Some(current.hex_coord),
            wind_direction_deg: options
                .wind_direction_deg
                .unwrap_or(DEFAULT_WIND_DIRECTION_DEG),
            elevation_at: options.elevation_at,
            seed: options.seed,
            modifiers: options.modifiers,
            timestamp: options.timestamp,
        };
        let mut next = self.generate(&generation);
        next.hex_coord = current.hex_coord;
        next
    }

    fn precipitation(
        &self,
        weather_type: WeatherType,
        severity: f64,
        options: &GenerationOptions<'_>,
    ) -> f64 {
        let mut base = match weather_type {
            WeatherType::Rain => severity * 10.0,
            WeatherType::Storm => 5.0 + severity * 20.0,
            WeatherType::Snow => severity * 5.0,
            _ => 0.0,
        };

        if base > 0.0 {
            if let (Some(coord), Some(sampler)) = (options.hex_coord, options.elevation_at) {
                if let Some(shadow) =
                    self.rain_shadow
                        .calculate(coord, options.wind_direction_deg, sampler)
                {
                    base *= 1.0 + shadow.modifier;
                }
            }
        }
        base.max(0.0)
    }
}

/// Northern-hemisphere season for a day of year.
pub fn season_for_day(day_of_year: u32) -> Season {
    Season::for_day(day_of_year)
}

/// Generate with the default temperature baseline and rain shadow.
pub fn generate_weather(options: &GenerationOptions<'_>) -> WeatherState {
    WeatherGenerator::default().generate(options)
}

pub fn advance_weather(
    current: &WeatherState,
    climate: &ClimateTemplate,
    day_of_year: u32,
    options: &AdvanceOptions<'_>,
) -> WeatherState {
    WeatherGenerator::default().advance(current, climate, day_of_year, options)
}
