pub mod climate;
pub mod forecast;
pub mod generator;
pub mod modifiers;
pub mod rain_shadow;
pub mod rng;
pub mod temperature;
pub mod transition;
pub mod types;

pub use climate::{
    ClimateError, ClimateRegistry, ClimateTemplate, TemperatureRange, WeatherDistribution,
    get_climate_template, list_climate_names,
};
pub use forecast::{ConfidenceLevel, ForecastOptions, confidence_for_day, generate_forecast};
pub use generator::{
    AdvanceOptions, GenerationOptions, WeatherGenerator, advance_weather, generate_weather,
    season_for_day,
};
pub use modifiers::ClimateModifierInput;
pub use rain_shadow::{RainShadowModel, RainShadowResult, RaycastRainShadow};
pub use rng::SeededRng;
pub use temperature::{SeasonalBaseline, TemperatureSource};
pub use types::{
    ForecastEntry, HistoryEntry, Season, WeatherCondition, WeatherState, WeatherType,
};
