pub mod statistics;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::hex::CubeCoord;
use crate::region::RegionMap;
use crate::simulation::statistics::DayStatistics;
use crate::store::{WeatherSnapshot, WeatherStore};
use crate::weather::climate::ClimateTemplate;
use crate::weather::forecast::ForecastOptions;
use crate::weather::generator::{
    DEFAULT_HOUR_OF_DAY, GenerationOptions, WeatherGenerator, season_for_day,
};
use crate::weather::rain_shadow::{ElevationSampler, RainShadowModel, RainShadowResult};
use crate::weather::temperature::TemperatureSource;
use crate::weather::types::{ForecastEntry, Season, WeatherState};

/// Everything needed to resume a simulation: the region and the store contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub id: Uuid,
    /// Days simulated so far.
    pub day_count: u64,
    /// The date the next step will simulate.
    pub next_date: NaiveDate,
    pub wind_direction_deg: f64,
    pub region: RegionMap,
    pub weather: WeatherSnapshot,
}

impl SimulationState {
    /// Date of the weather currently in the store; `None` before the first day.
    pub fn weather_date(&self) -> Option<NaiveDate> {
        weather_date(self.day_count, self.next_date)
    }
}

/// Result of simulating a single day.
#[derive(Debug)]
pub struct DayResult {
    pub date: NaiveDate,
    pub day_of_year: u32,
    pub season: Season,
    /// True when the map had no weather yet and was written as one batch.
    pub initial: bool,
    pub statistics: DayStatistics,
}

/// Simulated clock for a calendar day: midday UTC.
pub fn day_timestamp(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc() + Duration::hours(DEFAULT_HOUR_OF_DAY as i64)
}

fn weather_date(day_count: u64, next_date: NaiveDate) -> Option<NaiveDate> {
    if day_count == 0 {
        None
    } else {
        next_date.pred_opt()
    }
}

/// Generate one day of weather for every hex of the region and write it
/// to the store.
///
/// Hexes are generated in parallel via rayon, each chaining from the
/// weather the store held for it before this call. The first day of a map
/// is written as one batch; later days go through `set_weather_many` so
/// every replaced state lands in history, published as a single update.
pub fn advance_day<T: TemperatureSource, R: RainShadowModel>(
    region: &RegionMap,
    climate: &ClimateTemplate,
    store: &WeatherStore,
    generator: &WeatherGenerator<T, R>,
    date: NaiveDate,
    wind_direction_deg: f64,
) -> DayResult {
    let start = Instant::now();
    let day_of_year = date.ordinal();
    let season = season_for_day(day_of_year);
    let timestamp = day_timestamp(date);
    let map_path = region.map_path();

    // Every hex reads the same pre-day snapshot.
    let previous = store.snapshot();
    let elevation = |coord: CubeCoord| region.elevation_at(coord);
    let sampler: ElevationSampler<'_> = &elevation;

    let states: Vec<WeatherState> = region
        .hexes
        .par_iter()
        .map(|hex| {
            let options = GenerationOptions::new(climate, season, day_of_year)
                .hour(DEFAULT_HOUR_OF_DAY)
                .at(hex.coord)
                .previous(previous.get(map_path, hex.coord).map(|w| w.current_weather))
                .wind_direction(wind_direction_deg)
                .elevation(sampler)
                .modifiers(Some(&hex.modifiers))
                .seed(region.hex_seed(hex.coord, day_of_year))
                .timestamp(timestamp);
            generator.generate(&options)
        })
        .collect();

    let mut statistics = statistics::compute_statistics(&states, 0.0);

    let initial = !previous.current.values().any(|e| e.map_path == map_path);
    if initial {
        store.set_weather_batch(map_path, states);
    } else {
        store.set_weather_many(map_path, states);
    }

    statistics.duration_ms = start.elapsed().as_secs_f32() * 1000.0;
    debug!(
        %date,
        day_of_year,
        hexes = statistics.hex_count,
        initial,
        "Advanced region weather"
    );

    DayResult {
        date,
        day_of_year,
        season,
        initial,
        statistics,
    }
}

/// A region, its climate and the store holding its weather, stepped one
/// day at a time.
#[derive(Debug)]
pub struct Simulation {
    id: Uuid,
    region: RegionMap,
    climate: ClimateTemplate,
    store: WeatherStore,
    generator: WeatherGenerator,
    day_count: u64,
    next_date: NaiveDate,
    wind_direction_deg: f64,
}

impl Simulation {
    pub fn new(
        region: RegionMap,
        climate: ClimateTemplate,
        start_date: NaiveDate,
        wind_direction_deg: f64,
    ) -> Self {
        let store = WeatherStore::new();
        store.set_active_map(Some(region.map_path()));
        Self {
            id: region.id,
            region,
            climate,
            store,
            generator: WeatherGenerator::default(),
            day_count: 0,
            next_date: start_date,
            wind_direction_deg,
        }
    }

    pub fn from_state(state: SimulationState, climate: ClimateTemplate) -> Self {
        let store = WeatherStore::from_snapshot(state.weather);
        store.set_active_map(Some(state.region.map_path()));
        Self {
            id: state.id,
            region: state.region,
            climate,
            store,
            generator: WeatherGenerator::default(),
            day_count: state.day_count,
            next_date: state.next_date,
            wind_direction_deg: state.wind_direction_deg,
        }
    }

    pub fn state(&self) -> SimulationState {
        SimulationState {
            id: self.id,
            day_count: self.day_count,
            next_date: self.next_date,
            wind_direction_deg: self.wind_direction_deg,
            region: self.region.clone(),
            weather: (*self.store.snapshot()).clone(),
        }
    }

    /// Simulate the next day and move the calendar forward.
    pub fn step(&mut self) -> DayResult {
        let result = advance_day(
            &self.region,
            &self.climate,
            &self.store,
            &self.generator,
            self.next_date,
            self.wind_direction_deg,
        );
        self.day_count += 1;
        self.next_date = self.next_date.succ_opt().unwrap_or(self.next_date);
        result
    }

    /// Drop hexes whose weather is older than `max_age_days` on the simulated clock.
    pub fn prune(&self, max_age_days: u32) -> usize {
        let now = day_timestamp(self.weather_date().unwrap_or(self.next_date));
        self.store.prune_old_weather_at(now, max_age_days)
    }

    pub fn forecast(&self, coord: CubeCoord, days: u32) -> Option<Vec<ForecastEntry>> {
        let current = self.store.snapshot().get(self.region.map_path(), coord)?.clone();
        let hex = self.region.hex(coord)?;
        let today = day_timestamp(self.weather_date()?);

        let elevation = |c: CubeCoord| self.region.elevation_at(c);
        let mut options = ForecastOptions::new(&current, &self.climate, today).days(days);
        options.wind_direction_deg = self.wind_direction_deg;
        options.elevation_at = Some(&elevation);
        options.modifiers = Some(&hex.modifiers);
        options.generated_at = Some(today);
        Some(self.generator.forecast(&options))
    }

    /// Rain shadow over a hex under the current prevailing wind.
    pub fn rain_shadow_at(&self, coord: CubeCoord) -> Option<RainShadowResult> {
        let elevation = |c: CubeCoord| self.region.elevation_at(c);
        self.generator
            .rain_shadow()
            .calculate(coord, self.wind_direction_deg, &elevation)
    }

    /// Every shadowed hex of the region under the current prevailing wind.
    pub fn rain_shadow_map(&self) -> BTreeMap<CubeCoord, RainShadowResult> {
        self.region
            .rain_shadow_map(self.generator.rain_shadow(), self.wind_direction_deg)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn region(&self) -> &RegionMap {
        &self.region
    }

    pub fn climate(&self) -> &ClimateTemplate {
        &self.climate
    }

    pub fn store(&self) -> &WeatherStore {
        &self.store
    }

    pub fn day_count(&self) -> u64 {
        self.day_count
    }

    pub fn next_date(&self) -> NaiveDate {
        self.next_date
    }

    pub fn weather_date(&self) -> Option<NaiveDate> {
        weather_date(self.day_count, self.next_date)
    }

    pub fn wind_direction_deg(&self) -> f64 {
        self.wind_direction_deg
    }
}
