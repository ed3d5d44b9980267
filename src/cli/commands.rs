use chrono::{Datelike, NaiveDate};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::simulation::SimulationConfig;
use crate::hex::CubeCoord;
use crate::persistence::{self, SnapshotError};
use crate::region::{self, generate_region, print_region_summary};
use crate::simulation::{Simulation, SimulationState, day_timestamp, statistics::DayStatistics};
use crate::weather::climate::{ClimateRegistry, ClimateTemplate};
use crate::weather::forecast::{ConfidenceLevel, ForecastOptions};
use crate::weather::generator::{GenerationOptions, WeatherGenerator, season_for_day};
use crate::weather::rain_shadow::{RaycastRainShadow, format_lines};
use crate::weather::types::{ForecastEntry, HistoryEntry, WeatherState, WeatherType};

/// Days between progress lines in the run loop.
const PROGRESS_INTERVAL_DAYS: u64 = 30;

/// Arguments of the one-off `generate` command.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub climate: Option<String>,
    pub day_of_year: u32,
    pub hour_of_day: u32,
    pub seed: Option<i64>,
    pub q: i32,
    pub r: i32,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub climate: Option<String>,
    pub date: Option<String>,
    pub days: Option<u32>,
    pub q: i32,
    pub r: i32,
    pub json: bool,
}

/// Print every known climate template with its temperature range.
pub fn list_climates(config: &SimulationConfig) -> Result<(), String> {
    let registry = config.climate_registry()?;

    println!(
        "{:<14} {:>8} {:>8} {:>10} {:>12}",
        "Climate", "Min °C", "Max °C", "Seasonal", "Transition"
    );
    println!("{}", "-".repeat(56));
    for template in registry.templates() {
        println!(
            "{:<14} {:>8.1} {:>8.1} {:>10.1} {:>10.0} h",
            template.name,
            template.base_temperature.min,
            template.base_temperature.max,
            template.seasonal_variation,
            template.transition_speed_hours
        );
    }
    Ok(())
}

/// Generate a single weather state and print it.
pub fn generate(config: &SimulationConfig, request: &GenerateRequest) -> Result<(), String> {
    if !(1..=366).contains(&request.day_of_year) {
        return Err(format!("--day must be 1-366, got {}", request.day_of_year));
    }
    if request.hour_of_day > 23 {
        return Err(format!("--hour must be 0-23, got {}", request.hour_of_day));
    }

    let registry = config.climate_registry()?;
    let climate = resolve_climate(&registry, request.climate.as_deref(), &config.climate);
    let coord = CubeCoord::new(request.q, request.r);

    let mut options = GenerationOptions::new(
        climate,
        season_for_day(request.day_of_year),
        request.day_of_year,
    )
    .hour(request.hour_of_day)
    .at(coord)
    .wind_direction(config.wind_direction_deg);
    if let Some(seed) = request.seed {
        options = options.seed(seed);
    }

    let weather = WeatherGenerator::default().generate(&options);

    if request.json {
        let json = serde_json::to_string_pretty(&weather)
            .map_err(|e| format!("Cannot encode weather: {}", e))?;
        println!("{}", json);
    } else {
        println!(
            "=== {} | day {} | {:02}:00 | {} ===",
            climate.name,
            request.day_of_year,
            request.hour_of_day,
            options.season.name()
        );
        print_weather(&weather);
    }
    Ok(())
}

/// Forecast the coming days for one hex, starting from freshly generated
/// weather for the given date.
pub fn forecast(config: &SimulationConfig, request: &ForecastRequest) -> Result<(), String> {
    let date = match &request.date {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|e| format!("Invalid --date '{}': {}", d, e))?,
        None => config.start_date()?,
    };
    let days = request.days.unwrap_or(config.forecast_days);
    if days == 0 {
        return Err("--days must be at least 1".to_string());
    }

    let registry = config.climate_registry()?;
    let climate = resolve_climate(&registry, request.climate.as_deref(), &config.climate);
    let coord = CubeCoord::new(request.q, request.r);
    let today = day_timestamp(date);
    let day_of_year = date.ordinal();

    let generator = WeatherGenerator::default();
    let current = generator.generate(
        &GenerationOptions::new(climate, season_for_day(day_of_year), day_of_year)
            .at(coord)
            .wind_direction(config.wind_direction_deg)
            .seed(region::hex_seed(coord, day_of_year))
            .timestamp(today),
    );

    let mut options = ForecastOptions::new(&current, climate, today).days(days);
    options.wind_direction_deg = config.wind_direction_deg;
    options.generated_at = Some(today);
    let entries = generator.forecast(&options);

    if request.json {
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| format!("Cannot encode forecast: {}", e))?;
        println!("{}", json);
        return Ok(());
    }

    println!("=== {} forecast for hex {} from {} ===", climate.name, coord, date);
    println!("Today: {}", summarize(&current));
    println!();
    print_forecast(&entries);
    Ok(())
}

/// Run the simulation: load or create the region, then advance one day per tick
/// until interrupted.
pub async fn run_simulation(
    config: &SimulationConfig,
    snapshot_path: Option<&str>,
) -> Result<(), String> {
    let registry = config.climate_registry()?;
    let snapshot_dir = Path::new(&config.snapshot_directory);

    // 1. Load the latest state or start a new region
    let mut sim = match load_state(snapshot_dir, snapshot_path)? {
        Some(state) => {
            let climate = registry.get(&state.region.params.climate).clone();
            info!(
                day = state.day_count,
                next_date = %state.next_date,
                hexes = state.region.len(),
                "Resuming simulation"
            );
            Simulation::from_state(state, climate)
        }
        None => {
            let params = config.region_params();
            params.validate()?;
            let region = generate_region(&params);
            let climate = registry.get(&config.climate).clone();
            info!(
                seed = region.seed(),
                hexes = region.len(),
                climate = %climate.name,
                map = %region.map_path(),
                "Generated new region"
            );
            Simulation::new(
                region,
                climate,
                config.start_date()?,
                config.wind_direction_deg,
            )
        }
    };

    // 2. Set up shutdown signal
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // 3. Run the day loop
    let day_interval =
        Duration::try_from_secs_f64(1.0 / config.tick_rate_hz as f64).unwrap_or(Duration::MAX);
    let mut days_since_snapshot: u32 = 0;

    info!(
        tick_rate_hz = config.tick_rate_hz,
        snapshot_interval = config.snapshot_interval,
        "Simulation running"
    );

    loop {
        let day_start = Instant::now();

        let result = sim.step();
        let pruned = sim.prune(config.prune_max_age_days);
        if pruned > 0 {
            info!(pruned, "Pruned stale hex weather");
        }

        if sim.day_count() % PROGRESS_INTERVAL_DAYS == 0 {
            log_day(sim.day_count(), &result.statistics, &result.date);
        }

        // Periodic auto-save
        days_since_snapshot += 1;
        if days_since_snapshot >= config.snapshot_interval {
            match persistence::save_snapshot(&sim.state(), snapshot_dir) {
                Ok(path) => {
                    days_since_snapshot = 0;
                    info!(path = %path.display(), "Snapshot saved");

                    if let Err(e) =
                        persistence::prune_snapshots(snapshot_dir, config.max_snapshots as usize)
                    {
                        warn!(error = %e, "Snapshot pruning failed");
                    }
                }
                Err(e) => warn!(error = %e, "Snapshot save failed"),
            }
        }

        // Rate limiting: sleep the rest of the tick
        let elapsed = day_start.elapsed();
        if elapsed < day_interval {
            tokio::select! {
                _ = tokio::time::sleep(day_interval - elapsed) => {}
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        } else {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = tokio::task::yield_now() => {}
            }
        }
    }

    // Graceful shutdown: save final snapshot
    match persistence::save_snapshot(&sim.state(), snapshot_dir) {
        Ok(path) => info!(path = %path.display(), "Final snapshot saved"),
        Err(e) => warn!(error = %e, "Final snapshot save failed"),
    }

    info!(day = sim.day_count(), next_date = %sim.next_date(), "Simulation stopped");
    Ok(())
}

fn load_state(
    snapshot_dir: &Path,
    snapshot_path: Option<&str>,
) -> Result<Option<SimulationState>, String> {
    match snapshot_path {
        Some(path) => persistence::load_snapshot(Path::new(path))
            .map(Some)
            .map_err(|e| format!("Failed to load snapshot: {}", e)),
        None => match persistence::load_latest_valid_snapshot(snapshot_dir) {
            Ok(state) => Ok(Some(state)),
            Err(SnapshotError::NoValidSnapshots) => Ok(None),
            Err(e) => Err(format!("Failed to load snapshot: {}", e)),
        },
    }
}

fn log_day(day: u64, stats: &DayStatistics, date: &NaiveDate) {
    info!(
        day,
        %date,
        dominant = stats.dominant_type().map(WeatherType::name).unwrap_or("-"),
        avg_temp_c = stats.avg_temperature_c,
        diversity = stats.diversity_index,
        duration_ms = stats.duration_ms,
        "Day simulated"
    );
}

/// Inspect one hex from the latest snapshot: current weather, history,
/// forecast and rain shadow.
pub fn inspect(config: &SimulationConfig, q: i32, r: i32) -> Result<(), String> {
    let registry = config.climate_registry()?;
    let snapshot_dir = Path::new(&config.snapshot_directory);
    let state = persistence::load_latest_valid_snapshot(snapshot_dir)
        .map_err(|e| format!("Failed to load snapshot: {}", e))?;
    let climate = registry.get(&state.region.params.climate).clone();
    let sim = Simulation::from_state(state, climate);

    let coord = CubeCoord::new(q, r);
    let hex = sim.region().hex(coord).ok_or_else(|| {
        format!(
            "Hex {} is outside the region (radius {})",
            coord,
            sim.region().params.radius
        )
    })?;

    println!("=== Hex {} on {} ===", coord, sim.region().map_path());
    println!("Climate: {}", sim.climate().name);
    println!("Elevation: {:.0} m", hex.elevation_m);
    println!("Moisture: {:.2}", hex.moisture);
    match sim.weather_date() {
        Some(date) => println!("Date: {} (day {})", date, sim.day_count()),
        None => println!("Date: not simulated yet"),
    }
    println!();

    println!("--- Current ---");
    match sim.store().get_weather(sim.region().map_path(), coord.q, coord.r, coord.s) {
        Some(weather) => print_weather(&weather),
        None => println!("  (no weather)"),
    }
    println!();

    println!("--- History ---");
    let history = sim
        .store()
        .get_weather_history(sim.region().map_path(), coord.q, coord.r, coord.s);
    print_history(&history);
    println!();

    println!("--- Forecast ---");
    match sim.forecast(coord, config.forecast_days) {
        Some(entries) => print_forecast(&entries),
        None => println!("  (no forecast)"),
    }
    println!();

    println!("--- Terrain ---");
    match sim.rain_shadow_at(coord) {
        Some(shadow) => {
            for line in format_lines(&shadow) {
                println!("  {}", line);
            }
        }
        None => println!("  No rain shadow"),
    }
    let shadowed = sim.rain_shadow_map().len();
    println!(
        "  Shadowed hexes on map: {} of {} (wind {:.0}°)",
        shadowed,
        sim.region().len(),
        sim.wind_direction_deg()
    );

    Ok(())
}

/// Summarize a snapshot's region and the weather it holds.
pub fn describe_state(state: &SimulationState) {
    print_region_summary(&state.region);
    println!();
    println!("Days simulated: {}", state.day_count);
    println!("Next date: {}", state.next_date);
    println!("Wind: {:.0}°", state.wind_direction_deg);

    let shadows = state
        .region
        .rain_shadow_map(&RaycastRainShadow::default(), state.wind_direction_deg);
    match shadows
        .iter()
        .min_by(|a, b| a.1.modifier.total_cmp(&b.1.modifier))
    {
        Some((coord, strongest)) => println!(
            "Rain shadow: {} hexes, strongest {:.0}% at {}",
            shadows.len(),
            strongest.modifier * 100.0,
            coord
        ),
        None => println!("Rain shadow: none"),
    }

    let weather = state.weather.map_weather(state.region.map_path());
    if weather.is_empty() {
        return;
    }
    let stats = crate::simulation::statistics::compute_statistics(&weather, 0.0);
    println!("\nWeather:");
    for (weather_type, count) in &stats.type_distribution {
        let pct = *count as f64 / stats.hex_count as f64 * 100.0;
        println!("  {:<8} {:>5} ({:.1}%)", weather_type.name(), count, pct);
    }
    println!("  Avg temperature: {:.1}°C", stats.avg_temperature_c);
    println!("  Diversity: {:.3}", stats.diversity_index);
}

fn resolve_climate<'a>(
    registry: &'a ClimateRegistry,
    requested: Option<&str>,
    configured: &str,
) -> &'a ClimateTemplate {
    registry.get(requested.unwrap_or(configured))
}

fn summarize(weather: &WeatherState) -> String {
    format!(
        "{} ({:.0}%), {:.1}°C",
        weather.weather_type().name(),
        weather.current_weather.severity * 100.0,
        weather.temperature_c
    )
}

fn print_weather(weather: &WeatherState) {
    let condition = &weather.current_weather;
    println!("  Weather: {}", condition.weather_type.name());
    println!("  Severity: {:.0}%", condition.severity * 100.0);
    println!("  Duration: {:.0} h", condition.duration_hours);
    println!("  Temperature: {:.1}°C", weather.temperature_c);
    println!("  Wind: {:.1} km/h", weather.wind_speed_kmh);
    println!("  Precipitation: {:.1} mm/h", weather.precipitation_mm_per_hour);
    println!("  Visibility: {:.0} m", weather.visibility_meters);
}

fn print_history(history: &[HistoryEntry]) {
    if history.is_empty() {
        println!("  (none)");
        return;
    }
    for entry in history.iter().rev() {
        println!(
            "  {}  {}",
            entry.date.format("%Y-%m-%d"),
            summarize(&entry.weather)
        );
    }
}

fn print_forecast(entries: &[ForecastEntry]) {
    for entry in entries {
        let level = ConfidenceLevel::from_confidence(entry.confidence);
        println!(
            "  {}  {:<28} {:>3.0}% {}",
            entry.date.format("%Y-%m-%d"),
            summarize(&entry.weather),
            entry.confidence * 100.0,
            level
        );
    }
}
