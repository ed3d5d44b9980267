use chrono::Utc;
use noise::{NoiseFn, Perlin};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use uuid::Uuid;

use crate::config::region::RegionParams;
use crate::hex::{CubeCoord, hexes_within};
use crate::region::{RegionHex, RegionMap};
use crate::weather::modifiers::{ClimateModifierInput, TemperatureModifier, WindModifier};
use crate::weather::rain_shadow::MOUNTAIN_THRESHOLD_M;

const ELEVATION_SCALE: f64 = 0.15;
const MOISTURE_SCALE: f64 = 0.22;
/// Standard atmosphere lapse rate, °C per meter.
const LAPSE_RATE_C_PER_M: f64 = -0.0065;
/// Extra wind per 100 m above the mountain threshold, km/h.
const PEAK_WIND_PER_100M: f64 = 1.0;

/// Generate a new region map from the given parameters.
///
/// If `params.seed` is 0, a random seed is chosen. The actual seed used
/// is stored in the returned map's `params` for reproducibility.
pub fn generate_region(params: &RegionParams) -> RegionMap {
    let seed = if params.seed == 0 {
        rand::thread_rng().r#gen()
    } else {
        params.seed
    };
    let resolved_params = RegionParams {
        seed,
        ..params.clone()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let elevation_noise = Perlin::new(seed as u32);
    let moisture_noise = Perlin::new(seed.wrapping_add(1) as u32);

    let hexes: Vec<RegionHex> = hexes_within(CubeCoord::origin(), params.radius)
        .into_iter()
        .map(|coord| {
            let (x, y) = plane_position(coord);
            let elevation_m = sample_elevation(&elevation_noise, x, y, params.elevation_peak_m);
            let moisture = sample_moisture(&moisture_noise, x, y, params.moisture_roughness);
            RegionHex {
                coord,
                elevation_m,
                moisture,
                modifiers: derive_modifiers(elevation_m, moisture),
            }
        })
        .collect();

    let id = Uuid::from_bytes(rng.r#gen());
    debug!(seed, hexes = hexes.len(), "Generated region");

    RegionMap {
        id,
        name: format!("Region-{}", seed),
        created_at: Utc::now(),
        params: resolved_params,
        hexes,
    }
}

/// Print a summary of the generated region.
pub fn print_region_summary(region: &RegionMap) {
    println!("=== Region Summary ===");
    println!("Name: {}", region.name);
    println!("Map: {}", region.map_path());
    println!("Hexes: {}", region.len());
    println!("Seed: {}", region.seed());
    println!("Climate: {}", region.climate().name);

    if region.is_empty() {
        return;
    }

    let count = region.len() as f64;
    let (min_elev, max_elev) = region
        .hexes
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), h| {
            (lo.min(h.elevation_m), hi.max(h.elevation_m))
        });
    let avg_moisture = region.hexes.iter().map(|h| h.moisture).sum::<f64>() / count;
    let peaks = region
        .hexes
        .iter()
        .filter(|h| h.elevation_m >= MOUNTAIN_THRESHOLD_M)
        .count();

    println!("\nTerrain:");
    println!("  {:<12} {:>7.0} m", "Lowest", min_elev);
    println!("  {:<12} {:>7.0} m", "Highest", max_elev);
    println!(
        "  {:<12} {:>7} ({:.1}%)",
        "Peaks",
        peaks,
        peaks as f64 / count * 100.0
    );
    println!("  {:<12} {:>7.2}", "Moisture", avg_moisture);
}

// --- Internal generation functions ---

/// Pointy-top axial to plane coordinates, one unit per hex.
fn plane_position(coord: CubeCoord) -> (f64, f64) {
    let q = coord.q as f64;
    let r = coord.r as f64;
    (3f64.sqrt() * (q + r / 2.0), 1.5 * r)
}

fn sample_elevation(perlin: &Perlin, x: f64, y: f64, peak_m: f64) -> f64 {
    let n = perlin.get([x * ELEVATION_SCALE, y * ELEVATION_SCALE]);
    // Squaring flattens lowlands and leaves a few sharp peaks.
    let t = ((n + 1.0) / 2.0).clamp(0.0, 1.0);
    t * t * peak_m
}

fn sample_moisture(perlin: &Perlin, x: f64, y: f64, roughness: f64) -> f64 {
    let n = perlin.get([x * MOISTURE_SCALE, y * MOISTURE_SCALE]);
    (0.5 + 0.5 * n * roughness).clamp(0.0, 1.0)
}

fn derive_modifiers(elevation_m: f64, moisture: f64) -> ClimateModifierInput {
    let temperature = (elevation_m > 0.0).then(|| TemperatureModifier {
        avg: Some(elevation_m * LAPSE_RATE_C_PER_M),
        ..Default::default()
    });
    let wind = (elevation_m > MOUNTAIN_THRESHOLD_M).then(|| WindModifier {
        speed: (elevation_m - MOUNTAIN_THRESHOLD_M) / 100.0 * PEAK_WIND_PER_100M,
    });

    ClimateModifierInput {
        temperature,
        wind,
        cloud_cover: Some((moisture * 0.8).clamp(0.0, 1.0)),
        sunlight: Some((0.5 - moisture).clamp(-1.0, 1.0)),
        moisture: Some(moisture),
    }
}
