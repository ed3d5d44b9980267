use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::hex::CubeCoord;

/// Elevation below which terrain never blocks moisture, in meters.
pub const MOUNTAIN_THRESHOLD_M: f64 = 1500.0;
/// Longest shadow any peak can cast, in hexes.
pub const MAX_SHADOW_RANGE: f64 = 15.0;
/// Precipitation change right behind a peak.
pub const MAX_SHADOW_MODIFIER: f64 = -0.5;
pub const DEFAULT_MAX_RAYCAST_DISTANCE: u32 = 20;

/// Elevation lookup in meters; `None` where the map has no data.
pub type ElevationSampler<'a> = &'a (dyn Fn(CubeCoord) -> Option<f64> + Sync);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RainShadowResult {
    /// -0.5 to 0.0, multiplied into precipitation as `1 + modifier`
    pub modifier: f64,
    pub blocking_coord: CubeCoord,
    pub blocking_elevation: f64,
    pub distance: u32,
    pub shadow_range: f64,
}

/// Lee-side precipitation reduction.
pub trait RainShadowModel: Send + Sync {
    /// `None` means no shadow was found and precipitation stays as is.
    fn calculate(
        &self,
        coord: CubeCoord,
        wind_direction_deg: f64,
        elevation_at: ElevationSampler<'_>,
    ) -> Option<RainShadowResult>;

    /// Shadow for every listed hex under one wind; unshadowed hexes are left out.
    fn calculate_map(
        &self,
        coords: &[CubeCoord],
        wind_direction_deg: f64,
        elevation_at: ElevationSampler<'_>,
    ) -> BTreeMap<CubeCoord, RainShadowResult> {
        coords
            .iter()
            .filter_map(|&c| Some((c, self.calculate(c, wind_direction_deg, elevation_at)?)))
            .collect()
    }
}

/// Marches upwind from the hex looking for the first peak whose shadow reaches it.
#[derive(Debug, Clone, Copy)]
pub struct RaycastRainShadow {
    pub max_distance: u32,
}

impl Default for RaycastRainShadow {
    fn default() -> Self {
        Self {
            max_distance: DEFAULT_MAX_RAYCAST_DISTANCE,
        }
    }
}

impl RainShadowModel for RaycastRainShadow {
    fn calculate(
        &self,
        coord: CubeCoord,
        wind_direction_deg: f64,
        elevation_at: ElevationSampler<'_>,
    ) -> Option<RainShadowResult> {
        let upwind = opposite_direction(bearing_to_hex_direction(wind_direction_deg));

        let mut current = coord;
        for _ in 0..self.max_distance {
            current = current.neighbor(upwind);
            let Some(elevation) = elevation_at(current) else {
                continue;
            };
            if elevation < MOUNTAIN_THRESHOLD_M {
                continue;
            }

            let range = shadow_range(elevation);
            let distance = coord.distance(&current);
            if distance as f64 <= range {
                return Some(RainShadowResult {
                    modifier: shadow_modifier(distance as f64, range),
                    blocking_coord: current,
                    blocking_elevation: elevation,
                    distance,
                    shadow_range: range,
                });
            }
        }
        None
    }
}

/// Hex direction a compass bearing blows toward (0 = East, see [`CubeCoord::neighbor`]).
pub fn bearing_to_hex_direction(bearing: f64) -> usize {
    let normalized = bearing.rem_euclid(360.0);
    match normalized {
        b if (60.0..120.0).contains(&b) => 0,
        b if (0.0..60.0).contains(&b) => 1,
        b if (300.0..360.0).contains(&b) => 2,
        b if (240.0..300.0).contains(&b) => 3,
        b if (180.0..240.0).contains(&b) => 4,
        _ => 5,
    }
}

pub fn opposite_direction(direction: usize) -> usize {
    (direction + 3) % 6
}

/// Shadow length in hexes; taller peaks reach further, capped at [`MAX_SHADOW_RANGE`].
pub fn shadow_range(elevation: f64) -> f64 {
    if elevation < MOUNTAIN_THRESHOLD_M {
        return 0.0;
    }
    (1.0 + (elevation - MOUNTAIN_THRESHOLD_M) / 150.0).min(MAX_SHADOW_RANGE)
}

/// Linear decay from the full modifier at the peak to nothing at the edge of its range.
pub fn shadow_modifier(distance: f64, range: f64) -> f64 {
    if distance <= 0.0 || range <= 0.0 || distance >= range {
        return 0.0;
    }
    MAX_SHADOW_MODIFIER * (1.0 - distance / range)
}

/// Inspector lines for a shadow result.
pub fn format_lines(result: &RainShadowResult) -> Vec<String> {
    vec![
        format!("Rain Shadow: {}%", (result.modifier * 100.0).round()),
        format!(
            "Mountain at ({},{}): {}m",
            result.blocking_coord.q,
            result.blocking_coord.r,
            result.blocking_elevation.round()
        ),
        format!("Distance: {} hexes", result.distance),
        format!("Shadow Range: {:.1} hexes", result.shadow_range),
    ]
}
