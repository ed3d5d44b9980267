pub mod generation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::region::RegionParams;
use crate::hex::CubeCoord;
use crate::weather::climate::{ClimateTemplate, get_climate_template};
use crate::weather::modifiers::ClimateModifierInput;
use crate::weather::rain_shadow::{RainShadowModel, RainShadowResult};

pub use generation::{generate_region, print_region_summary};

/// One hex of a region map with the terrain inputs the weather needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionHex {
    pub coord: CubeCoord,
    pub elevation_m: f64,
    /// 0.0-1.0
    pub moisture: f64,
    pub modifiers: ClimateModifierInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMap {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Parameters with the resolved seed.
    pub params: RegionParams,
    /// Sorted by coordinate.
    pub hexes: Vec<RegionHex>,
}

impl RegionMap {
    pub fn map_path(&self) -> &str {
        &self.params.map_path
    }

    pub fn seed(&self) -> u64 {
        self.params.seed
    }

    pub fn climate(&self) -> &'static ClimateTemplate {
        get_climate_template(&self.params.climate)
    }

    pub fn hex(&self, coord: CubeCoord) -> Option<&RegionHex> {
        self.hexes
            .binary_search_by_key(&coord, |h| h.coord)
            .ok()
            .map(|i| &self.hexes[i])
    }

    /// Elevation in meters; `None` outside the map.
    pub fn elevation_at(&self, coord: CubeCoord) -> Option<f64> {
        self.hex(coord).map(|h| h.elevation_m)
    }

    pub fn modifiers_at(&self, coord: CubeCoord) -> Option<&ClimateModifierInput> {
        self.hex(coord).map(|h| &h.modifiers)
    }

    /// Every shadowed hex of the map under one prevailing wind.
    pub fn rain_shadow_map<M: RainShadowModel>(
        &self,
        model: &M,
        wind_direction_deg: f64,
    ) -> BTreeMap<CubeCoord, RainShadowResult> {
        let coords: Vec<CubeCoord> = self.hexes.iter().map(|h| h.coord).collect();
        let elevation = |c: CubeCoord| self.elevation_at(c);
        model.calculate_map(&coords, wind_direction_deg, &elevation)
    }

    pub fn len(&self) -> usize {
        self.hexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hexes.is_empty()
    }

    /// Generation seed for a hex on a given day.
    ///
    /// The Cantor pairing of (q, r) keeps neighbouring hexes close in seed
    /// space; the region seed separates maps that share coordinates.
    pub fn hex_seed(&self, coord: CubeCoord, day_of_year: u32) -> i64 {
        hex_seed(coord, day_of_year).wrapping_add(self.params.seed as i64)
    }
}

/// `cantor(q, r) * 1000 + day_of_year`.
pub fn hex_seed(coord: CubeCoord, day_of_year: u32) -> i64 {
    let q = coord.q as i64;
    let r = coord.r as i64;
    let paired = (q + r) * (q + r + 1) / 2 + r;
    paired * 1000 + day_of_year as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::rain_shadow::RaycastRainShadow;

    fn small_region() -> RegionMap {
        generate_region(&RegionParams {
            seed: 11,
            radius: 2,
            ..Default::default()
        })
    }

    #[test]
    fn hex_seed_uses_cantor_pairing() {
        assert_eq!(hex_seed(CubeCoord::new(1, 2), 10), 8010);
        assert_eq!(hex_seed(CubeCoord::origin(), 1), 1);
        assert_eq!(hex_seed(CubeCoord::new(-1, 0), 200), 200);
        assert_ne!(
            hex_seed(CubeCoord::new(2, 0), 5),
            hex_seed(CubeCoord::new(0, 2), 5)
        );
    }

    #[test]
    fn region_seed_offsets_hex_seed() {
        let region = small_region();
        let coord = CubeCoord::new(1, -1);
        assert_eq!(region.hex_seed(coord, 40), hex_seed(coord, 40) + 11);
    }

    #[test]
    fn rain_shadow_map_matches_single_hex_lookups() {
        let mut region = small_region();
        for hex in &mut region.hexes {
            hex.elevation_m = if hex.coord == CubeCoord::new(-1, 0) { 2500.0 } else { 100.0 };
        }
        let model = RaycastRainShadow::default();
        let map = region.rain_shadow_map(&model, 90.0);

        assert!(map.contains_key(&CubeCoord::origin()));
        assert!(map.keys().all(|c| region.hex(*c).is_some()));
        for hex in &region.hexes {
            let elevation = |c: CubeCoord| region.elevation_at(c);
            let single = model.calculate(hex.coord, 90.0, &elevation);
            assert_eq!(map.get(&hex.coord), single.as_ref());
        }
    }

    #[test]
    fn lookup_inside_and_outside() {
        let region = small_region();
        assert!(region.hex(CubeCoord::origin()).is_some());
        assert!(region.elevation_at(CubeCoord::new(2, -2)).is_some());
        assert!(region.elevation_at(CubeCoord::new(3, 0)).is_none());
        assert!(region.modifiers_at(CubeCoord::new(5, 5)).is_none());
    }

    #[test]
    fn unknown_climate_falls_back() {
        let mut region = small_region();
        region.params.climate = "Swamp".to_string();
        assert_eq!(region.climate().name, "Temperate");
    }
}
