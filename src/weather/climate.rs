use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

use crate::weather::types::{Season, WeatherType};

/// Name every unknown climate lookup falls back to.
pub const DEFAULT_CLIMATE: &str = "Temperate";

// === Probability tables ===

/// Probability mass per weather type, indexed in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherDistribution([f64; 9]);

impl WeatherDistribution {
    pub fn zero() -> Self {
        Self([0.0; 9])
    }

    /// Raw weights; types not listed stay at zero. Not normalized.
    pub fn from_weights(weights: &[(WeatherType, f64)]) -> Self {
        let mut d = Self::zero();
        for &(t, w) in weights {
            d.0[t.index()] += w;
        }
        d
    }

    pub fn get(&self, weather_type: WeatherType) -> f64 {
        self.0[weather_type.index()]
    }

    pub fn set(&mut self, weather_type: WeatherType, value: f64) {
        self.0[weather_type.index()] = value;
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Rescaled copy summing to 1.0, or `None` when there is no mass to scale.
    pub fn normalized(&self) -> Option<Self> {
        let total = self.total();
        if !total.is_finite() || total <= 0.0 {
            return None;
        }
        Some(Self(self.0.map(|p| p / total)))
    }

    /// Combined mass of rain, fog and storm.
    pub fn wet_mass(&self) -> f64 {
        WeatherType::ALL
            .into_iter()
            .filter(|t| t.is_wet())
            .map(|t| self.get(t))
            .sum()
    }

    /// `(type, probability)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (WeatherType, f64)> + '_ {
        WeatherType::ALL.into_iter().map(|t| (t, self.get(t)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalProbabilities {
    pub spring: WeatherDistribution,
    pub summer: WeatherDistribution,
    pub autumn: WeatherDistribution,
    pub winter: WeatherDistribution,
}

impl SeasonalProbabilities {
    pub fn get(&self, season: Season) -> &WeatherDistribution {
        match season {
            Season::Spring => &self.spring,
            Season::Summer => &self.summer,
            Season::Autumn => &self.autumn,
            Season::Winter => &self.winter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

impl TemperatureRange {
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

// === Templates ===

/// Named climate profile for a region.
///
/// Every season table sums to 1.0; [`ClimateTemplate::build`] normalizes the
/// hand-authored weights and refuses tables that cannot be normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateTemplate {
    pub name: String,
    pub base_temperature: TemperatureRange,
    pub seasonal_variation: f64,
    pub transition_speed_hours: f64,
    pub weather_probabilities: SeasonalProbabilities,
}

impl ClimateTemplate {
    /// Build a template from raw weights, one table per season in
    /// spring/summer/autumn/winter order.
    pub fn build(
        name: &str,
        base_temperature: TemperatureRange,
        seasonal_variation: f64,
        transition_speed_hours: f64,
        weights: [&[(WeatherType, f64)]; 4],
    ) -> Result<Self, ClimateError> {
        let mut problems = Vec::new();

        if !(base_temperature.min.is_finite() && base_temperature.max.is_finite())
            || base_temperature.min > base_temperature.max
        {
            problems.push(ClimateError::InvalidTemperatureRange {
                climate: name.to_string(),
                min: base_temperature.min,
                max: base_temperature.max,
            });
        }
        if !transition_speed_hours.is_finite() || transition_speed_hours <= 0.0 {
            problems.push(ClimateError::InvalidTransitionSpeed {
                climate: name.to_string(),
                hours: transition_speed_hours,
            });
        }
        if !seasonal_variation.is_finite() || seasonal_variation < 0.0 {
            problems.push(ClimateError::InvalidSeasonalVariation {
                climate: name.to_string(),
                value: seasonal_variation,
            });
        }

        let mut tables = [WeatherDistribution::zero(); 4];
        for (i, season) in Season::ALL.into_iter().enumerate() {
            for &(weather_type, weight) in weights[i] {
                if !weight.is_finite() || weight < 0.0 {
                    problems.push(ClimateError::InvalidWeight {
                        climate: name.to_string(),
                        season,
                        weather_type,
                        weight,
                    });
                }
            }
            match WeatherDistribution::from_weights(weights[i]).normalized() {
                Some(d) => tables[i] = d,
                None => problems.push(ClimateError::EmptySeason {
                    climate: name.to_string(),
                    season,
                }),
            }
        }

        if !problems.is_empty() {
            return Err(ClimateError::collect(problems));
        }

        let [spring, summer, autumn, winter] = tables;
        Ok(Self {
            name: name.to_string(),
            base_temperature,
            seasonal_variation,
            transition_speed_hours,
            weather_probabilities: SeasonalProbabilities {
                spring,
                summer,
                autumn,
                winter,
            },
        })
    }

    pub fn probabilities(&self, season: Season) -> &WeatherDistribution {
        self.weather_probabilities.get(season)
    }
}

// === Errors ===

/// Problems found while building climate templates.
#[derive(Debug, Clone, PartialEq)]
pub enum ClimateError {
    EmptySeason {
        climate: String,
        season: Season,
    },
    InvalidWeight {
        climate: String,
        season: Season,
        weather_type: WeatherType,
        weight: f64,
    },
    UnknownWeatherType {
        climate: String,
        season: Season,
        name: String,
    },
    InvalidTemperatureRange {
        climate: String,
        min: f64,
        max: f64,
    },
    InvalidTransitionSpeed {
        climate: String,
        hours: f64,
    },
    InvalidSeasonalVariation {
        climate: String,
        value: f64,
    },
    Io(String),
    Parse(String),
    Multiple(Vec<ClimateError>),
}

impl ClimateError {
    fn collect(mut problems: Vec<ClimateError>) -> Self {
        if problems.len() == 1 {
            problems.remove(0)
        } else {
            ClimateError::Multiple(problems)
        }
    }
}

impl fmt::Display for ClimateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClimateError::EmptySeason { climate, season } => write!(
                f,
                "{}: {} weights sum to zero, at least one weather type needs a positive weight",
                climate, season
            ),
            ClimateError::InvalidWeight {
                climate,
                season,
                weather_type,
                weight,
            } => write!(
                f,
                "{}: {} weight for {} must be a non-negative number, got {}",
                climate, season, weather_type, weight
            ),
            ClimateError::UnknownWeatherType {
                climate,
                season,
                name,
            } => write!(
                f,
                "{}: unknown weather type '{}' in {} table",
                climate, name, season
            ),
            ClimateError::InvalidTemperatureRange { climate, min, max } => write!(
                f,
                "{}: min_temperature must be <= max_temperature, got {} > {}",
                climate, min, max
            ),
            ClimateError::InvalidTransitionSpeed { climate, hours } => write!(
                f,
                "{}: transition_speed_hours must be > 0, got {}",
                climate, hours
            ),
            ClimateError::InvalidSeasonalVariation { climate, value } => write!(
                f,
                "{}: seasonal_variation must be >= 0, got {}",
                climate, value
            ),
            ClimateError::Io(e) => write!(f, "I/O error: {}", e),
            ClimateError::Parse(e) => write!(f, "Invalid climate file: {}", e),
            ClimateError::Multiple(errors) => {
                let lines: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                f.write_str(&lines.join("\n"))
            }
        }
    }
}

impl std::error::Error for ClimateError {}

// === Custom climate files ===

#[derive(Debug, Clone, Deserialize)]
struct ClimateFile {
    #[serde(default)]
    climate: Vec<ClimateDefinition>,
}

/// One `[[climate]]` table of a custom climate file.
#[derive(Debug, Clone, Deserialize)]
struct ClimateDefinition {
    name: String,
    min_temperature: f64,
    max_temperature: f64,
    #[serde(default)]
    seasonal_variation: f64,
    #[serde(default = "default_transition_speed")]
    transition_speed_hours: f64,
    #[serde(default)]
    spring: BTreeMap<String, f64>,
    #[serde(default)]
    summer: BTreeMap<String, f64>,
    #[serde(default)]
    autumn: BTreeMap<String, f64>,
    #[serde(default)]
    winter: BTreeMap<String, f64>,
}

fn default_transition_speed() -> f64 {
    12.0
}

impl ClimateDefinition {
    fn into_template(self) -> Result<ClimateTemplate, ClimateError> {
        let mut problems = Vec::new();
        let mut tables: [Vec<(WeatherType, f64)>; 4] = Default::default();
        let raw = [&self.spring, &self.summer, &self.autumn, &self.winter];

        for (i, season) in Season::ALL.into_iter().enumerate() {
            for (type_name, &weight) in raw[i] {
                match WeatherType::from_name(type_name) {
                    Some(t) => tables[i].push((t, weight)),
                    None => problems.push(ClimateError::UnknownWeatherType {
                        climate: self.name.clone(),
                        season,
                        name: type_name.clone(),
                    }),
                }
            }
        }

        let built = ClimateTemplate::build(
            &self.name,
            TemperatureRange {
                min: self.min_temperature,
                max: self.max_temperature,
            },
            self.seasonal_variation,
            self.transition_speed_hours,
            [&tables[0], &tables[1], &tables[2], &tables[3]],
        );

        match built {
            Ok(template) if problems.is_empty() => Ok(template),
            Ok(_) => Err(ClimateError::collect(problems)),
            Err(ClimateError::Multiple(errs)) => {
                problems.extend(errs);
                Err(ClimateError::collect(problems))
            }
            Err(e) => {
                problems.push(e);
                Err(ClimateError::collect(problems))
            }
        }
    }
}

// === Registry ===

/// Catalog of climate templates, looked up by case-insensitive name.
#[derive(Debug, Clone)]
pub struct ClimateRegistry {
    templates: Vec<ClimateTemplate>,
    fallback: ClimateTemplate,
}

impl ClimateRegistry {
    /// The six built-in templates.
    pub fn builtin() -> Self {
        let templates = builtin_templates();
        let fallback = templates
            .iter()
            .find(|t| t.name == DEFAULT_CLIMATE)
            .cloned()
            .unwrap_or_else(|| templates[0].clone());
        Self {
            templates,
            fallback,
        }
    }

    /// Built-ins plus the templates defined in a TOML climate file.
    pub fn from_file(path: &Path) -> Result<Self, ClimateError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClimateError::Io(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ClimateError> {
        let file: ClimateFile =
            toml::from_str(content).map_err(|e| ClimateError::Parse(e.to_string()))?;

        let mut registry = Self::builtin();
        let mut problems = Vec::new();
        for definition in file.climate {
            match definition.into_template() {
                Ok(template) => registry.insert(template),
                Err(ClimateError::Multiple(errs)) => problems.extend(errs),
                Err(e) => problems.push(e),
            }
        }

        if problems.is_empty() {
            Ok(registry)
        } else {
            Err(ClimateError::collect(problems))
        }
    }

    /// Add a template, replacing any existing one with the same name.
    pub fn insert(&mut self, template: ClimateTemplate) {
        if template.name.eq_ignore_ascii_case(DEFAULT_CLIMATE) {
            self.fallback = template.clone();
        }
        match self
            .templates
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(&template.name))
        {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    /// Look up a template. Unknown names get the Temperate template.
    pub fn get(&self, name: &str) -> &ClimateTemplate {
        let wanted = name.trim();
        match self
            .templates
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(wanted))
        {
            Some(template) => template,
            None => {
                debug!(climate = wanted, fallback = DEFAULT_CLIMATE, "Unknown climate template");
                &self.fallback
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates
            .iter()
            .any(|t| t.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn names(&self) -> Vec<String> {
        self.templates.iter().map(|t| t.name.clone()).collect()
    }

    pub fn templates(&self) -> &[ClimateTemplate] {
        &self.templates
    }
}

impl Default for ClimateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

static BUILTIN_REGISTRY: LazyLock<ClimateRegistry> = LazyLock::new(ClimateRegistry::builtin);

/// Built-in template by name, falling back to Temperate.
pub fn get_climate_template(name: &str) -> &'static ClimateTemplate {
    BUILTIN_REGISTRY.get(name)
}

pub fn list_climate_names() -> Vec<String> {
    BUILTIN_REGISTRY.names()
}

fn builtin_templates() -> Vec<ClimateTemplate> {
    use WeatherType::*;

    let table = |name: &str,
                 min: f64,
                 max: f64,
                 variation: f64,
                 speed: f64,
                 weights: [&[(WeatherType, f64)]; 4]| {
        ClimateTemplate::build(name, TemperatureRange { min, max }, variation, speed, weights)
            .expect("built-in climate tables are valid")
    };

    vec![
        table(
            "Arctic",
            -35.0,
            -8.0,
            20.0,
            18.0,
            [
                &[(Clear, 25.0), (Cloudy, 20.0), (Snow, 30.0), (Wind, 10.0), (Cold, 15.0)],
                &[(Clear, 35.0), (Cloudy, 25.0), (Rain, 10.0), (Fog, 15.0), (Wind, 10.0), (Snow, 5.0)],
                &[(Clear, 15.0), (Cloudy, 25.0), (Snow, 30.0), (Wind, 15.0), (Cold, 15.0)],
                &[(Clear, 15.0), (Cloudy, 10.0), (Snow, 40.0), (Wind, 15.0), (Cold, 20.0)],
            ],
        ),
        table(
            "Temperate",
            -2.0,
            24.0,
            15.0,
            12.0,
            [
                &[(Clear, 30.0), (Cloudy, 25.0), (Rain, 20.0), (Storm, 5.0), (Fog, 10.0), (Wind, 10.0)],
                &[(Clear, 40.0), (Cloudy, 15.0), (Rain, 10.0), (Storm, 10.0), (Hot, 20.0), (Wind, 5.0)],
                &[(Clear, 25.0), (Cloudy, 25.0), (Rain, 20.0), (Storm, 5.0), (Fog, 15.0), (Wind, 10.0)],
                &[(Clear, 20.0), (Cloudy, 25.0), (Snow, 25.0), (Fog, 10.0), (Wind, 5.0), (Cold, 15.0)],
            ],
        ),
        table(
            "Tropical",
            25.0,
            34.0,
            3.0,
            6.0,
            [
                &[(Clear, 25.0), (Cloudy, 20.0), (Rain, 25.0), (Storm, 10.0), (Hot, 20.0)],
                &[(Clear, 10.0), (Cloudy, 10.0), (Rain, 35.0), (Storm, 15.0), (Hot, 30.0)],
                &[(Clear, 20.0), (Cloudy, 20.0), (Rain, 30.0), (Storm, 15.0), (Hot, 15.0)],
                &[(Clear, 35.0), (Cloudy, 20.0), (Rain, 15.0), (Storm, 5.0), (Hot, 25.0)],
            ],
        ),
        table(
            "Desert",
            5.0,
            45.0,
            10.0,
            24.0,
            [
                &[(Clear, 50.0), (Cloudy, 5.0), (Wind, 20.0), (Hot, 25.0)],
                &[(Clear, 35.0), (Wind, 15.0), (Hot, 50.0)],
                &[(Clear, 55.0), (Cloudy, 5.0), (Wind, 20.0), (Hot, 20.0)],
                &[(Clear, 55.0), (Cloudy, 10.0), (Wind, 20.0), (Cold, 15.0)],
            ],
        ),
        table(
            "Mountain",
            -15.0,
            15.0,
            15.0,
            8.0,
            [
                &[(Clear, 25.0), (Cloudy, 25.0), (Rain, 15.0), (Snow, 15.0), (Fog, 10.0), (Wind, 10.0)],
                &[(Clear, 35.0), (Cloudy, 20.0), (Rain, 15.0), (Storm, 15.0), (Fog, 5.0), (Wind, 10.0)],
                &[(Clear, 25.0), (Cloudy, 25.0), (Rain, 10.0), (Snow, 20.0), (Fog, 10.0), (Wind, 10.0)],
                &[(Clear, 15.0), (Cloudy, 15.0), (Snow, 40.0), (Wind, 15.0), (Cold, 15.0)],
            ],
        ),
        table(
            "Coastal",
            4.0,
            22.0,
            8.0,
            10.0,
            [
                &[(Clear, 25.0), (Cloudy, 25.0), (Rain, 20.0), (Fog, 20.0), (Wind, 10.0)],
                &[(Clear, 40.0), (Cloudy, 20.0), (Rain, 10.0), (Storm, 5.0), (Fog, 15.0), (Wind, 10.0)],
                &[(Clear, 15.0), (Cloudy, 20.0), (Rain, 20.0), (Storm, 10.0), (Fog, 25.0), (Wind, 10.0)],
                &[(Clear, 15.0), (Cloudy, 25.0), (Rain, 25.0), (Storm, 10.0), (Fog, 15.0), (Wind, 10.0)],
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_builtin() -> Vec<&'static ClimateTemplate> {
        list_climate_names()
            .iter()
            .map(|n| get_climate_template(n))
            .collect()
    }

    #[test]
    fn builtin_names_in_catalog_order() {
        assert_eq!(
            list_climate_names(),
            vec!["Arctic", "Temperate", "Tropical", "Desert", "Mountain", "Coastal"]
        );
    }

    #[test]
    fn every_season_sums_to_one() {
        for climate in all_builtin() {
            for season in Season::ALL {
                let probs = climate.probabilities(season);
                assert!(
                    (probs.total() - 1.0).abs() < 1e-9,
                    "{} {} sums to {}",
                    climate.name,
                    season,
                    probs.total()
                );
                assert!(probs.iter().all(|(_, p)| p >= 0.0));
            }
        }
    }

    #[test]
    fn temperate_summer_has_hot_weather() {
        let summer = get_climate_template("Temperate").probabilities(Season::Summer);
        assert!((summer.total() - 1.0).abs() < 1e-9);
        assert!(summer.get(WeatherType::Hot) > 0.0);
    }

    #[test]
    fn unlisted_types_default_to_zero() {
        let desert = get_climate_template("Desert");
        assert_eq!(desert.probabilities(Season::Summer).get(WeatherType::Snow), 0.0);
        assert_eq!(desert.probabilities(Season::Summer).get(WeatherType::Fog), 0.0);
    }

    #[test]
    fn unknown_name_falls_back_to_temperate() {
        assert_eq!(get_climate_template("Volcanic").name, "Temperate");
        assert_eq!(get_climate_template("").name, "Temperate");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(get_climate_template("arctic").name, "Arctic");
        assert_eq!(get_climate_template(" COASTAL ").name, "Coastal");
    }

    #[test]
    fn temperature_ranges_are_ordered_by_climate() {
        let arctic = get_climate_template("Arctic");
        let temperate = get_climate_template("Temperate");
        let tropical = get_climate_template("Tropical");
        let desert = get_climate_template("Desert");
        assert!(arctic.base_temperature.max < temperate.base_temperature.min);
        assert!(temperate.base_temperature.max < tropical.base_temperature.min);
        assert!(desert.base_temperature.max > temperate.base_temperature.max);
    }

    #[test]
    fn climates_favor_characteristic_weather() {
        let arctic = get_climate_template("Arctic").probabilities(Season::Winter);
        assert!(arctic.get(WeatherType::Snow) > 0.3);

        let tropical = get_climate_template("Tropical").probabilities(Season::Summer);
        assert!(tropical.get(WeatherType::Rain) + tropical.get(WeatherType::Hot) > 0.5);

        let desert = get_climate_template("Desert").probabilities(Season::Summer);
        assert!(desert.get(WeatherType::Clear) + desert.get(WeatherType::Hot) > 0.7);

        let coastal = get_climate_template("Coastal").probabilities(Season::Autumn);
        assert!(coastal.get(WeatherType::Fog) > 0.2);

        let temperate = get_climate_template("Temperate");
        assert!(
            temperate.probabilities(Season::Summer).get(WeatherType::Hot)
                > temperate.probabilities(Season::Winter).get(WeatherType::Hot)
        );
        assert!(
            temperate.probabilities(Season::Winter).get(WeatherType::Snow)
                > temperate.probabilities(Season::Summer).get(WeatherType::Snow)
        );
    }

    #[test]
    fn build_normalizes_weights() {
        let t = ClimateTemplate::build(
            "Test",
            TemperatureRange { min: 0.0, max: 10.0 },
            5.0,
            12.0,
            [
                &[(WeatherType::Clear, 3.0), (WeatherType::Rain, 1.0)],
                &[(WeatherType::Hot, 2.0)],
                &[(WeatherType::Fog, 0.5)],
                &[(WeatherType::Snow, 7.0)],
            ],
        )
        .unwrap();
        assert!((t.probabilities(Season::Spring).get(WeatherType::Clear) - 0.75).abs() < 1e-12);
        assert_eq!(t.probabilities(Season::Summer).get(WeatherType::Hot), 1.0);
    }

    #[test]
    fn build_rejects_empty_season() {
        let err = ClimateTemplate::build(
            "Broken",
            TemperatureRange { min: 0.0, max: 10.0 },
            5.0,
            12.0,
            [&[(WeatherType::Clear, 1.0)], &[], &[(WeatherType::Fog, 1.0)], &[(WeatherType::Snow, 1.0)]],
        )
        .unwrap_err();
        assert!(matches!(err, ClimateError::EmptySeason { season: Season::Summer, .. }));
    }

    #[test]
    fn build_reports_every_problem() {
        let err = ClimateTemplate::build(
            "Broken",
            TemperatureRange { min: 10.0, max: 0.0 },
            5.0,
            0.0,
            [
                &[(WeatherType::Clear, -1.0), (WeatherType::Rain, 2.0)],
                &[(WeatherType::Hot, 1.0)],
                &[(WeatherType::Fog, 1.0)],
                &[(WeatherType::Snow, 1.0)],
            ],
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("min_temperature"), "{msg}");
        assert!(msg.contains("transition_speed_hours"), "{msg}");
        assert!(msg.contains("non-negative"), "{msg}");
    }

    #[test]
    fn custom_climate_file_adds_template() {
        let toml = r#"
            [[climate]]
            name = "Swamp"
            min_temperature = 8.0
            max_temperature = 30.0
            seasonal_variation = 6.0
            transition_speed_hours = 9.0

            [climate.spring]
            rain = 3
            fog = 5
            cloudy = 2

            [climate.summer]
            hot = 2
            storm = 1

            [climate.autumn]
            fog = 1

            [climate.winter]
            cold = 1
            fog = 1
        "#;
        let registry = ClimateRegistry::from_toml_str(toml).unwrap();
        assert!(registry.contains("swamp"));
        let swamp = registry.get("Swamp");
        assert!((swamp.probabilities(Season::Spring).get(WeatherType::Fog) - 0.5).abs() < 1e-12);
        assert_eq!(swamp.probabilities(Season::Autumn).get(WeatherType::Fog), 1.0);
        assert_eq!(registry.names().len(), 7);
    }

    #[test]
    fn custom_file_can_override_builtin() {
        let toml = r#"
            [[climate]]
            name = "temperate"
            min_temperature = 0.0
            max_temperature = 5.0
            [climate.spring]
            clear = 1
            [climate.summer]
            clear = 1
            [climate.autumn]
            clear = 1
            [climate.winter]
            clear = 1
        "#;
        let registry = ClimateRegistry::from_toml_str(toml).unwrap();
        assert_eq!(registry.names().len(), 6);
        assert_eq!(registry.get("Temperate").base_temperature.max, 5.0);
        assert_eq!(registry.get("unknown").base_temperature.max, 5.0);
    }

    #[test]
    fn custom_file_unknown_weather_type_rejected() {
        let toml = r#"
            [[climate]]
            name = "Odd"
            min_temperature = 0.0
            max_temperature = 5.0
            [climate.spring]
            blizzard = 1
            clear = 1
            [climate.summer]
            clear = 1
            [climate.autumn]
            clear = 1
            [climate.winter]
            clear = 1
        "#;
        let err = ClimateRegistry::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("blizzard"));
    }

    #[test]
    fn custom_file_malformed_toml() {
        let err = ClimateRegistry::from_toml_str("[[climate]\nname = ").unwrap_err();
        assert!(matches!(err, ClimateError::Parse(_)));
    }

    #[test]
    fn from_file_missing() {
        let err = ClimateRegistry::from_file(Path::new("/nonexistent/climates.toml")).unwrap_err();
        assert!(err.to_string().contains("Cannot read"));
    }
}
