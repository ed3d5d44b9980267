use crate::weather::climate::WeatherDistribution;
use crate::weather::types::WeatherType;

/// Weight of the previous weather's affinity row when blending.
pub const DEFAULT_TRANSITION_WEIGHT: f64 = 0.4;

/// Affinity for any pair not listed in the table.
pub const BASELINE_AFFINITY: f64 = 0.01;

/// How readily weather moves from `from` to `to`, in `[0, 1]`.
pub fn affinity(from: WeatherType, to: WeatherType) -> f64 {
    use WeatherType::*;

    let row: &[(WeatherType, f64)] = match from {
        Clear => &[(Clear, 0.5), (Cloudy, 0.3), (Hot, 0.15), (Wind, 0.05)],
        Cloudy => &[
            (Cloudy, 0.3),
            (Clear, 0.2),
            (Rain, 0.2),
            (Fog, 0.15),
            (Wind, 0.1),
            (Storm, 0.05),
        ],
        Rain => &[(Rain, 0.4), (Cloudy, 0.3), (Storm, 0.15), (Clear, 0.1), (Fog, 0.05)],
        Storm => &[(Storm, 0.3), (Rain, 0.3), (Cloudy, 0.2), (Wind, 0.1), (Clear, 0.1)],
        Snow => &[(Snow, 0.5), (Cold, 0.2), (Cloudy, 0.15), (Wind, 0.1), (Clear, 0.05)],
        Fog => &[(Fog, 0.4), (Cloudy, 0.3), (Clear, 0.2), (Rain, 0.1)],
        Wind => &[(Wind, 0.4), (Cloudy, 0.25), (Clear, 0.2), (Storm, 0.1), (Fog, 0.05)],
        Hot => &[(Hot, 0.5), (Clear, 0.3), (Cloudy, 0.15), (Wind, 0.05)],
        Cold => &[(Cold, 0.5), (Snow, 0.2), (Cloudy, 0.15), (Clear, 0.1), (Wind, 0.05)],
    };

    row.iter()
        .find(|(t, _)| *t == to)
        .map(|&(_, a)| a)
        .unwrap_or(BASELINE_AFFINITY)
}

/// Bias season probabilities toward weather that follows naturally from `previous`.
///
/// `result[t] = season[t] * (1 - w) + affinity(previous, t) * w`, renormalized.
/// Without a previous type the season table is returned as is.
pub fn blend(
    season: &WeatherDistribution,
    previous: Option<WeatherType>,
    weight: f64,
) -> WeatherDistribution {
    let Some(prev) = previous else {
        return *season;
    };

    let w = weight.clamp(0.0, 1.0);
    let mut blended = WeatherDistribution::zero();
    for (t, p) in season.iter() {
        blended.set(t, p * (1.0 - w) + affinity(prev, t) * w);
    }
    blended.normalized().unwrap_or(*season)
}

/// Pick the first type, in canonical order, whose cumulative mass reaches `roll`.
/// Falls back to clear if rounding leaves the roll unmatched.
pub fn select_type(probabilities: &WeatherDistribution, roll: f64) -> WeatherType {
    let mut cumulative = 0.0;
    for (t, p) in probabilities.iter() {
        cumulative += p;
        if roll <= cumulative {
            return t;
        }
    }
    WeatherType::Clear
}
