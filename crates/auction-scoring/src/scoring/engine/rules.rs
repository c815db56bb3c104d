use super::policy::ScoringPolicy;
use crate::scoring::domain::{PropertyScoreInput, ScoreComponent, ScoreFactor};

const DAYS_PER_YEAR: f64 = 365.0;

pub(crate) fn effective_cost(amount: f64, quiet_title_cost: f64, buffer_pct: f64) -> f64 {
    (amount + quiet_title_cost) * (1.0 + buffer_pct)
}

/// `exp(-rate * years)`, held in (0, 1] even when the exponent underflows.
pub(crate) fn time_penalty_factor(time_to_ownership_days: u32, decay_rate: f64) -> f64 {
    let years = f64::from(time_to_ownership_days) / DAYS_PER_YEAR;
    (-decay_rate.max(0.0) * years)
        .exp()
        .clamp(f64::MIN_POSITIVE, 1.0)
}

/// Acreage sweet spot is 2-10 acres for recreational and residential use.
pub(crate) fn acreage_utility(acres: f64) -> f64 {
    if (2.0..=10.0).contains(&acres) {
        100.0
    } else if (10.0..=40.0).contains(&acres) {
        87.5
    } else if (1.0..2.0).contains(&acres) {
        70.0
    } else if acres > 40.0 {
        62.5
    } else if acres > 0.25 {
        37.5
    } else if acres > 0.0 {
        12.5
    } else {
        0.0
    }
}

/// Cheaper effective cost scores higher. Price per acre drives the score when
/// acreage is known, otherwise the share of the capital budget consumed.
pub(crate) fn affordability(effective_cost: f64, acreage: Option<f64>, capital_limit: f64) -> f64 {
    match acreage {
        Some(acres) => {
            let per_acre = effective_cost / acres;
            if per_acre < 300.0 {
                100.0
            } else if per_acre < 500.0 {
                83.0
            } else if per_acre < 1_000.0 {
                67.0
            } else if per_acre < 2_000.0 {
                40.0
            } else if per_acre < 5_000.0 {
                17.0
            } else {
                0.0
            }
        }
        None if capital_limit > 0.0 => {
            (100.0 * (1.0 - effective_cost / capital_limit)).clamp(0.0, 100.0)
        }
        None => 0.0,
    }
}

pub(crate) fn buy_hold_components(
    input: &PropertyScoreInput,
    effective_cost: f64,
    policy: &ScoringPolicy,
) -> Vec<ScoreComponent> {
    let weights = &policy.weights;
    let sub_scores = [
        (ScoreFactor::Water, input.water_score, weights.water),
        (ScoreFactor::RoadAccess, input.road_access_score, weights.road_access),
        (ScoreFactor::CountyMarket, input.county_market_score, weights.county_market),
        (ScoreFactor::Geographic, input.geographic_score, weights.geographic),
        (ScoreFactor::Description, input.total_description_score, weights.description),
    ];

    let mut components: Vec<ScoreComponent> = sub_scores
        .into_iter()
        .filter_map(|(factor, value, weight)| {
            value.map(|raw| {
                let value = raw.clamp(0.0, 100.0);
                let notes = if value == raw {
                    format!("{} sub-score {value:.1}", factor.label())
                } else {
                    format!("{} sub-score {raw:.1} clamped to {value:.1}", factor.label())
                };
                ScoreComponent {
                    factor,
                    value,
                    weight,
                    notes,
                }
            })
        })
        .collect();

    if let Some(acres) = input.acreage {
        components.push(ScoreComponent {
            factor: ScoreFactor::AcreageUtility,
            value: acreage_utility(acres),
            weight: weights.acreage_utility,
            notes: format!("{acres:.2} acres"),
        });
    }

    let notes = match input.acreage {
        Some(acres) => format!("effective cost ${:.0}/acre", effective_cost / acres),
        None => format!(
            "effective cost ${effective_cost:.0} of ${:.0} budget",
            policy.capital_limit
        ),
    };
    components.push(ScoreComponent {
        factor: ScoreFactor::Affordability,
        value: affordability(effective_cost, input.acreage, policy.capital_limit),
        weight: weights.affordability,
        notes,
    });

    components
}

/// Weighted mean of the components that are present.
pub(crate) fn composite(components: &[ScoreComponent]) -> f64 {
    let (weighted, total_weight) = components
        .iter()
        .filter(|component| component.weight > 0.0)
        .fold((0.0, 0.0), |(sum, weights), component| {
            (sum + component.value * component.weight, weights + component.weight)
        });

    if total_weight > 0.0 {
        weighted / total_weight
    } else {
        0.0
    }
}

/// Spread strength (0-60) plus margin strength above the minimum (0-40).
/// Zero unless the deal clears the minimum spread or the minimum margin.
pub(crate) fn wholesale_score(spread: f64, market_value: f64, policy: &ScoringPolicy) -> f64 {
    if market_value <= 0.0 || spread <= 0.0 {
        return 0.0;
    }

    let margin = spread / market_value;
    let viable = spread >= policy.min_wholesale_spread || margin >= policy.min_wholesale_margin;
    if !viable {
        return 0.0;
    }

    let spread_strength = if policy.excellent_wholesale_spread > 0.0 {
        (spread / policy.excellent_wholesale_spread * 60.0).min(60.0)
    } else {
        60.0
    };
    let margin_strength = if margin > policy.min_wholesale_margin {
        ((margin - policy.min_wholesale_margin) * 100.0).min(40.0)
    } else {
        0.0
    };

    spread_strength + margin_strength
}
