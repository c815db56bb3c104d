use serde::{Deserialize, Serialize};

use crate::scoring::risk::STALE_DELINQUENCY_THRESHOLD;

pub const DEFAULT_CAPITAL_LIMIT: f64 = 10_000.0;
/// Recording fees and deed preparation on top of price plus quiet title.
pub const DEFAULT_COST_BUFFER_PCT: f64 = 0.10;
pub const DEFAULT_DELTA_PENALTY_FACTOR: f64 = 0.50;
/// Per-year exponential decay: 30 days keeps 0.975, 2000 days keeps 0.180.
pub const DEFAULT_TIME_DECAY_RATE: f64 = 0.313;
pub const DEFAULT_MIN_WHOLESALE_SPREAD: f64 = 3_000.0;
pub const DEFAULT_MIN_WHOLESALE_MARGIN: f64 = 0.40;
/// Spread that earns the full spread-strength share of the wholesale score.
pub const DEFAULT_EXCELLENT_WHOLESALE_SPREAD: f64 = 10_000.0;

/// Tunable thresholds for the scoring rubric, kept in one place for audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub capital_limit: f64,
    pub cost_buffer_pct: f64,
    pub stale_delinquency_year: i32,
    pub delta_penalty_factor: f64,
    pub time_decay_rate: f64,
    pub min_wholesale_spread: f64,
    pub min_wholesale_margin: f64,
    pub excellent_wholesale_spread: f64,
    pub weights: ComponentWeights,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            capital_limit: DEFAULT_CAPITAL_LIMIT,
            cost_buffer_pct: DEFAULT_COST_BUFFER_PCT,
            stale_delinquency_year: STALE_DELINQUENCY_THRESHOLD,
            delta_penalty_factor: DEFAULT_DELTA_PENALTY_FACTOR,
            time_decay_rate: DEFAULT_TIME_DECAY_RATE,
            min_wholesale_spread: DEFAULT_MIN_WHOLESALE_SPREAD,
            min_wholesale_margin: DEFAULT_MIN_WHOLESALE_MARGIN,
            excellent_wholesale_spread: DEFAULT_EXCELLENT_WHOLESALE_SPREAD,
            weights: ComponentWeights::default(),
        }
    }
}

/// Relative weights of the buy-hold factors. Missing factors drop out of the
/// average, so the weights need not sum to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentWeights {
    pub water: f64,
    pub road_access: f64,
    pub county_market: f64,
    pub geographic: f64,
    pub description: f64,
    pub acreage_utility: f64,
    pub affordability: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            water: 0.15,
            road_access: 0.15,
            county_market: 0.15,
            geographic: 0.10,
            description: 0.10,
            acreage_utility: 0.15,
            affordability: 0.20,
        }
    }
}
