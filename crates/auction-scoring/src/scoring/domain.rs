use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::states::StateConfig;

/// Identifier wrapper for stored auction properties.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PropertyId(pub String);

impl std::fmt::Display for PropertyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Property row as stored after scraping, including the last written scores.
///
/// Every scraped field is optional on a best-effort basis; the score fields
/// are only populated once a recalculation has written them back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: PropertyId,
    #[serde(default)]
    pub parcel_id: Option<String>,
    #[serde(alias = "state")]
    pub state_code: String,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub acreage: Option<f64>,
    #[serde(default)]
    pub water_score: Option<f64>,
    #[serde(default)]
    pub road_access_score: Option<f64>,
    #[serde(default)]
    pub county_market_score: Option<f64>,
    #[serde(default)]
    pub geographic_score: Option<f64>,
    #[serde(default)]
    pub total_description_score: Option<f64>,
    #[serde(default)]
    pub year_sold: Option<String>,
    #[serde(default)]
    pub known_market_value: Option<f64>,
    #[serde(default)]
    pub assessed_value: Option<f64>,
    #[serde(default)]
    pub scores: Option<StoredScores>,
}

impl PropertyRecord {
    pub fn apply_scores(&mut self, result: &ScoreResult, scored_at: DateTime<Utc>) {
        self.scores = Some(StoredScores::from_result(result, scored_at));
    }
}

/// Write-back columns owned by the recalculation driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredScores {
    pub buy_hold_score: f64,
    pub wholesale_score: f64,
    pub effective_cost: f64,
    pub time_penalty_factor: f64,
    pub is_market_reject: bool,
    pub is_delta_region: bool,
    pub delta_penalty_factor: f64,
    pub wholesale_spread: Option<f64>,
    pub estimated_market_value: Option<f64>,
    pub scored_at: DateTime<Utc>,
}

impl StoredScores {
    pub fn from_result(result: &ScoreResult, scored_at: DateTime<Utc>) -> Self {
        Self {
            buy_hold_score: result.buy_hold_score,
            wholesale_score: result.wholesale_score,
            effective_cost: result.effective_cost,
            time_penalty_factor: result.time_penalty_factor,
            is_market_reject: result.is_market_reject,
            is_delta_region: result.is_delta_region,
            delta_penalty_factor: result.delta_penalty_factor,
            wholesale_spread: result.wholesale_spread,
            estimated_market_value: result.estimated_market_value,
            scored_at,
        }
    }

    /// True when the scoring-relevant columns match a fresh result.
    pub fn matches(&self, result: &ScoreResult) -> bool {
        self.buy_hold_score == result.buy_hold_score
            && self.wholesale_score == result.wholesale_score
            && self.effective_cost == result.effective_cost
            && self.time_penalty_factor == result.time_penalty_factor
            && self.is_market_reject == result.is_market_reject
            && self.is_delta_region == result.is_delta_region
            && self.delta_penalty_factor == result.delta_penalty_factor
            && self.wholesale_spread == result.wholesale_spread
            && self.estimated_market_value == result.estimated_market_value
    }
}

/// Normalized, validated scoring input. Built per call and never persisted.
///
/// `None` always means "unknown" and must never be read as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyScoreInput {
    pub amount: f64,
    pub acreage: Option<f64>,
    pub water_score: Option<f64>,
    pub road_access_score: Option<f64>,
    pub county_market_score: Option<f64>,
    pub geographic_score: Option<f64>,
    pub total_description_score: Option<f64>,
    pub state: StateConfig,
    pub county: Option<String>,
    pub year_sold: Option<i32>,
    pub known_market_value: Option<f64>,
    pub assessed_value: Option<f64>,
}

impl PropertyScoreInput {
    pub fn state_code(&self) -> &str {
        &self.state.state_code
    }
}

/// Factors that contribute to the buy-hold composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Water,
    RoadAccess,
    CountyMarket,
    Geographic,
    Description,
    AcreageUtility,
    Affordability,
}

impl ScoreFactor {
    pub const fn label(self) -> &'static str {
        match self {
            ScoreFactor::Water => "water",
            ScoreFactor::RoadAccess => "road_access",
            ScoreFactor::CountyMarket => "county_market",
            ScoreFactor::Geographic => "geographic",
            ScoreFactor::Description => "description",
            ScoreFactor::AcreageUtility => "acreage_utility",
            ScoreFactor::Affordability => "affordability",
        }
    }
}

/// One weighted factor of the buy-hold composite, kept for audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub value: f64,
    pub weight: f64,
    pub notes: String,
}

/// Scoring output written back onto the stored property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub buy_hold_score: f64,
    pub wholesale_score: f64,
    pub effective_cost: f64,
    pub time_penalty_factor: f64,
    pub is_market_reject: bool,
    pub is_delta_region: bool,
    pub delta_penalty_factor: f64,
    pub capital_viable: bool,
    pub estimated_market_value: Option<f64>,
    pub wholesale_spread: Option<f64>,
    pub components: Vec<ScoreComponent>,
    pub notes: Vec<String>,
}
