use super::domain::{PropertyRecord, PropertyScoreInput};
use super::states::{normalize_code, StateConfig, StateRegistry};
use super::ScoringError;

/// Structurally invalid property data that cannot be scored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInputError {
    #[error("property has no sale amount")]
    MissingAmount,
    #[error("sale amount {0} is negative")]
    NegativeAmount(f64),
    #[error("sale amount is not a finite number")]
    NonFiniteAmount,
    #[error("acreage {0} is negative")]
    NegativeAcreage(f64),
    #[error("property is in state '{record}' but was scored against '{config}'")]
    StateMismatch { record: String, config: String },
}

/// Map a stored property onto a validated scoring input for its state.
pub fn build_input(
    record: &PropertyRecord,
    state: &StateConfig,
) -> Result<PropertyScoreInput, InvalidInputError> {
    let record_code = normalize_code(&record.state_code);
    if record_code != normalize_code(&state.state_code) {
        return Err(InvalidInputError::StateMismatch {
            record: record_code,
            config: state.state_code.clone(),
        });
    }

    let amount = record.amount.ok_or(InvalidInputError::MissingAmount)?;
    if !amount.is_finite() {
        return Err(InvalidInputError::NonFiniteAmount);
    }
    if amount < 0.0 {
        return Err(InvalidInputError::NegativeAmount(amount));
    }

    let acreage = match record.acreage.filter(|acres| acres.is_finite()) {
        Some(acres) if acres < 0.0 => return Err(InvalidInputError::NegativeAcreage(acres)),
        Some(acres) if acres > 0.0 => Some(acres),
        _ => None,
    };

    Ok(PropertyScoreInput {
        amount,
        acreage,
        water_score: finite(record.water_score),
        road_access_score: finite(record.road_access_score),
        county_market_score: finite(record.county_market_score),
        geographic_score: finite(record.geographic_score),
        total_description_score: finite(record.total_description_score),
        state: state.clone(),
        county: record
            .county
            .as_deref()
            .map(str::trim)
            .filter(|county| !county.is_empty())
            .map(str::to_string),
        year_sold: record.year_sold.as_deref().and_then(parse_year),
        known_market_value: positive(record.known_market_value),
        assessed_value: positive(record.assessed_value),
    })
}

/// Resolve the record's state through the registry, then build its input.
pub fn resolve_input(
    record: &PropertyRecord,
    registry: &StateRegistry,
) -> Result<PropertyScoreInput, ScoringError> {
    let state = registry.get_state_config(&record.state_code)?;
    Ok(build_input(record, state)?)
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|score| score.is_finite())
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|amount| amount.is_finite() && *amount > 0.0)
}

/// Scraped sale years arrive as "2019", "2019.0", or "2019-05-14"; anything
/// else is treated as unknown.
pub(crate) fn parse_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
    if digits.len() != 4 {
        return None;
    }
    let rest = &trimmed[digits.len()..];
    let well_formed = rest.is_empty()
        || rest.starts_with('-')
        || rest.starts_with('/')
        || rest.chars().all(|c| c == '.' || c == '0');
    if !well_formed {
        return None;
    }
    digits.parse().ok()
}
