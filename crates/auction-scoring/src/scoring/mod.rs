//! Multi-state investment scoring for tax-sale properties.
//!
//! Scraped rows are resolved against the [`StateRegistry`], normalized into a
//! [`PropertyScoreInput`], and scored by the [`ScoringEngine`]. The
//! [`recalculation`] module drives the engine over stored properties and
//! writes results back through a [`PropertyRepository`].

pub mod domain;
pub mod engine;
pub mod input;
pub mod recalculation;
pub mod risk;
pub mod states;

pub use domain::{
    PropertyId, PropertyRecord, PropertyScoreInput, ScoreComponent, ScoreFactor, ScoreResult,
    StoredScores,
};
pub use engine::{ComponentWeights, ScoringEngine, ScoringPolicy};
pub use input::{build_input, resolve_input, InvalidInputError};
pub use recalculation::{
    scoring_router, CancellationFlag, CsvPropertyStore, FailureKind, PropertyRepository,
    RankedProperty, RecalculationFailure, RecalculationScope, RecalculationSummary,
    RepositoryError, ScoreBoard, ScoringService, ScoringServiceError, StateScoreSummary,
    UnreadableRow,
};
pub use risk::{is_delta_region, is_market_reject, DistressedRegions, STALE_DELINQUENCY_THRESHOLD};
pub use states::{SaleType, StateConfig, StateRegistry, UnknownStateError};

/// Reasons a single property cannot be scored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error(transparent)]
    UnknownState(#[from] UnknownStateError),
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
}

/// Score one stored property against its state's regime.
pub fn score(
    engine: &ScoringEngine,
    record: &PropertyRecord,
    state: &StateConfig,
) -> Result<ScoreResult, ScoringError> {
    let input = build_input(record, state)?;
    Ok(engine.score(&input))
}
