//! Batch and per-property recalculation against the storage collaborator.

pub mod repository;
pub mod router;
pub mod service;
pub mod store;
pub mod summary;

#[cfg(test)]
mod tests;

pub use repository::{PropertyRepository, RecalculationScope, RepositoryError, UnreadableRow};
pub use router::scoring_router;
pub use service::{
    CancellationFlag, FailureKind, RecalculationFailure, RecalculationSummary, ScoringService,
    ScoringServiceError,
};
pub use store::CsvPropertyStore;
pub use summary::{RankedProperty, ScoreBoard, StateScoreSummary};
