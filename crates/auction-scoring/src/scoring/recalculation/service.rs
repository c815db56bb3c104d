use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::repository::{PropertyRepository, RecalculationScope, RepositoryError};
use crate::scoring::domain::{PropertyId, PropertyRecord, ScoreResult, StoredScores};
use crate::scoring::engine::{ScoringEngine, ScoringPolicy};
use crate::scoring::input::resolve_input;
use crate::scoring::states::StateRegistry;
use crate::scoring::ScoringError;

const PROGRESS_INTERVAL: usize = 500;

/// Cooperative stop signal checked between properties.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Why a single property was skipped during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownState,
    InvalidInput,
    Storage,
    /// The stored row could not be read as a property at all.
    UnreadableRow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalculationFailure {
    pub property_id: PropertyId,
    pub kind: FailureKind,
    pub reason: String,
}

/// Per-run report: `N processed, M skipped, errors: [...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalculationSummary {
    pub scope: RecalculationScope,
    pub processed: usize,
    pub skipped: usize,
    /// Processed properties whose stored scores were already current.
    pub unchanged: usize,
    pub errors: Vec<RecalculationFailure>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RecalculationSummary {
    pub fn headline(&self) -> String {
        let mode = if self.scope.dry_run { " (dry run)" } else { "" };
        let cancelled = if self.cancelled { ", cancelled" } else { "" };
        format!(
            "{} processed, {} skipped, {} unchanged{}{}",
            self.processed, self.skipped, self.unchanged, mode, cancelled
        )
    }
}

/// Service composing the state registry, scoring engine, and storage.
pub struct ScoringService<R> {
    registry: Arc<StateRegistry>,
    engine: Arc<ScoringEngine>,
    repository: Arc<R>,
}

impl<R> ScoringService<R>
where
    R: PropertyRepository + 'static,
{
    pub fn new(repository: Arc<R>, registry: StateRegistry, policy: ScoringPolicy) -> Self {
        Self::with_engine(repository, Arc::new(registry), ScoringEngine::new(policy))
    }

    pub fn with_engine(
        repository: Arc<R>,
        registry: Arc<StateRegistry>,
        engine: ScoringEngine,
    ) -> Self {
        Self {
            registry,
            engine: Arc::new(engine),
            repository,
        }
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Score a property without persisting anything.
    pub fn score_record(&self, record: &PropertyRecord) -> Result<ScoreResult, ScoringError> {
        let input = resolve_input(record, &self.registry)?;
        Ok(self.engine.score(&input))
    }

    /// Online path: rescore one stored property and write the result back.
    pub fn rescore(&self, id: &PropertyId) -> Result<ScoreResult, ScoringServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;

        let result = self.score_record(&record)?;
        self.repository
            .write_scores(id, StoredScores::from_result(&result, Utc::now()))?;
        Ok(result)
    }

    /// Fetch a stored property for API responses.
    pub fn get(&self, id: &PropertyId) -> Result<PropertyRecord, ScoringServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
        Ok(record)
    }

    /// Rescore every property in scope. Individual failures are logged,
    /// recorded, and skipped; only a failure to list the scope aborts.
    /// Unreadable stored rows have no trusted state, so every run reports them.
    pub fn recalculate(
        &self,
        scope: &RecalculationScope,
        cancellation: &CancellationFlag,
    ) -> Result<RecalculationSummary, ScoringServiceError> {
        let started_at = Utc::now();
        let records = self.repository.list(scope)?;
        let unreadable = self.repository.unreadable_rows()?;
        let total = records.len();
        info!(
            total,
            unreadable = unreadable.len(),
            state = scope.state.as_deref().unwrap_or("all"),
            dry_run = scope.dry_run,
            "starting score recalculation"
        );

        let mut summary = RecalculationSummary {
            scope: scope.clone(),
            processed: 0,
            skipped: 0,
            unchanged: 0,
            errors: Vec::new(),
            cancelled: false,
            started_at,
            finished_at: started_at,
        };

        for row in unreadable {
            let reason = match row.line {
                Some(line) => format!("line {line}: {}", row.reason),
                None => row.reason.clone(),
            };
            let failure = RecalculationFailure {
                property_id: row.label(),
                kind: FailureKind::UnreadableRow,
                reason,
            };
            warn!(
                property_id = %failure.property_id,
                reason = %failure.reason,
                "skipping unreadable row"
            );
            summary.skipped += 1;
            summary.errors.push(failure);
        }

        for (index, record) in records.iter().enumerate() {
            if cancellation.is_cancelled() {
                warn!(
                    completed = index,
                    total, "score recalculation cancelled between properties"
                );
                summary.cancelled = true;
                break;
            }

            match self.recalculate_one(record, scope.dry_run, started_at) {
                Ok(changed) => {
                    summary.processed += 1;
                    if !changed {
                        summary.unchanged += 1;
                    }
                }
                Err(failure) => {
                    warn!(
                        property_id = %failure.property_id,
                        kind = ?failure.kind,
                        reason = %failure.reason,
                        "skipping property"
                    );
                    summary.skipped += 1;
                    summary.errors.push(failure);
                }
            }

            if (index + 1) % PROGRESS_INTERVAL == 0 {
                info!(completed = index + 1, total, "recalculation progress");
            }
        }

        summary.finished_at = Utc::now();
        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            unchanged = summary.unchanged,
            cancelled = summary.cancelled,
            "score recalculation finished"
        );
        Ok(summary)
    }

    /// Returns whether the stored scores changed.
    fn recalculate_one(
        &self,
        record: &PropertyRecord,
        dry_run: bool,
        scored_at: DateTime<Utc>,
    ) -> Result<bool, RecalculationFailure> {
        let result = self.score_record(record).map_err(|error| {
            let kind = match &error {
                ScoringError::UnknownState(_) => FailureKind::UnknownState,
                ScoringError::InvalidInput(_) => FailureKind::InvalidInput,
            };
            RecalculationFailure {
                property_id: record.id.clone(),
                kind,
                reason: error.to_string(),
            }
        })?;

        let changed = record
            .scores
            .as_ref()
            .map(|stored| !stored.matches(&result))
            .unwrap_or(true);

        debug!(
            property_id = %record.id,
            buy_hold = result.buy_hold_score,
            wholesale = result.wholesale_score,
            changed,
            "scored property"
        );

        if dry_run {
            return Ok(changed);
        }

        self.repository
            .write_scores(&record.id, StoredScores::from_result(&result, scored_at))
            .map_err(|error| RecalculationFailure {
                property_id: record.id.clone(),
                kind: FailureKind::Storage,
                reason: error.to_string(),
            })?;

        Ok(changed)
    }
}

/// Error raised by the scoring service.
#[derive(Debug, thiserror::Error)]
pub enum ScoringServiceError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
