use serde::{Deserialize, Serialize};

use crate::scoring::domain::{PropertyId, PropertyRecord, StoredScores};
use crate::scoring::states::normalize_code;

/// Which stored properties a recalculation run touches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalculationScope {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

impl RecalculationScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn state(state_code: impl Into<String>) -> Self {
        Self {
            state: Some(state_code.into()),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn includes(&self, record: &PropertyRecord) -> bool {
        match &self.state {
            Some(code) => normalize_code(code) == normalize_code(&record.state_code),
            None => true,
        }
    }
}

/// Storage abstraction so the driver can run against any persistence layer.
///
/// Each `write_scores` call is an independent row update; implementations own
/// their own locking and transaction boundaries.
pub trait PropertyRepository: Send + Sync {
    fn list(&self, scope: &RecalculationScope) -> Result<Vec<PropertyRecord>, RepositoryError>;
    fn fetch(&self, id: &PropertyId) -> Result<Option<PropertyRecord>, RepositoryError>;
    fn write_scores(&self, id: &PropertyId, scores: StoredScores) -> Result<(), RepositoryError>;

    /// Stored rows that could not be read as properties. They are never
    /// scored, but a run reports each one as skipped.
    fn unreadable_rows(&self) -> Result<Vec<UnreadableRow>, RepositoryError> {
        Ok(Vec::new())
    }
}

/// A stored row kept as-is because it could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadableRow {
    /// 1-based line in the source file, header included.
    pub line: Option<u64>,
    /// The raw `id` cell, when the row has a non-empty one.
    pub id: Option<String>,
    pub reason: String,
}

impl UnreadableRow {
    /// Identifier used in run summaries: the raw id, else the line.
    pub fn label(&self) -> PropertyId {
        match (&self.id, self.line) {
            (Some(id), _) => PropertyId(id.clone()),
            (None, Some(line)) => PropertyId(format!("line {line}")),
            (None, None) => PropertyId("unknown row".to_string()),
        }
    }
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("property {0} not found")]
    NotFound(PropertyId),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("invalid property CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to access property file: {0}")]
    Io(#[from] std::io::Error),
}
