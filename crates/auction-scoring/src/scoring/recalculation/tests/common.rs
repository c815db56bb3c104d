use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::scoring::domain::{PropertyId, PropertyRecord, StoredScores};
use crate::scoring::engine::ScoringPolicy;
use crate::scoring::recalculation::repository::{
    PropertyRepository, RecalculationScope, RepositoryError,
};
use crate::scoring::recalculation::service::ScoringService;
use crate::scoring::states::StateRegistry;

pub(super) fn property(id: &str, state: &str, county: &str, amount: f64) -> PropertyRecord {
    PropertyRecord {
        id: PropertyId(id.to_string()),
        parcel_id: Some(format!("{id}-parcel")),
        state_code: state.to_string(),
        county: Some(county.to_string()),
        amount: Some(amount),
        acreage: Some(2.5),
        water_score: Some(60.0),
        road_access_score: Some(55.0),
        county_market_score: Some(50.0),
        geographic_score: Some(45.0),
        total_description_score: Some(40.0),
        year_sold: Some("2022".to_string()),
        known_market_value: None,
        assessed_value: Some(1_800.0),
        scores: None,
    }
}

/// Mixed batch: two scorable rows, one unknown state, one missing amount.
pub(super) fn mixed_batch() -> Vec<PropertyRecord> {
    vec![
        property("ar-pulaski", "AR", "Pulaski", 850.0),
        property("al-jefferson", "AL", "Jefferson", 500.0),
        property("zz-nowhere", "ZZ", "Nowhere", 400.0),
        PropertyRecord {
            amount: None,
            ..property("ar-missing", "AR", "Saline", 0.0)
        },
    ]
}

pub(super) fn build_service(
    records: Vec<PropertyRecord>,
) -> (ScoringService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::with_records(records));
    let service = ScoringService::new(
        repository.clone(),
        StateRegistry::standard(),
        ScoringPolicy::default(),
    );
    (service, repository)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<BTreeMap<PropertyId, PropertyRecord>>>,
    pub(super) writes: Arc<Mutex<usize>>,
}

impl MemoryRepository {
    pub(super) fn with_records(records: Vec<PropertyRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            records: Arc::new(Mutex::new(records)),
            writes: Arc::default(),
        }
    }

    pub(super) fn stored(&self, id: &str) -> Option<StoredScores> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(&PropertyId(id.to_string()))
            .and_then(|record| record.scores.clone())
    }

    pub(super) fn write_count(&self) -> usize {
        *self.writes.lock().expect("write counter poisoned")
    }
}

impl PropertyRepository for MemoryRepository {
    fn list(&self, scope: &RecalculationScope) -> Result<Vec<PropertyRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| scope.includes(record))
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &PropertyId) -> Result<Option<PropertyRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn write_scores(&self, id: &PropertyId, scores: StoredScores) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
        record.scores = Some(scores);
        *self.writes.lock().expect("write counter poisoned") += 1;
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl PropertyRepository for UnavailableRepository {
    fn list(&self, _scope: &RecalculationScope) -> Result<Vec<PropertyRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &PropertyId) -> Result<Option<PropertyRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn write_scores(&self, _id: &PropertyId, _scores: StoredScores) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Reads succeed but writes for the listed ids fail.
pub(super) struct FailingWriteRepository {
    pub(super) inner: MemoryRepository,
    pub(super) failing: Vec<PropertyId>,
}

impl PropertyRepository for FailingWriteRepository {
    fn list(&self, scope: &RecalculationScope) -> Result<Vec<PropertyRecord>, RepositoryError> {
        self.inner.list(scope)
    }

    fn fetch(&self, id: &PropertyId) -> Result<Option<PropertyRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn write_scores(&self, id: &PropertyId, scores: StoredScores) -> Result<(), RepositoryError> {
        if self.failing.contains(id) {
            return Err(RepositoryError::Unavailable("row locked".to_string()));
        }
        self.inner.write_scores(id, scores)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
