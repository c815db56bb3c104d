use auction_scoring::scoring::{
    PropertyId, PropertyRecord, PropertyRepository, RecalculationScope, RepositoryError,
    StoredScores,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local property table used when the server starts without a CSV.
#[derive(Default, Clone)]
pub(crate) struct InMemoryPropertyRepository {
    records: Arc<Mutex<HashMap<PropertyId, PropertyRecord>>>,
}

impl InMemoryPropertyRepository {
    pub(crate) fn seeded(records: impl IntoIterator<Item = PropertyRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<PropertyId, PropertyRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl PropertyRepository for InMemoryPropertyRepository {
    fn list(&self, scope: &RecalculationScope) -> Result<Vec<PropertyRecord>, RepositoryError> {
        let guard = self.lock()?;
        let mut records: Vec<_> = guard
            .values()
            .filter(|record| scope.includes(record))
            .cloned()
            .collect();
        records.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(records)
    }

    fn fetch(&self, id: &PropertyId) -> Result<Option<PropertyRecord>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn write_scores(&self, id: &PropertyId, scores: StoredScores) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        match guard.get_mut(id) {
            Some(record) => {
                record.scores = Some(scores);
                Ok(())
            }
            None => Err(RepositoryError::NotFound(id.clone())),
        }
    }
}

/// A handful of scraped listings covering each sale regime and risk flag.
pub(crate) fn sample_properties() -> Vec<PropertyRecord> {
    vec![
        PropertyRecord {
            id: PropertyId("ar-pulaski-0142".to_string()),
            parcel_id: Some("43L-0142-00".to_string()),
            state_code: "AR".to_string(),
            county: Some("Pulaski".to_string()),
            amount: Some(1_250.0),
            acreage: Some(2.4),
            water_score: Some(35.0),
            road_access_score: Some(80.0),
            county_market_score: Some(72.0),
            geographic_score: Some(60.0),
            total_description_score: Some(55.0),
            year_sold: Some("2021".to_string()),
            assessed_value: Some(2_600.0),
            ..PropertyRecord::default()
        },
        PropertyRecord {
            id: PropertyId("ar-phillips-0077".to_string()),
            parcel_id: Some("001-07710-000".to_string()),
            state_code: "AR".to_string(),
            county: Some("Phillips".to_string()),
            amount: Some(600.0),
            acreage: Some(5.0),
            water_score: Some(50.0),
            road_access_score: Some(40.0),
            county_market_score: Some(20.0),
            year_sold: Some("2020".to_string()),
            ..PropertyRecord::default()
        },
        PropertyRecord {
            id: PropertyId("ar-saline-1944".to_string()),
            parcel_id: Some("840-11200-000".to_string()),
            state_code: "AR".to_string(),
            county: Some("Saline".to_string()),
            amount: Some(300.0),
            acreage: Some(0.3),
            road_access_score: Some(65.0),
            year_sold: Some("1944".to_string()),
            ..PropertyRecord::default()
        },
        PropertyRecord {
            id: PropertyId("al-jefferson-3310".to_string()),
            parcel_id: Some("22-00-33-1-000-010".to_string()),
            state_code: "AL".to_string(),
            county: Some("Jefferson".to_string()),
            amount: Some(450.0),
            acreage: Some(1.1),
            water_score: Some(10.0),
            road_access_score: Some(70.0),
            county_market_score: Some(65.0),
            geographic_score: Some(55.0),
            total_description_score: Some(40.0),
            year_sold: Some("2023".to_string()),
            assessed_value: Some(900.0),
            ..PropertyRecord::default()
        },
    ]
}
