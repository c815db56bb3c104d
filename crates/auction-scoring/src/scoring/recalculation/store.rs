use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::repository::{PropertyRepository, RecalculationScope, RepositoryError, UnreadableRow};
use crate::scoring::domain::{PropertyId, PropertyRecord, StoredScores};

/// Written header, in `PropertyRow` field order.
const COLUMNS: [&str; 24] = [
    "id",
    "parcel_id",
    "state",
    "county",
    "amount",
    "acreage",
    "water_score",
    "road_access_score",
    "county_market_score",
    "geographic_score",
    "total_description_score",
    "year_sold",
    "known_market_value",
    "assessed_value",
    "buy_hold_score",
    "wholesale_score",
    "effective_cost",
    "time_penalty_factor",
    "is_market_reject",
    "is_delta_region",
    "delta_penalty_factor",
    "wholesale_spread",
    "estimated_market_value",
    "scored_at",
];

/// Property store backed by a scraper CSV export.
///
/// Every row is held in memory in file order. Rows that cannot be loaded
/// (wrong field count, no id, a repeated id) are reported through
/// [`PropertyRepository::unreadable_rows`] and written back untouched, so
/// rewriting the source file never drops data. Scores written during a run
/// are flushed with [`CsvPropertyStore::save`] or [`CsvPropertyStore::write_csv`].
#[derive(Debug, Default)]
pub struct CsvPropertyStore {
    table: Mutex<Table>,
}

#[derive(Debug, Default)]
struct Table {
    rows: Vec<StoredRow>,
    index: HashMap<PropertyId, usize>,
    /// Header of the loaded file; verbatim rows are realigned against it.
    source_headers: Option<csv::StringRecord>,
    unreadable: Vec<UnreadableRow>,
}

#[derive(Debug)]
enum StoredRow {
    Property(PropertyRecord),
    Verbatim(csv::ByteRecord),
}

impl CsvPropertyStore {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RepositoryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut table = Table {
            source_headers: Some(headers.clone()),
            ..Table::default()
        };

        let mut raw = csv::ByteRecord::new();
        while csv_reader.read_byte_record(&mut raw)? {
            table.load_row(&headers, raw.clone());
        }

        Ok(Self {
            table: Mutex::new(table),
        })
    }

    /// Later records replace earlier ones with the same id.
    pub fn from_records(records: impl IntoIterator<Item = PropertyRecord>) -> Self {
        let mut table = Table::default();
        for record in records {
            table.push(record);
        }
        Self {
            table: Mutex::new(table),
        }
    }

    /// Loaded properties in file order.
    pub fn records(&self) -> Result<Vec<PropertyRecord>, RepositoryError> {
        Ok(self.lock()?.properties().cloned().collect())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RepositoryError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), RepositoryError> {
        let table = self.lock()?;
        let mut csv_writer = csv::WriterBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_writer(writer);

        csv_writer.write_record(COLUMNS)?;
        for row in &table.rows {
            match row {
                StoredRow::Property(record) => {
                    csv_writer.serialize(PropertyRow::from_record(record))?
                }
                StoredRow::Verbatim(raw) => csv_writer.write_byte_record(&table.realign(raw))?,
            }
        }
        csv_writer.flush()?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Table>, RepositoryError> {
        self.table
            .lock()
            .map_err(|_| RepositoryError::Unavailable("property store lock poisoned".to_string()))
    }
}

impl Table {
    fn load_row(&mut self, headers: &csv::StringRecord, raw: csv::ByteRecord) {
        let line = raw.position().map(csv::Position::line);
        match parse_row(headers, &raw) {
            Ok(row) if row.id.is_empty() => {
                self.keep_verbatim(raw, line, None, "row has no id".to_string())
            }
            Ok(row) => {
                let id = PropertyId(row.id.clone());
                if self.index.contains_key(&id) {
                    let reason = format!("duplicate id {id}, only its first row is scored");
                    self.keep_verbatim(raw, line, Some(row.id), reason);
                } else {
                    self.push(row.into_record());
                }
            }
            Err(reason) => {
                let id = raw_id(headers, &raw);
                self.keep_verbatim(raw, line, id, reason);
            }
        }
    }

    fn push(&mut self, record: PropertyRecord) {
        if let Some(slot) = self
            .index
            .get(&record.id)
            .and_then(|&position| self.rows.get_mut(position))
        {
            *slot = StoredRow::Property(record);
            return;
        }
        self.index.insert(record.id.clone(), self.rows.len());
        self.rows.push(StoredRow::Property(record));
    }

    fn keep_verbatim(
        &mut self,
        raw: csv::ByteRecord,
        line: Option<u64>,
        id: Option<String>,
        reason: String,
    ) {
        self.unreadable.push(UnreadableRow { line, id, reason });
        self.rows.push(StoredRow::Verbatim(raw));
    }

    fn properties(&self) -> impl Iterator<Item = &PropertyRecord> {
        self.rows.iter().filter_map(|row| match row {
            StoredRow::Property(record) => Some(record),
            StoredRow::Verbatim(_) => None,
        })
    }

    fn get(&self, id: &PropertyId) -> Option<&PropertyRecord> {
        match self.rows.get(*self.index.get(id)?)? {
            StoredRow::Property(record) => Some(record),
            StoredRow::Verbatim(_) => None,
        }
    }

    fn get_mut(&mut self, id: &PropertyId) -> Option<&mut PropertyRecord> {
        match self.rows.get_mut(*self.index.get(id)?)? {
            StoredRow::Property(record) => Some(record),
            StoredRow::Verbatim(_) => None,
        }
    }

    /// Maps a verbatim row onto the written columns by header name. Cells
    /// past the source header are appended so nothing is lost.
    fn realign(&self, raw: &csv::ByteRecord) -> csv::ByteRecord {
        let Some(headers) = &self.source_headers else {
            return raw.clone();
        };

        let mut aligned = csv::ByteRecord::new();
        for column in COLUMNS {
            let cell = headers
                .iter()
                .position(|header| header == column)
                .and_then(|position| raw.get(position))
                .unwrap_or_default();
            aligned.push_field(cell);
        }
        for cell in raw.iter().skip(headers.len()) {
            aligned.push_field(cell);
        }
        aligned
    }
}

fn parse_row(headers: &csv::StringRecord, raw: &csv::ByteRecord) -> Result<PropertyRow, String> {
    if raw.len() != headers.len() {
        return Err(format!(
            "row has {} fields but the header has {}",
            raw.len(),
            headers.len()
        ));
    }
    let record = csv::StringRecord::from_byte_record(raw.clone())
        .map_err(|error| format!("row is not valid UTF-8: {error}"))?;
    record
        .deserialize(Some(headers))
        .map_err(|error| error.to_string())
}

fn raw_id(headers: &csv::StringRecord, raw: &csv::ByteRecord) -> Option<String> {
    let position = headers.iter().position(|header| header == "id")?;
    let id = String::from_utf8_lossy(raw.get(position)?).trim().to_string();
    (!id.is_empty()).then_some(id)
}

impl PropertyRepository for CsvPropertyStore {
    fn list(&self, scope: &RecalculationScope) -> Result<Vec<PropertyRecord>, RepositoryError> {
        Ok(self
            .lock()?
            .properties()
            .filter(|record| scope.includes(record))
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &PropertyId) -> Result<Option<PropertyRecord>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn write_scores(&self, id: &PropertyId, scores: StoredScores) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let record = guard
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
        record.scores = Some(scores);
        Ok(())
    }

    fn unreadable_rows(&self) -> Result<Vec<UnreadableRow>, RepositoryError> {
        Ok(self.lock()?.unreadable.clone())
    }
}

/// Flat CSV shape shared by scraper exports and scored output. Unparseable
/// numeric cells read as empty so a single bad cell surfaces as a per-row
/// scoring failure instead of an unreadable row.
#[derive(Debug, Deserialize, Serialize)]
struct PropertyRow {
    id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    parcel_id: Option<String>,
    state: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    county: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    amount: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    acreage: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    water_score: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    road_access_score: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    county_market_score: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    geographic_score: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    total_description_score: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    year_sold: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    known_market_value: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    assessed_value: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    buy_hold_score: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    wholesale_score: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    effective_cost: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    time_penalty_factor: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    is_market_reject: Option<bool>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    is_delta_region: Option<bool>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    delta_penalty_factor: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    wholesale_spread: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    estimated_market_value: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    scored_at: Option<DateTime<Utc>>,
}

impl PropertyRow {
    fn into_record(self) -> PropertyRecord {
        let scores = self.stored_scores();
        PropertyRecord {
            id: PropertyId(self.id),
            parcel_id: self.parcel_id,
            state_code: self.state,
            county: self.county,
            amount: self.amount,
            acreage: self.acreage,
            water_score: self.water_score,
            road_access_score: self.road_access_score,
            county_market_score: self.county_market_score,
            geographic_score: self.geographic_score,
            total_description_score: self.total_description_score,
            year_sold: self.year_sold,
            known_market_value: self.known_market_value,
            assessed_value: self.assessed_value,
            scores,
        }
    }

    /// Previously written scores, only when every required column is present.
    fn stored_scores(&self) -> Option<StoredScores> {
        Some(StoredScores {
            buy_hold_score: self.buy_hold_score?,
            wholesale_score: self.wholesale_score?,
            effective_cost: self.effective_cost?,
            time_penalty_factor: self.time_penalty_factor?,
            is_market_reject: self.is_market_reject?,
            is_delta_region: self.is_delta_region?,
            delta_penalty_factor: self.delta_penalty_factor?,
            wholesale_spread: self.wholesale_spread,
            estimated_market_value: self.estimated_market_value,
            scored_at: self.scored_at?,
        })
    }

    fn from_record(record: &PropertyRecord) -> Self {
        let scores = record.scores.as_ref();
        Self {
            id: record.id.0.clone(),
            parcel_id: record.parcel_id.clone(),
            state: record.state_code.clone(),
            county: record.county.clone(),
            amount: record.amount,
            acreage: record.acreage,
            water_score: record.water_score,
            road_access_score: record.road_access_score,
            county_market_score: record.county_market_score,
            geographic_score: record.geographic_score,
            total_description_score: record.total_description_score,
            year_sold: record.year_sold.clone(),
            known_market_value: record.known_market_value,
            assessed_value: record.assessed_value,
            buy_hold_score: scores.map(|s| s.buy_hold_score),
            wholesale_score: scores.map(|s| s.wholesale_score),
            effective_cost: scores.map(|s| s.effective_cost),
            time_penalty_factor: scores.map(|s| s.time_penalty_factor),
            is_market_reject: scores.map(|s| s.is_market_reject),
            is_delta_region: scores.map(|s| s.is_delta_region),
            delta_penalty_factor: scores.map(|s| s.delta_penalty_factor),
            wholesale_spread: scores.and_then(|s| s.wholesale_spread),
            estimated_market_value: scores.and_then(|s| s.estimated_market_value),
            scored_at: scores.map(|s| s.scored_at),
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
