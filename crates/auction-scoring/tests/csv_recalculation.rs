use std::io::Cursor;
use std::sync::Arc;

use auction_scoring::scoring::{
    CancellationFlag, CsvPropertyStore, FailureKind, PropertyId, PropertyRepository,
    RecalculationScope, ScoreBoard, ScoringPolicy, ScoringService, StateRegistry,
};

const EXPORT: &str = "\
id,parcel_id,state,county,amount,acreage,water_score,road_access_score,county_market_score,geographic_score,total_description_score,year_sold,known_market_value,assessed_value
ar-1,10-001,AR,Pulaski,850,2.5,40,70,65,55,50,2021,,2600
ar-2,10-002,AR,Phillips,600,5,50,40,20,,,2020,,
ar-3,10-003,AR,Saline,300,0.3,,65,,,,1944,,
al-1,20-001,AL,Jefferson,450,1.1,10,70,65,55,40,2023,,900
ga-1,30-001,GA,Fulton,700,1,50,50,50,50,50,2022,,
ar-4,10-004,AR,Garland,,1.5,60,60,60,60,60,2022,,
";

fn service() -> (ScoringService<CsvPropertyStore>, Arc<CsvPropertyStore>) {
    let store = Arc::new(CsvPropertyStore::from_reader(Cursor::new(EXPORT)).expect("parse export"));
    let service = ScoringService::new(
        store.clone(),
        StateRegistry::standard(),
        ScoringPolicy::default(),
    );
    (service, store)
}

#[test]
fn batch_scores_csv_export_and_skips_bad_rows() {
    let (service, store) = service();

    let summary = service
        .recalculate(&RecalculationScope::all(), &CancellationFlag::new())
        .expect("run completes");

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.skipped, 2);
    let unknown = summary
        .errors
        .iter()
        .find(|failure| failure.property_id.0 == "ga-1")
        .expect("georgia row reported");
    assert_eq!(unknown.kind, FailureKind::UnknownState);
    let missing = summary
        .errors
        .iter()
        .find(|failure| failure.property_id.0 == "ar-4")
        .expect("missing amount reported");
    assert_eq!(missing.kind, FailureKind::InvalidInput);

    let reject = store
        .fetch(&PropertyId("ar-3".to_string()))
        .expect("fetch")
        .and_then(|record| record.scores)
        .expect("scored");
    assert!(reject.is_market_reject);
    assert_eq!(reject.buy_hold_score, 0.0);

    let delta = store
        .fetch(&PropertyId("ar-2".to_string()))
        .expect("fetch")
        .and_then(|record| record.scores)
        .expect("scored");
    assert!(delta.is_delta_region);
    assert_eq!(delta.delta_penalty_factor, 0.5);
}

#[test]
fn scored_csv_reloads_and_second_run_is_unchanged() {
    let (service, store) = service();
    service
        .recalculate(&RecalculationScope::all(), &CancellationFlag::new())
        .expect("first run");

    let mut buffer = Vec::new();
    store.write_csv(&mut buffer).expect("serialize");
    let reloaded = Arc::new(CsvPropertyStore::from_reader(Cursor::new(buffer)).expect("reload"));
    let second = ScoringService::new(
        reloaded.clone(),
        StateRegistry::standard(),
        ScoringPolicy::default(),
    )
    .recalculate(&RecalculationScope::all(), &CancellationFlag::new())
    .expect("second run");

    assert_eq!(second.processed, 4);
    assert_eq!(second.unchanged, 4);

    let board = ScoreBoard::from_records(&reloaded.records().expect("records"), 3);
    let states: Vec<_> = board
        .states
        .iter()
        .map(|summary| (summary.state_code.as_str(), summary.count))
        .collect();
    assert_eq!(states, vec![("AL", 1), ("AR", 3)]);
    assert_eq!(board.top_buy_hold.len(), 3);
    assert!(board.top_buy_hold[0].buy_hold_score >= board.top_buy_hold[1].buy_hold_score);
}

#[test]
fn unreadable_rows_are_skipped_and_kept_on_rewrite() {
    let export = "\
id,state,county,amount,acreage,year_sold
a,AR,Pulaski,850,2,2022
b,AR,St. Francis, AR,700,1,2022
,AR,Saline,400,1,2022
a,AR,Pulaski,900,2,2022
c,AR,Lee,650,3,2021
";
    let store = Arc::new(CsvPropertyStore::from_reader(Cursor::new(export)).expect("parse export"));
    let service = ScoringService::new(
        store.clone(),
        StateRegistry::standard(),
        ScoringPolicy::default(),
    );

    let summary = service
        .recalculate(&RecalculationScope::all(), &CancellationFlag::new())
        .expect("run completes");

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 3);
    assert!(summary
        .errors
        .iter()
        .all(|failure| failure.kind == FailureKind::UnreadableRow));
    let labels: Vec<_> = summary
        .errors
        .iter()
        .map(|failure| failure.property_id.0.as_str())
        .collect();
    assert_eq!(labels, vec!["b", "line 4", "a"]);
    assert!(summary.errors[0].reason.starts_with("line 3:"));

    let mut buffer = Vec::new();
    store.write_csv(&mut buffer).expect("serialize");
    let written = String::from_utf8(buffer).expect("utf8");
    assert_eq!(written.lines().count(), 6);
    assert!(written.contains("St. Francis"));
    assert!(written.contains("Saline"));
    assert!(written
        .lines()
        .any(|line| line.starts_with("a,") && line.contains(",900,")));
}
