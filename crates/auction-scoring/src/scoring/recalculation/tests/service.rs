use super::common::*;
use std::sync::Arc;

use crate::scoring::domain::PropertyId;
use crate::scoring::engine::ScoringPolicy;
use crate::scoring::recalculation::repository::{
    PropertyRepository, RecalculationScope, RepositoryError,
};
use crate::scoring::recalculation::service::{
    CancellationFlag, FailureKind, ScoringService, ScoringServiceError,
};
use crate::scoring::states::StateRegistry;
use crate::scoring::ScoringError;

#[test]
fn recalculate_skips_bad_rows_and_scores_the_rest() {
    let (service, repository) = build_service(mixed_batch());

    let summary = service
        .recalculate(&RecalculationScope::all(), &CancellationFlag::new())
        .expect("listing succeeds");

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 2);
    assert!(!summary.cancelled);
    assert_eq!(summary.headline(), "2 processed, 2 skipped, 0 unchanged");

    let kinds: Vec<_> = summary
        .errors
        .iter()
        .map(|failure| (failure.property_id.0.as_str(), failure.kind))
        .collect();
    assert!(kinds.contains(&("zz-nowhere", FailureKind::UnknownState)));
    assert!(kinds.contains(&("ar-missing", FailureKind::InvalidInput)));

    assert!(repository.stored("ar-pulaski").is_some());
    assert!(repository.stored("al-jefferson").is_some());
    assert!(repository.stored("zz-nowhere").is_none());
    assert!(repository.stored("ar-missing").is_none());
}

#[test]
fn recalculate_is_idempotent() {
    let (service, repository) = build_service(mixed_batch());
    let scope = RecalculationScope::all();

    service
        .recalculate(&scope, &CancellationFlag::new())
        .expect("first run");
    let first = repository.stored("ar-pulaski").expect("scored");

    let second_run = service
        .recalculate(&scope, &CancellationFlag::new())
        .expect("second run");
    let second = repository.stored("ar-pulaski").expect("scored");

    assert_eq!(second_run.processed, 2);
    assert_eq!(second_run.unchanged, 2);
    assert_eq!(first.buy_hold_score, second.buy_hold_score);
    assert_eq!(first.wholesale_score, second.wholesale_score);
    assert_eq!(first.effective_cost, second.effective_cost);
}

#[test]
fn dry_run_scores_without_writing() {
    let (service, repository) = build_service(mixed_batch());

    let summary = service
        .recalculate(
            &RecalculationScope::all().dry_run(true),
            &CancellationFlag::new(),
        )
        .expect("dry run");

    assert_eq!(summary.processed, 2);
    assert_eq!(repository.write_count(), 0);
    assert!(repository.stored("ar-pulaski").is_none());
    assert!(summary.headline().contains("(dry run)"));
}

#[test]
fn state_scope_limits_the_batch() {
    let (service, repository) = build_service(mixed_batch());

    let summary = service
        .recalculate(&RecalculationScope::state("al"), &CancellationFlag::new())
        .expect("scoped run");

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 0);
    assert!(repository.stored("al-jefferson").is_some());
    assert!(repository.stored("ar-pulaski").is_none());
}

#[test]
fn cancelled_runs_stop_between_properties() {
    let (service, repository) = build_service(mixed_batch());
    let cancellation = CancellationFlag::new();
    cancellation.cancel();

    let summary = service
        .recalculate(&RecalculationScope::all(), &cancellation)
        .expect("cancelled run still reports");

    assert!(summary.cancelled);
    assert_eq!(summary.processed, 0);
    assert_eq!(repository.write_count(), 0);
}

#[test]
fn storage_failures_are_recorded_per_property() {
    let inner = MemoryRepository::with_records(mixed_batch());
    let repository = Arc::new(FailingWriteRepository {
        inner: inner.clone(),
        failing: vec![PropertyId("al-jefferson".to_string())],
    });
    let service = ScoringService::new(
        repository,
        StateRegistry::standard(),
        ScoringPolicy::default(),
    );

    let summary = service
        .recalculate(&RecalculationScope::all(), &CancellationFlag::new())
        .expect("listing succeeds");

    assert_eq!(summary.processed, 1);
    assert!(summary
        .errors
        .iter()
        .any(|failure| failure.kind == FailureKind::Storage
            && failure.property_id.0 == "al-jefferson"));
    assert!(inner.stored("ar-pulaski").is_some());
}

#[test]
fn listing_failure_aborts_the_run() {
    let service = ScoringService::new(
        Arc::new(UnavailableRepository),
        StateRegistry::standard(),
        ScoringPolicy::default(),
    );

    match service.recalculate(&RecalculationScope::all(), &CancellationFlag::new()) {
        Err(ScoringServiceError::Repository(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected unavailable repository, got {other:?}"),
    }
}

#[test]
fn rescore_writes_back_a_single_property() {
    let (service, repository) = build_service(mixed_batch());

    let result = service
        .rescore(&PropertyId("ar-pulaski".to_string()))
        .expect("rescored");

    let stored = repository.stored("ar-pulaski").expect("written");
    assert!(stored.matches(&result));
    assert_eq!(repository.write_count(), 1);
}

#[test]
fn rescore_propagates_not_found_and_scoring_errors() {
    let (service, repository) = build_service(mixed_batch());

    match service.rescore(&PropertyId("missing".to_string())) {
        Err(ScoringServiceError::Repository(RepositoryError::NotFound(id))) => {
            assert_eq!(id.0, "missing")
        }
        other => panic!("expected not found, got {other:?}"),
    }

    match service.rescore(&PropertyId("zz-nowhere".to_string())) {
        Err(ScoringServiceError::Scoring(ScoringError::UnknownState(error))) => {
            assert_eq!(error.state_code, "ZZ")
        }
        other => panic!("expected unknown state, got {other:?}"),
    }
    assert_eq!(repository.write_count(), 0);
    assert!(repository
        .fetch(&PropertyId("zz-nowhere".to_string()))
        .expect("fetch")
        .expect("present")
        .scores
        .is_none());
}
