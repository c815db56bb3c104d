use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::repository::{PropertyRepository, RecalculationScope, RepositoryError};
use super::service::{CancellationFlag, ScoringService, ScoringServiceError};
use crate::scoring::domain::{PropertyId, PropertyRecord};

/// Router builder exposing scoring triggers and lookups.
pub fn scoring_router<R>(service: Arc<ScoringService<R>>) -> Router
where
    R: PropertyRepository + 'static,
{
    Router::new()
        .route("/api/v1/states", get(states_handler::<R>))
        .route("/api/v1/scoring/score", post(score_handler::<R>))
        .route(
            "/api/v1/scoring/recalculate",
            post(recalculate_handler::<R>),
        )
        .route("/api/v1/properties/:property_id", get(property_handler::<R>))
        .route(
            "/api/v1/properties/:property_id/rescore",
            post(rescore_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecalculateRequest {
    #[serde(default)]
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) dry_run: bool,
}

/// Cancels the run when the request future is dropped (client gone or the
/// server timed the request out) so the blocking loop stops early.
struct CancelOnDrop(CancellationFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

pub(crate) async fn states_handler<R>(State(service): State<Arc<ScoringService<R>>>) -> Response
where
    R: PropertyRepository + 'static,
{
    let states: Vec<_> = service.registry().iter().cloned().collect();
    (StatusCode::OK, Json(states)).into_response()
}

pub(crate) async fn score_handler<R>(
    State(service): State<Arc<ScoringService<R>>>,
    Json(record): Json<PropertyRecord>,
) -> Response
where
    R: PropertyRepository + 'static,
{
    match service.score_record(&record) {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => error_response(StatusCode::UNPROCESSABLE_ENTITY, error.to_string()),
    }
}

pub(crate) async fn recalculate_handler<R>(
    State(service): State<Arc<ScoringService<R>>>,
    Json(request): Json<RecalculateRequest>,
) -> Response
where
    R: PropertyRepository + 'static,
{
    let scope = RecalculationScope {
        state: request.state,
        dry_run: request.dry_run,
    };
    let cancellation = CancellationFlag::new();
    let _guard = CancelOnDrop(cancellation.clone());

    let worker = tokio::task::spawn_blocking(move || service.recalculate(&scope, &cancellation));
    match worker.await {
        Ok(Ok(summary)) => (StatusCode::OK, Json(summary)).into_response(),
        Ok(Err(error)) => service_error_response(error),
        Err(join_error) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("recalculation worker failed: {join_error}"),
        ),
    }
}

pub(crate) async fn property_handler<R>(
    State(service): State<Arc<ScoringService<R>>>,
    Path(property_id): Path<String>,
) -> Response
where
    R: PropertyRepository + 'static,
{
    match service.get(&PropertyId(property_id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn rescore_handler<R>(
    State(service): State<Arc<ScoringService<R>>>,
    Path(property_id): Path<String>,
) -> Response
where
    R: PropertyRepository + 'static,
{
    match service.rescore(&PropertyId(property_id)) {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => service_error_response(error),
    }
}

fn service_error_response(error: ScoringServiceError) -> Response {
    let status = match &error {
        ScoringServiceError::Repository(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
        ScoringServiceError::Scoring(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ScoringServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error.to_string())
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
