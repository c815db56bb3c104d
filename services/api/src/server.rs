use crate::cli::ServeArgs;
use crate::infra::{sample_properties, AppState, InMemoryPropertyRepository};
use crate::routes::with_scoring_routes;
use auction_scoring::config::AppConfig;
use auction_scoring::error::AppError;
use auction_scoring::scoring::{CsvPropertyStore, ScoringService, StateRegistry};
use auction_scoring::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let registry = StateRegistry::standard();
    let policy = config.scoring.clone();
    let router = match args.data.take() {
        Some(path) => {
            let store = Arc::new(CsvPropertyStore::from_path(&path)?);
            info!(path = %path.display(), "serving properties from CSV");
            with_scoring_routes(Arc::new(ScoringService::new(store, registry, policy)))
        }
        None => {
            let repository = Arc::new(InMemoryPropertyRepository::seeded(sample_properties()));
            info!("serving seeded sample properties");
            with_scoring_routes(Arc::new(ScoringService::new(
                repository, registry, policy,
            )))
        }
    };

    let app = router
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "auction scoring service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
