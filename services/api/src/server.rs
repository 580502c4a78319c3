use crate::cli::ServeArgs;
use crate::infra::{
    seed_candidates, seed_positions, AppState, InMemoryCandidateStore, InMemoryPositionDirectory,
};
use crate::routes::with_pipeline_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use recruit_pipeline::config::AppConfig;
use recruit_pipeline::error::AppError;
use recruit_pipeline::telemetry;
use recruit_pipeline::workflows::pipeline::{
    HttpCandidateStore, InMemoryTransitionLog, PipelineService, PositionDirectory,
    SelectionContext,
};
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

    let log = Arc::new(InMemoryTransitionLog::default());
    let selection = SelectionContext::new();

    let router = match HttpCandidateStore::from_config(&config.store)? {
        Some(store) => {
            info!(
                base_url = config.store.base_url.as_deref().unwrap_or_default(),
                timeout_secs = config.store.timeout.as_secs(),
                "using remote candidate store"
            );
            let store = Arc::new(store);
            let directory: Arc<dyn PositionDirectory> = store.clone();
            let service = PipelineService::new(store, log, directory, selection);
            with_pipeline_routes(Arc::new(service))
        }
        None => {
            let roster = seed_candidates(Utc::now());
            info!(
                candidates = roster.len(),
                "using seeded in-memory candidate store"
            );
            let store = Arc::new(InMemoryCandidateStore::seeded(roster));
            let directory = Arc::new(InMemoryPositionDirectory::new(seed_positions()));
            let service = PipelineService::new(store, log, directory, selection);
            with_pipeline_routes(Arc::new(service))
        }
    };

    let app = router.layer(Extension(app_state)).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "candidate pipeline service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
