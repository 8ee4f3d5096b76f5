use crate::cli::ServeArgs;
use crate::infra::{seed_demo_data, AppState, LoggingNotifier};
use crate::routes::with_enrollment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use driveschool::config::AppConfig;
use driveschool::error::AppError;
use driveschool::telemetry;
use driveschool::workflows::enrollment::{
    EnrollmentService, MemoryStore, TextDocumentRenderer,
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

    let store = Arc::new(MemoryStore::new());
    let seed = seed_demo_data(store.as_ref()).map_err(driveschool::workflows::enrollment::EnrollmentError::from)?;
    info!(
        branches = seed.branches.len(),
        courses = seed.courses.len(),
        admin = %seed.super_admin.username,
        "seeded enrollment catalogue"
    );

    let service = Arc::new(EnrollmentService::new(
        store,
        Arc::new(LoggingNotifier),
        Arc::new(TextDocumentRenderer::default()),
        config.school.clone(),
    ));

    let app = with_enrollment_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "enrollment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
