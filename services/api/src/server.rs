use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryContactDirectory, InMemoryVerificationRepository, PassthroughUrlSigner,
};
use crate::routes::with_verification_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use verimark::config::AppConfig;
use verimark::error::AppError;
use verimark::telemetry;
use verimark::workflows::verification::{DocumentRegistry, VerificationService};
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

    let repository = Arc::new(InMemoryVerificationRepository::default());
    let contacts = Arc::new(InMemoryContactDirectory::verified_by_default());
    let signer = Arc::new(PassthroughUrlSigner);
    let verification_service = Arc::new(VerificationService::new(
        repository,
        contacts,
        signer,
        DocumentRegistry::standard(),
    ));

    let app = with_verification_routes(verification_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "verification console ready");

    axum::serve(listener, app).await?;
    Ok(())
}
