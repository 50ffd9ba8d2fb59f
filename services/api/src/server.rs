use crate::cli::ServeArgs;
use crate::infra::{build_feature_service, AppState};
use crate::routes::with_feature_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use migration_features::config::AppConfig;
use migration_features::error::AppError;
use migration_features::telemetry;
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
    if let Some(rules) = args.rules.take() {
        config.rules.path = rules;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let feature_service = Arc::new(build_feature_service(&config)?);

    let app = with_feature_routes(feature_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        migration_api = %config.migration_api.base_url,
        "migration feature gate ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
