use metrics_exporter_prometheus::PrometheusHandle;
use migration_features::config::AppConfig;
use migration_features::error::AppError;
use migration_features::features::{
    DecisionEngine, FeatureDecisionService, HttpAccountLookup, RuleTableLoader,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads the decision table and wires the upstream lookup. A missing or
/// malformed table stops startup.
pub(crate) fn build_feature_service(
    config: &AppConfig,
) -> Result<FeatureDecisionService<HttpAccountLookup>, AppError> {
    let rules = RuleTableLoader::from_path(&config.rules.path)?;
    info!(
        path = %config.rules.path.display(),
        rules = rules.len(),
        "decision table ready"
    );

    let lookup = HttpAccountLookup::new(&config.migration_api)?;
    Ok(FeatureDecisionService::new(
        Arc::new(lookup),
        DecisionEngine::new(rules),
    ))
}
