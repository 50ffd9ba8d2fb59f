use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use migration_features::features::{feature_router, AccountLookup, FeatureDecisionService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_feature_routes<L>(service: Arc<FeatureDecisionService<L>>) -> axum::Router
where
    L: AccountLookup + 'static,
{
    feature_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use migration_features::features::{
        AccountRecord, AccountType, DecisionEngine, LookupError, MigrationStatus, MigrationWave,
        RuleTable,
    };
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    struct FixedLookup;

    #[async_trait]
    impl AccountLookup for FixedLookup {
        async fn fetch_accounts(
            &self,
            _customer_id: &str,
        ) -> Result<Vec<AccountRecord>, LookupError> {
            Ok(vec![AccountRecord::new(
                "CHK-1",
                AccountType::Checking,
                MigrationStatus::InProgress,
                MigrationWave::new("W1"),
            )])
        }
    }

    fn app(ready: bool) -> axum::Router {
        let service = Arc::new(FeatureDecisionService::new(
            Arc::new(FixedLookup),
            DecisionEngine::new(RuleTable::default()),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_feature_routes(service).layer(Extension(state))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app(false)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_follows_flag() {
        let response = app(false)
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app(true)
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ready");
    }

    #[tokio::test]
    async fn feature_routes_are_mounted() {
        let response = app(true)
            .oneshot(
                Request::post("/api/features/check")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header("customerId", "CUST-1")
                    .body(Body::from(r#"{"features":["loginV2"]}"#))
                    .unwrap(),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["features"][0]["enabled"], true);
        assert_eq!(
            payload["features"][0]["reason"],
            "Default: Feature enabled (not specified in rules)"
        );
    }

    #[tokio::test]
    async fn metrics_are_plain_text() {
        let response = app(true)
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }
}
