use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use crate::error::AppError;

use super::decision::DecisionError;
use super::lookup::{AccountLookup, LookupError};
use super::service::{FeatureCheckRequest, FeatureDecisionService, ServiceError};

pub const CUSTOMER_ID_HEADER: &str = "customerid";

/// Router builder exposing the feature check and account listing endpoints.
pub fn feature_router<L>(service: Arc<FeatureDecisionService<L>>) -> Router
where
    L: AccountLookup + 'static,
{
    Router::new()
        .route("/api/features/check", post(check_handler::<L>))
        .route(
            "/api/features/customers/:customer_id/accounts",
            post(accounts_handler::<L>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AccountsQuery {
    #[serde(rename = "withFeatures", default)]
    pub(crate) with_features: bool,
}

pub(crate) async fn check_handler<L>(
    State(service): State<Arc<FeatureDecisionService<L>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    L: AccountLookup + 'static,
{
    let customer_id = match headers
        .get(CUSTOMER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
    {
        Some(value) => value.to_string(),
        None => return bad_request("customerId header is required"),
    };
    let request = match serde_json::from_slice::<FeatureCheckRequest>(&body) {
        Ok(request) => request,
        Err(err) => return bad_request(&format!("invalid request body: {err}")),
    };

    match service.check_features(&customer_id, &request.features).await {
        Ok(response) => (StatusCode::OK, axum::Json(response)).into_response(),
        Err(error) => error_response(&customer_id, error),
    }
}

pub(crate) async fn accounts_handler<L>(
    State(service): State<Arc<FeatureDecisionService<L>>>,
    Path(customer_id): Path<String>,
    Query(query): Query<AccountsQuery>,
    body: Bytes,
) -> Response
where
    L: AccountLookup + 'static,
{
    let request = if query.with_features && !body.iter().all(u8::is_ascii_whitespace) {
        match serde_json::from_slice::<FeatureCheckRequest>(&body) {
            Ok(request) => Some(request),
            Err(err) => return bad_request(&format!("invalid request body: {err}")),
        }
    } else {
        None
    };

    let features = request.as_ref().map(|request| request.features.as_slice());
    match service
        .accounts_with_features(&customer_id, query.with_features, features)
        .await
    {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(&customer_id, error),
    }
}

fn bad_request(message: &str) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

fn error_response(customer_id: &str, error: ServiceError) -> Response {
    match &error {
        ServiceError::Decision(DecisionError::RuleEvaluationFault { rule, detail }) => {
            error!(customer_id, rule = %rule, detail = %detail, "decision table fault");
        }
        ServiceError::Lookup(LookupError::NoAccounts { .. }) => {
            warn!(customer_id, "no migration data for customer");
        }
        ServiceError::Lookup(_) | ServiceError::Decision(_) => {}
    }

    AppError::from(error).into_response()
}
