use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::decision::{AccountsView, DecisionEngine, DecisionError};
use super::domain::FeatureVerdict;
use super::lookup::{AccountLookup, LookupError};

/// Body of a feature check request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCheckRequest {
    #[serde(default)]
    pub features: Vec<String>,
}

/// Verdicts for one customer, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCheckResponse {
    pub customer_id: String,
    pub features: Vec<FeatureVerdict>,
}

/// Service composing the account lookup with the decision engine.
pub struct FeatureDecisionService<L> {
    lookup: Arc<L>,
    engine: Arc<DecisionEngine>,
}

impl<L> FeatureDecisionService<L>
where
    L: AccountLookup + 'static,
{
    pub fn new(lookup: Arc<L>, engine: DecisionEngine) -> Self {
        Self {
            lookup,
            engine: Arc::new(engine),
        }
    }

    /// Decide every requested feature for the customer.
    pub async fn check_features(
        &self,
        customer_id: &str,
        features: &[String],
    ) -> Result<FeatureCheckResponse, ServiceError> {
        let customer_id = require_customer_id(customer_id)?;
        if features.is_empty() {
            return Err(DecisionError::InvalidInput(
                "features list cannot be empty".to_string(),
            )
            .into());
        }
        info!(customer_id, features = features.len(), "checking features");

        let accounts = self.lookup.fetch_accounts(customer_id).await?;
        debug!(customer_id, accounts = accounts.len(), "accounts retrieved");

        let verdicts = self.engine.decide(customer_id, &accounts, features)?;
        info!(customer_id, features = verdicts.len(), "feature check completed");

        Ok(FeatureCheckResponse {
            customer_id: customer_id.to_string(),
            features: verdicts,
        })
    }

    /// List the customer's accounts, optionally annotated with verdicts.
    pub async fn accounts_with_features(
        &self,
        customer_id: &str,
        with_features: bool,
        features: Option<&[String]>,
    ) -> Result<AccountsView, ServiceError> {
        let customer_id = require_customer_id(customer_id)?;
        info!(customer_id, with_features, "listing accounts");

        let accounts = self.lookup.fetch_accounts(customer_id).await?;
        let requested = if with_features { features } else { None };
        let view = self.engine.accounts_view(customer_id, accounts, requested)?;

        info!(
            customer_id,
            status = %view.customer_status,
            evaluated = view.feature_verdicts.is_some(),
            "accounts listing completed"
        );
        Ok(view)
    }
}

fn require_customer_id(customer_id: &str) -> Result<&str, ServiceError> {
    if customer_id.trim().is_empty() {
        return Err(DecisionError::InvalidInput("customerId is required".to_string()).into());
    }
    Ok(customer_id)
}

/// Error raised by the feature decision service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Decision(#[from] DecisionError),
}
