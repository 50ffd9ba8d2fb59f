//! Account lookup against the upstream migration system.
//!
//! The decision engine never performs I/O; the service fetches accounts
//! through [`AccountLookup`] first and only hands a non-empty list onward.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::{MigrationApiConfig, CUSTOMER_ID_PLACEHOLDER};

use super::domain::AccountRecord;

/// Source of a customer's account records.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn fetch_accounts(&self, customer_id: &str) -> Result<Vec<AccountRecord>, LookupError>;
}

/// Error raised while fetching accounts.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("no migration data found for customer {customer_id}")]
    NoAccounts { customer_id: String },
    #[error("migration API unavailable for customer {customer_id}: {detail}")]
    Unavailable { customer_id: String, detail: String },
    #[error("migration API client could not be configured: {0}")]
    Client(String),
}

/// Payload returned by the migration API; only `accounts` is consumed.
#[derive(Debug, Deserialize)]
struct MigrationApiResponse {
    #[serde(default)]
    accounts: Option<Vec<AccountRecord>>,
}

/// [`AccountLookup`] backed by the migration REST API.
#[derive(Debug, Clone)]
pub struct HttpAccountLookup {
    client: reqwest::Client,
    base_url: String,
    endpoint: String,
}

impl HttpAccountLookup {
    pub fn new(config: &MigrationApiConfig) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| LookupError::Client(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            endpoint: config.endpoint.clone(),
        })
    }

    /// Builds the account URL with the customer id encoded as a path segment.
    ///
    /// Only the placeholder segment is rewritten; the rest of the endpoint
    /// path keeps whatever escaping it was configured with.
    pub fn account_url(&self, customer_id: &str) -> Result<reqwest::Url, LookupError> {
        let raw = format!("{}{}", self.base_url, self.endpoint);
        let mut url = reqwest::Url::parse(&raw).map_err(|err| {
            LookupError::Client(format!("invalid migration API URL '{raw}': {err}"))
        })?;
        let cannot_be_base =
            || LookupError::Client(format!("migration API URL '{raw}' cannot carry a path"));

        let mut scratch = url.clone();
        scratch
            .path_segments_mut()
            .map_err(|_| cannot_be_base())?
            .clear()
            .push(customer_id);
        let encoded_id = scratch.path().trim_start_matches('/').to_string();

        let encoded_placeholder = CUSTOMER_ID_PLACEHOLDER
            .replace('{', "%7B")
            .replace('}', "%7D");
        let path = url
            .path_segments()
            .ok_or_else(cannot_be_base)?
            .map(|segment| {
                if segment == encoded_placeholder || segment == CUSTOMER_ID_PLACEHOLDER {
                    encoded_id.as_str()
                } else {
                    segment
                }
            })
            .collect::<Vec<_>>()
            .join("/");
        url.set_path(&format!("/{path}"));

        Ok(url)
    }

    fn unavailable(customer_id: &str, detail: impl ToString) -> LookupError {
        LookupError::Unavailable {
            customer_id: customer_id.to_string(),
            detail: detail.to_string(),
        }
    }
}

#[async_trait]
impl AccountLookup for HttpAccountLookup {
    async fn fetch_accounts(&self, customer_id: &str) -> Result<Vec<AccountRecord>, LookupError> {
        let url = self.account_url(customer_id)?;
        debug!(customer_id, %url, "calling migration API");

        let response = self.client.get(url).send().await.map_err(|err| {
            error!(customer_id, error = %err, "migration API request failed");
            Self::unavailable(customer_id, err)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(customer_id, %status, "migration API returned an error status");
            return Err(Self::unavailable(
                customer_id,
                format!("upstream responded with {status}"),
            ));
        }

        let body: MigrationApiResponse = response.json().await.map_err(|err| {
            error!(customer_id, error = %err, "migration API returned an unreadable body");
            Self::unavailable(customer_id, err)
        })?;

        match body.accounts {
            Some(accounts) if !accounts.is_empty() => {
                debug!(customer_id, accounts = accounts.len(), "retrieved accounts");
                Ok(accounts)
            }
            _ => Err(LookupError::NoAccounts {
                customer_id: customer_id.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ACCOUNTS_ENDPOINT;
    use std::time::Duration;

    fn lookup(base_url: &str, endpoint: &str) -> HttpAccountLookup {
        HttpAccountLookup::new(&MigrationApiConfig {
            base_url: base_url.to_string(),
            endpoint: endpoint.to_string(),
            timeout: Duration::from_millis(500),
        })
        .expect("client builds")
    }

    #[test]
    fn account_url_substitutes_customer_id() {
        let lookup = lookup("http://migration.local:8081/", DEFAULT_ACCOUNTS_ENDPOINT);
        let url = lookup.account_url("CUST-42").expect("url builds");
        assert_eq!(
            url.as_str(),
            "http://migration.local:8081/api/migration/customers/CUST-42/accounts"
        );
    }

    #[test]
    fn account_url_encodes_reserved_characters() {
        let lookup = lookup("http://migration.local", "/customers/{customerId}");
        let url = lookup.account_url("a b/c").expect("url builds");
        assert_eq!(url.as_str(), "http://migration.local/customers/a%20b%2Fc");
    }

    #[test]
    fn account_url_keeps_query_strings() {
        let lookup = lookup(
            "http://migration.local",
            "/customers/{customerId}/accounts?view=full",
        );
        let url = lookup.account_url("C1").expect("url builds");
        assert_eq!(
            url.as_str(),
            "http://migration.local/customers/C1/accounts?view=full"
        );
    }

    #[test]
    fn account_url_preserves_escaped_endpoint_segments() {
        let lookup = lookup(
            "http://migration.local",
            "/api/caf%C3%A9%20v2/customers/{customerId}/accounts",
        );
        let url = lookup.account_url("CUST 7").expect("url builds");
        assert_eq!(
            url.as_str(),
            "http://migration.local/api/caf%C3%A9%20v2/customers/CUST%207/accounts"
        );
    }
}
