use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::features::decision::{Condition, FeatureAction, Predicate, Rule, RuleTable};
use crate::features::domain::{
    AccountRecord, AccountType, CustomerStatus, MigrationStatus, MigrationWave,
};
use crate::features::lookup::{AccountLookup, LookupError};
use crate::features::{feature_router, DecisionEngine, FeatureDecisionService};

pub(super) fn account(
    id: &str,
    account_type: AccountType,
    status: MigrationStatus,
    wave: &str,
) -> AccountRecord {
    AccountRecord::new(id, account_type, status, MigrationWave::new(wave))
}

pub(super) fn features(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Savings scheduled for WAVE_2 alongside checking already moved.
pub(super) fn scheduled_customer() -> Vec<AccountRecord> {
    vec![
        account("SAV-100", AccountType::Savings, MigrationStatus::Scheduled, "WAVE_2"),
        account("CHK-100", AccountType::Checking, MigrationStatus::Migrated, "WAVE_2"),
    ]
}

pub(super) fn dropped_customer() -> Vec<AccountRecord> {
    vec![
        account("CD-200", AccountType::Cd, MigrationStatus::NotMigrated, "NOT_APPLICABLE"),
        account("SAV-200", AccountType::Savings, MigrationStatus::Scheduled, "WAVE_3"),
    ]
}

pub(super) fn decision_table() -> RuleTable {
    RuleTable::new(vec![
        Rule::new(
            "scheduled-savings-freeze",
            Condition::always()
                .and(Predicate::CustomerStatus(CustomerStatus::Scheduled))
                .and(Predicate::HasSavingsOrCd(true)),
            FeatureAction::disable("mobileDeposit"),
        ),
        Rule::new(
            "scheduled-transfers",
            Condition::always().and(Predicate::CustomerStatus(CustomerStatus::Scheduled)),
            FeatureAction::disable("externalTransfers"),
        ),
        Rule::new(
            "wave2-transfers-exception",
            Condition::always()
                .and(Predicate::CurrentWave(MigrationWave::new("WAVE_2")))
                .and(Predicate::HasChecking(true)),
            FeatureAction::enable("externalTransfers")
                .with_reason("{wave} exception: {feature} {state}"),
        ),
        Rule::new(
            "dropped-lockout",
            Condition::always().and(Predicate::CustomerStatus(CustomerStatus::Dropped)),
            FeatureAction::disable("loginV2").with_reason("{status}: {feature} {state}"),
        ),
    ])
}

pub(super) fn build_service(
    lookup: MemoryLookup,
) -> (FeatureDecisionService<MemoryLookup>, Arc<MemoryLookup>) {
    let lookup = Arc::new(lookup);
    let service =
        FeatureDecisionService::new(lookup.clone(), DecisionEngine::new(decision_table()));
    (service, lookup)
}

pub(super) fn router_with_lookup<L>(lookup: L) -> axum::Router
where
    L: AccountLookup + 'static,
{
    let service =
        FeatureDecisionService::new(Arc::new(lookup), DecisionEngine::new(decision_table()));
    feature_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
pub(super) struct MemoryLookup {
    customers: HashMap<String, Vec<AccountRecord>>,
    calls: AtomicUsize,
}

impl MemoryLookup {
    pub(super) fn with_customer(mut self, customer_id: &str, accounts: Vec<AccountRecord>) -> Self {
        self.customers.insert(customer_id.to_string(), accounts);
        self
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountLookup for MemoryLookup {
    async fn fetch_accounts(&self, customer_id: &str) -> Result<Vec<AccountRecord>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.customers.get(customer_id) {
            Some(accounts) if !accounts.is_empty() => Ok(accounts.clone()),
            _ => Err(LookupError::NoAccounts {
                customer_id: customer_id.to_string(),
            }),
        }
    }
}

pub(super) struct UnavailableLookup;

#[async_trait]
impl AccountLookup for UnavailableLookup {
    async fn fetch_accounts(&self, customer_id: &str) -> Result<Vec<AccountRecord>, LookupError> {
        Err(LookupError::Unavailable {
            customer_id: customer_id.to_string(),
            detail: "connection refused".to_string(),
        })
    }
}

/// Returns accounts without running them through the upstream emptiness check.
pub(super) struct RawLookup(pub(super) Vec<AccountRecord>);

#[async_trait]
impl AccountLookup for RawLookup {
    async fn fetch_accounts(&self, _customer_id: &str) -> Result<Vec<AccountRecord>, LookupError> {
        Ok(self.0.clone())
    }
}
