mod context;
mod defaults;
mod rules;
mod status;

pub use context::DecisionContext;
pub use defaults::{apply_defaults, DEFAULT_REASON};
pub use rules::{
    evaluate, state_label, Condition, FeatureAction, Predicate, ReasonTemplate, Rule, RuleTable,
    TemplateError, DEFAULT_REASON_TEMPLATE,
};
pub use status::{
    current_wave, derive_customer_status, has_account_type, has_checking, has_lending_or_ira,
    has_savings_or_cd, migratable_account_types,
};

use super::domain::{AccountRecord, CustomerStatus, FeatureVerdict};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Failure raised while computing feature verdicts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("rule '{rule}' could not be evaluated: {detail}")]
    RuleEvaluationFault { rule: String, detail: String },
}

impl DecisionError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, DecisionError::InvalidInput(_))
    }
}

/// Accounts listing with the derived status and, when requested, verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsView {
    pub customer_id: String,
    pub customer_status: CustomerStatus,
    pub accounts: Vec<AccountRecord>,
    #[serde(
        rename = "featureSuppressionInfo",
        skip_serializing_if = "Option::is_none"
    )]
    pub feature_verdicts: Option<BTreeMap<String, FeatureVerdict>>,
}

/// Stateless evaluator holding the shared, read-only decision table.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    rules: Arc<RuleTable>,
}

impl DecisionEngine {
    pub fn new(rules: RuleTable) -> Self {
        Self::shared(Arc::new(rules))
    }

    pub fn shared(rules: Arc<RuleTable>) -> Self {
        Self { rules }
    }

    pub fn decide(
        &self,
        customer_id: &str,
        accounts: &[AccountRecord],
        requested_features: &[String],
    ) -> Result<Vec<FeatureVerdict>, DecisionError> {
        decide(customer_id, accounts, requested_features, &self.rules)
    }

    pub fn accounts_view(
        &self,
        customer_id: &str,
        accounts: Vec<AccountRecord>,
        requested_features: Option<&[String]>,
    ) -> Result<AccountsView, DecisionError> {
        decide_with_accounts_view(customer_id, accounts, requested_features, &self.rules)
    }
}

/// Produces one verdict per requested feature, in request order.
pub fn decide(
    customer_id: &str,
    accounts: &[AccountRecord],
    requested_features: &[String],
    rules: &RuleTable,
) -> Result<Vec<FeatureVerdict>, DecisionError> {
    if accounts.is_empty() {
        return Err(DecisionError::InvalidInput(
            "account list must not be empty".to_string(),
        ));
    }
    if requested_features.is_empty() {
        return Err(DecisionError::InvalidInput(
            "at least one feature must be requested".to_string(),
        ));
    }

    let customer_status = derive_customer_status(accounts)?;
    let context = resolve(customer_id, accounts, requested_features, customer_status, rules)?;

    requested_features
        .iter()
        .map(|feature| {
            context.verdict(feature).ok_or_else(|| {
                DecisionError::RuleEvaluationFault {
                    rule: "defaults".to_string(),
                    detail: format!("feature '{feature}' left without a verdict"),
                }
            })
        })
        .collect()
}

/// Returns the accounts and derived status, evaluating features only when
/// a non-empty feature list is supplied.
pub fn decide_with_accounts_view(
    customer_id: &str,
    accounts: Vec<AccountRecord>,
    requested_features: Option<&[String]>,
    rules: &RuleTable,
) -> Result<AccountsView, DecisionError> {
    let customer_status = derive_customer_status(&accounts)?;

    let feature_verdicts = match requested_features {
        Some(features) if !features.is_empty() => {
            let verdicts = decide(customer_id, &accounts, features, rules)?;
            Some(
                verdicts
                    .into_iter()
                    .map(|verdict| (verdict.feature.clone(), verdict))
                    .collect(),
            )
        }
        _ => None,
    };

    Ok(AccountsView {
        customer_id: customer_id.to_string(),
        customer_status,
        accounts,
        feature_verdicts,
    })
}

fn resolve<'a>(
    customer_id: &'a str,
    accounts: &'a [AccountRecord],
    requested_features: &'a [String],
    customer_status: CustomerStatus,
    rules: &RuleTable,
) -> Result<DecisionContext<'a>, DecisionError> {
    debug!(customer_id, status = %customer_status, "derived customer status");

    let mut context =
        DecisionContext::new(customer_id, accounts, requested_features, customer_status);
    let fired = evaluate(&mut context, rules)?;
    let defaulted = apply_defaults(&mut context);

    debug!(
        customer_id,
        rules = rules.len(),
        fired,
        defaulted,
        "evaluated decision table"
    );

    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::domain::{AccountType, MigrationStatus, MigrationWave};

    fn account(
        id: &str,
        account_type: AccountType,
        status: MigrationStatus,
        wave: &str,
    ) -> AccountRecord {
        AccountRecord::new(id, account_type, status, MigrationWave::new(wave))
    }

    fn names(features: &[&str]) -> Vec<String> {
        features.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn checking_in_progress_without_rules_defaults_to_enabled() {
        let accounts = vec![account(
            "CHK-1",
            AccountType::Checking,
            MigrationStatus::InProgress,
            "W1",
        )];

        let verdicts = decide("CUST-1", &accounts, &names(&["loginV2"]), &RuleTable::default())
            .expect("decision succeeds");

        assert_eq!(
            verdicts,
            vec![FeatureVerdict {
                feature: "loginV2".to_string(),
                enabled: true,
                reason: DEFAULT_REASON.to_string(),
            }]
        );
    }

    #[test]
    fn verdicts_follow_request_order() {
        let accounts = vec![account(
            "SAV-1",
            AccountType::Savings,
            MigrationStatus::Scheduled,
            "WAVE_2",
        )];
        let requested = names(&["zelle", "billPay", "alerts", "mobileDeposit"]);
        let rules = RuleTable::new(vec![
            Rule::new("a", Condition::always(), FeatureAction::disable("mobileDeposit")),
            Rule::new("b", Condition::always(), FeatureAction::disable("zelle")),
        ]);

        let verdicts = decide("CUST-2", &accounts, &requested, &rules).expect("decides");

        let order: Vec<&str> = verdicts.iter().map(|v| v.feature.as_str()).collect();
        assert_eq!(order, vec!["zelle", "billPay", "alerts", "mobileDeposit"]);
        assert!(!verdicts[0].enabled);
        assert!(verdicts[1].enabled);
        assert!(!verdicts[3].enabled);
    }

    #[test]
    fn rules_for_unrequested_features_do_not_leak_into_output() {
        let accounts = vec![account(
            "SAV-1",
            AccountType::Savings,
            MigrationStatus::Scheduled,
            "WAVE_2",
        )];
        let rules = RuleTable::new(vec![Rule::new(
            "other",
            Condition::always(),
            FeatureAction::disable("wires"),
        )]);

        let verdicts =
            decide("CUST-2", &accounts, &names(&["alerts"]), &rules).expect("decides");

        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].feature, "alerts");
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let accounts = vec![account(
            "SAV-1",
            AccountType::Savings,
            MigrationStatus::Migrated,
            "WAVE_2",
        )];

        assert!(matches!(
            decide("CUST-3", &[], &names(&["alerts"]), &RuleTable::default()),
            Err(DecisionError::InvalidInput(_))
        ));
        assert!(matches!(
            decide("CUST-3", &accounts, &[], &RuleTable::default()),
            Err(DecisionError::InvalidInput(_))
        ));
    }

    #[test]
    fn accounts_view_omits_verdicts_without_features() {
        let accounts = vec![
            account("SAV-1", AccountType::Savings, MigrationStatus::Migrated, "WAVE_1"),
            account("CHK-1", AccountType::Checking, MigrationStatus::Migrated, "WAVE_1"),
        ];

        let view =
            decide_with_accounts_view("CUST-5", accounts.clone(), None, &RuleTable::default())
                .expect("view builds");
        assert_eq!(view.customer_status, CustomerStatus::Completed);
        assert_eq!(view.accounts, accounts);
        assert!(view.feature_verdicts.is_none());

        let empty: Vec<String> = Vec::new();
        let view = decide_with_accounts_view(
            "CUST-5",
            accounts,
            Some(&empty),
            &RuleTable::default(),
        )
        .expect("view builds");
        assert!(view.feature_verdicts.is_none());
    }

    #[test]
    fn accounts_view_shares_decision_logic() {
        let accounts = vec![account(
            "SAV-1",
            AccountType::Savings,
            MigrationStatus::NotMigrated,
            "NOT_APPLICABLE",
        )];
        let rules = RuleTable::new(vec![Rule::new(
            "dropped",
            Condition::always().and(Predicate::CustomerStatus(CustomerStatus::Dropped)),
            FeatureAction::enable("alerts").with_reason("{status}: {feature} {state}"),
        )]);
        let requested = names(&["alerts", "zelle"]);
        let engine = DecisionEngine::new(rules);

        let view = engine
            .accounts_view("CUST-6", accounts.clone(), Some(&requested))
            .expect("view builds");
        let decided = engine
            .decide("CUST-6", &accounts, &requested)
            .expect("decides");

        assert_eq!(view.customer_status, CustomerStatus::Dropped);
        let verdicts = view.feature_verdicts.expect("verdicts present");
        for verdict in decided {
            assert_eq!(verdicts.get(&verdict.feature), Some(&verdict));
        }
        assert_eq!(verdicts["alerts"].reason, "DROPPED: alerts enabled");
    }

    #[test]
    fn accounts_view_rejects_empty_accounts() {
        assert!(matches!(
            decide_with_accounts_view("CUST-7", Vec::new(), None, &RuleTable::default()),
            Err(DecisionError::InvalidInput(_))
        ));
    }

    #[test]
    fn accounts_view_serializes_upstream_field_names() {
        let accounts = vec![account(
            "IRA-1",
            AccountType::Ira,
            MigrationStatus::Excluded,
            "NOT_APPLICABLE",
        )];
        let requested = names(&["alerts"]);
        let view = decide_with_accounts_view(
            "CUST-8",
            accounts,
            Some(&requested),
            &RuleTable::default(),
        )
        .expect("view builds");

        let json = serde_json::to_value(&view).expect("serializes");
        assert_eq!(json["customerId"], "CUST-8");
        assert_eq!(json["customerStatus"], "EXCLUDED");
        assert_eq!(json["accounts"][0]["accountType"], "IRA");
        assert_eq!(json["featureSuppressionInfo"]["alerts"]["enabled"], true);
    }
}
