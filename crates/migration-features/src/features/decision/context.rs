use std::collections::HashMap;

use super::super::domain::{
    AccountRecord, AccountType, CustomerStatus, FeatureVerdict, MigrationWave,
};
use super::status;

/// Working set for a single decision computation.
///
/// A context borrows the request's accounts and feature names and is dropped
/// once the verdicts are emitted; it is never reused across requests.
#[derive(Debug)]
pub struct DecisionContext<'a> {
    customer_id: &'a str,
    accounts: &'a [AccountRecord],
    requested_features: &'a [String],
    customer_status: CustomerStatus,
    feature_decisions: HashMap<String, bool>,
    decision_reasons: HashMap<String, String>,
}

impl<'a> DecisionContext<'a> {
    pub fn new(
        customer_id: &'a str,
        accounts: &'a [AccountRecord],
        requested_features: &'a [String],
        customer_status: CustomerStatus,
    ) -> Self {
        Self {
            customer_id,
            accounts,
            requested_features,
            customer_status,
            feature_decisions: HashMap::new(),
            decision_reasons: HashMap::new(),
        }
    }

    pub fn customer_id(&self) -> &'a str {
        self.customer_id
    }

    pub fn accounts(&self) -> &'a [AccountRecord] {
        self.accounts
    }

    pub fn requested_features(&self) -> &'a [String] {
        self.requested_features
    }

    pub fn customer_status(&self) -> CustomerStatus {
        self.customer_status
    }

    pub fn has_account_type(&self, account_type: AccountType) -> bool {
        status::has_account_type(self.accounts, account_type)
    }

    pub fn has_savings_or_cd(&self) -> bool {
        status::has_savings_or_cd(self.accounts)
    }

    pub fn has_checking(&self) -> bool {
        status::has_checking(self.accounts)
    }

    pub fn has_lending_or_ira(&self) -> bool {
        status::has_lending_or_ira(self.accounts)
    }

    pub fn current_wave(&self) -> MigrationWave {
        status::current_wave(self.accounts)
    }

    pub fn migratable_account_types(&self) -> Vec<AccountType> {
        status::migratable_account_types(self.accounts)
    }

    /// Records a decision, replacing any earlier one for the same feature.
    pub fn set_feature(&mut self, feature: &str, enabled: bool, reason: String) {
        self.feature_decisions.insert(feature.to_string(), enabled);
        self.decision_reasons.insert(feature.to_string(), reason);
    }

    pub fn is_decided(&self, feature: &str) -> bool {
        self.feature_decisions.contains_key(feature)
    }

    pub fn decision(&self, feature: &str) -> Option<bool> {
        self.feature_decisions.get(feature).copied()
    }

    pub fn reason(&self, feature: &str) -> Option<&str> {
        self.decision_reasons.get(feature).map(String::as_str)
    }

    pub fn verdict(&self, feature: &str) -> Option<FeatureVerdict> {
        let enabled = self.decision(feature)?;
        let reason = self.reason(feature)?;
        Some(FeatureVerdict {
            feature: feature.to_string(),
            enabled,
            reason: reason.to_string(),
        })
    }

    pub fn decided_count(&self) -> usize {
        self.feature_decisions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::domain::MigrationStatus;

    #[test]
    fn later_decisions_replace_earlier_ones() {
        let accounts = vec![AccountRecord::new(
            "ACC-1",
            AccountType::Checking,
            MigrationStatus::Scheduled,
            MigrationWave::new("WAVE_1"),
        )];
        let features = vec!["billPay".to_string()];
        let mut context =
            DecisionContext::new("CUST-1", &accounts, &features, CustomerStatus::Scheduled);

        assert!(!context.is_decided("billPay"));
        context.set_feature("billPay", false, "first".to_string());
        context.set_feature("billPay", true, "second".to_string());

        assert_eq!(context.decided_count(), 1);
        assert_eq!(
            context.verdict("billPay"),
            Some(FeatureVerdict {
                feature: "billPay".to_string(),
                enabled: true,
                reason: "second".to_string(),
            })
        );
        assert_eq!(context.verdict("zelle"), None);
        assert_eq!(context.current_wave(), MigrationWave::new("WAVE_1"));
    }
}
