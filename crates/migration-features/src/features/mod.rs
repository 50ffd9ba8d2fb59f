//! Feature availability decisions for customers moving between banking platforms.
//!
//! Verdicts are computed from the customer's account records and a decision
//! table loaded once at startup. Every rule is evaluated in table order and
//! later rules override earlier ones; features no rule touched default to
//! enabled.

pub mod decision;
pub mod domain;
pub mod loader;
pub mod lookup;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use decision::{
    decide, decide_with_accounts_view, derive_customer_status, AccountsView, Condition,
    DecisionContext, DecisionEngine, DecisionError, FeatureAction, Predicate, ReasonTemplate,
    Rule, RuleTable, DEFAULT_REASON,
};
pub use domain::{
    AccountRecord, AccountType, CustomerStatus, FeatureVerdict, MigrationStatus, MigrationWave,
};
pub use loader::{RowError, RuleLoadError, RuleTableLoader};
pub use lookup::{AccountLookup, HttpAccountLookup, LookupError};
pub use router::feature_router;
pub use service::{
    FeatureCheckRequest, FeatureCheckResponse, FeatureDecisionService, ServiceError,
};
