use serde::{Deserialize, Serialize};
use std::fmt;

use super::super::domain::{AccountType, CustomerStatus, MigrationWave};
use super::context::DecisionContext;
use super::DecisionError;

/// Single test a rule condition can make against the decision context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    HasAccountType {
        account_type: AccountType,
        present: bool,
    },
    HasSavingsOrCd(bool),
    HasChecking(bool),
    HasLendingOrIra(bool),
    CurrentWave(MigrationWave),
    CustomerStatus(CustomerStatus),
}

impl Predicate {
    pub fn matches(&self, context: &DecisionContext<'_>) -> bool {
        match self {
            Predicate::HasAccountType {
                account_type,
                present,
            } => context.has_account_type(*account_type) == *present,
            Predicate::HasSavingsOrCd(expected) => context.has_savings_or_cd() == *expected,
            Predicate::HasChecking(expected) => context.has_checking() == *expected,
            Predicate::HasLendingOrIra(expected) => context.has_lending_or_ira() == *expected,
            Predicate::CurrentWave(wave) => context.current_wave() == *wave,
            Predicate::CustomerStatus(status) => context.customer_status() == *status,
        }
    }
}

/// Conjunction of predicates; an empty condition always matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    predicates: Vec<Predicate>,
}

impl Condition {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn matches(&self, context: &DecisionContext<'_>) -> bool {
        self.predicates
            .iter()
            .all(|predicate| predicate.matches(context))
    }
}

pub const DEFAULT_REASON_TEMPLATE: &str = "{wave}: {feature} {state}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Wave,
    Feature,
    State,
    Status,
    Customer,
}

impl Placeholder {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "wave" => Some(Self::Wave),
            "feature" => Some(Self::Feature),
            "state" => Some(Self::State),
            "status" => Some(Self::Status),
            "customer" => Some(Self::Customer),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'t> {
    Literal(&'t str),
    Slot(Placeholder),
}

/// Problem found while expanding a reason template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown placeholder {{{0}}} in reason template")]
    UnknownPlaceholder(String),
    #[error("unclosed placeholder in reason template '{0}'")]
    Unclosed(String),
}

/// Reason text with `{wave}`, `{feature}`, `{state}`, `{status}` and
/// `{customer}` slots filled in when a rule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReasonTemplate(String);

impl Default for ReasonTemplate {
    fn default() -> Self {
        Self(DEFAULT_REASON_TEMPLATE.to_string())
    }
}

impl ReasonTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        self.segments().map(|_| ())
    }

    fn segments(&self) -> Result<Vec<Segment<'_>>, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = self.0.as_str();

        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(&rest[..open]));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| TemplateError::Unclosed(self.0.clone()))?;
            let name = after[..close].trim();
            let slot = Placeholder::parse(name)
                .ok_or_else(|| TemplateError::UnknownPlaceholder(name.to_string()))?;
            segments.push(Segment::Slot(slot));
            rest = &after[close + 1..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest));
        }

        Ok(segments)
    }

    pub fn render(
        &self,
        context: &DecisionContext<'_>,
        feature: &str,
        enabled: bool,
    ) -> Result<String, TemplateError> {
        let mut rendered = String::with_capacity(self.0.len() + 16);
        for segment in self.segments()? {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Slot(Placeholder::Wave) => {
                    rendered.push_str(context.current_wave().as_str())
                }
                Segment::Slot(Placeholder::Feature) => rendered.push_str(feature),
                Segment::Slot(Placeholder::State) => rendered.push_str(state_label(enabled)),
                Segment::Slot(Placeholder::Status) => {
                    rendered.push_str(context.customer_status().label())
                }
                Segment::Slot(Placeholder::Customer) => rendered.push_str(context.customer_id()),
            }
        }
        Ok(rendered)
    }
}

impl fmt::Display for ReasonTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const fn state_label(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// Action fired by a matching rule: set one named feature on or off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureAction {
    pub feature: String,
    pub enabled: bool,
    #[serde(default)]
    pub reason: ReasonTemplate,
}

impl FeatureAction {
    pub fn set(feature: impl Into<String>, enabled: bool) -> Self {
        Self {
            feature: feature.into(),
            enabled,
            reason: ReasonTemplate::default(),
        }
    }

    pub fn enable(feature: impl Into<String>) -> Self {
        Self::set(feature, true)
    }

    pub fn disable(feature: impl Into<String>) -> Self {
        Self::set(feature, false)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = ReasonTemplate::new(reason);
        self
    }

    fn apply(&self, context: &mut DecisionContext<'_>) -> Result<(), String> {
        let feature = self.feature.trim();
        if feature.is_empty() {
            return Err("action does not name a feature".to_string());
        }

        let reason = self
            .reason
            .render(context, feature, self.enabled)
            .map_err(|err| err.to_string())?;
        context.set_feature(feature, self.enabled, reason);
        Ok(())
    }
}

/// Named condition/action pair from the decision table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub condition: Condition,
    pub action: FeatureAction,
}

impl Rule {
    pub fn new(name: impl Into<String>, condition: Condition, action: FeatureAction) -> Self {
        Self {
            name: name.into(),
            condition,
            action,
        }
    }
}

/// Ordered decision table. Order is significant: later matches win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }
}

impl<'t> IntoIterator for &'t RuleTable {
    type Item = &'t Rule;
    type IntoIter = std::slice::Iter<'t, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Visits every rule in table order, applying each one whose condition holds.
///
/// There is no early exit: a later rule touching the same feature overwrites
/// an earlier one. Returns how many rules fired.
pub fn evaluate(
    context: &mut DecisionContext<'_>,
    rules: &RuleTable,
) -> Result<usize, DecisionError> {
    let mut fired = 0;

    for rule in rules {
        if !rule.condition.matches(context) {
            continue;
        }

        rule.action
            .apply(context)
            .map_err(|detail| DecisionError::RuleEvaluationFault {
                rule: rule.name.clone(),
                detail,
            })?;
        fired += 1;
    }

    Ok(fired)
}
