use crate::features::decision::{Condition, FeatureAction, Predicate, ReasonTemplate, Rule};
use crate::features::domain::{AccountType, CustomerStatus, MigrationWave};
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// Problem with a single decision-table row; `row` is 1-based, header excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

pub(crate) enum ParseFailure {
    Csv(csv::Error),
    Row(RowError),
}

impl From<csv::Error> for ParseFailure {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub(crate) fn parse_rules<R: Read>(reader: R) -> Result<Vec<Rule>, ParseFailure> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').to_ascii_lowercase())
        .collect::<csv::StringRecord>();
    csv_reader.set_headers(headers);

    let mut rules = Vec::new();
    for (index, record) in csv_reader.deserialize::<RuleRow>().enumerate() {
        let row = index + 1;
        let parsed = record?;
        if parsed.is_blank() {
            continue;
        }
        rules.push(parsed.into_rule(row).map_err(ParseFailure::Row)?);
    }

    Ok(rules)
}

#[derive(Debug, Default, Deserialize)]
struct RuleRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    rule: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    customer_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    has_savings_or_cd: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    has_checking: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    has_lending_or_ira: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    account_types: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    current_wave: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    feature: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    state: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    reason: Option<String>,
}

impl RuleRow {
    fn is_blank(&self) -> bool {
        self.rule.is_none()
            && self.customer_status.is_none()
            && self.has_savings_or_cd.is_none()
            && self.has_checking.is_none()
            && self.has_lending_or_ira.is_none()
            && self.account_types.is_none()
            && self.current_wave.is_none()
            && self.feature.is_none()
            && self.state.is_none()
            && self.reason.is_none()
    }

    fn into_rule(self, row: usize) -> Result<Rule, RowError> {
        let fail = |message: String| RowError { row, message };
        let mut condition = Condition::always();

        if let Some(raw) = self.customer_status.as_deref() {
            let status = raw
                .parse::<CustomerStatus>()
                .map_err(|err| fail(err.to_string()))?;
            condition = condition.and(Predicate::CustomerStatus(status));
        }
        if let Some(raw) = self.has_savings_or_cd.as_deref() {
            let expected = parse_flag("has_savings_or_cd", raw).map_err(fail)?;
            condition = condition.and(Predicate::HasSavingsOrCd(expected));
        }
        if let Some(raw) = self.has_checking.as_deref() {
            let expected = parse_flag("has_checking", raw).map_err(fail)?;
            condition = condition.and(Predicate::HasChecking(expected));
        }
        if let Some(raw) = self.has_lending_or_ira.as_deref() {
            let expected = parse_flag("has_lending_or_ira", raw).map_err(fail)?;
            condition = condition.and(Predicate::HasLendingOrIra(expected));
        }
        if let Some(raw) = self.account_types.as_deref() {
            for entry in raw.split(';').map(str::trim).filter(|entry| !entry.is_empty()) {
                let (present, name) = match entry.strip_prefix('!') {
                    Some(name) => (false, name),
                    None => (true, entry),
                };
                let account_type = name
                    .parse::<AccountType>()
                    .map_err(|err| fail(err.to_string()))?;
                condition = condition.and(Predicate::HasAccountType {
                    account_type,
                    present,
                });
            }
        }
        if let Some(raw) = self.current_wave.as_deref() {
            condition = condition.and(Predicate::CurrentWave(MigrationWave::new(raw)));
        }

        let feature = self
            .feature
            .ok_or_else(|| fail("feature column is required".to_string()))?;
        let enabled = match self.state.as_deref() {
            Some(raw) => parse_state(raw).map_err(fail)?,
            None => return Err(fail("state column is required".to_string())),
        };

        let mut action = FeatureAction::set(feature, enabled);
        if let Some(reason) = self.reason {
            let template = ReasonTemplate::new(reason);
            template.validate().map_err(|err| fail(err.to_string()))?;
            action.reason = template;
        }

        let name = self.rule.unwrap_or_else(|| format!("row-{row}"));
        Ok(Rule::new(name, condition, action))
    }
}

fn parse_flag(column: &str, raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        other => Err(format!("{column} must be true or false, got '{other}'")),
    }
}

fn parse_state(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "enabled" => Ok(true),
        "disabled" => Ok(false),
        other => Err(format!("state must be enabled or disabled, got '{other}'")),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
pub(crate) fn parse_flag_for_tests(raw: &str) -> Result<bool, String> {
    parse_flag("flag", raw)
}
