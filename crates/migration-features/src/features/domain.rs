use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Product line of a customer account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Savings,
    Cd,
    Checking,
    Lending,
    Ira,
}

impl AccountType {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Savings,
            Self::Cd,
            Self::Checking,
            Self::Lending,
            Self::Ira,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Savings => "SAVINGS",
            Self::Cd => "CD",
            Self::Checking => "CHECKING",
            Self::Lending => "LENDING",
            Self::Ira => "IRA",
        }
    }
}

/// Where a single account sits in the move to the new core system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationStatus {
    NotMigrated,
    Scheduled,
    InProgress,
    Migrated,
    Excluded,
}

impl MigrationStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::NotMigrated,
            Self::Scheduled,
            Self::InProgress,
            Self::Migrated,
            Self::Excluded,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NotMigrated => "NOT_MIGRATED",
            Self::Scheduled => "SCHEDULED",
            Self::InProgress => "IN_PROGRESS",
            Self::Migrated => "MIGRATED",
            Self::Excluded => "EXCLUDED",
        }
    }
}

/// Rolled-up status of a customer, derived from every account they hold.
///
/// Variants are listed from highest to lowest priority; `Completed` and
/// `Excluded` share a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    Dropped,
    InProgress,
    Scheduled,
    Completed,
    Excluded,
    NotInScope,
}

impl CustomerStatus {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Dropped,
            Self::InProgress,
            Self::Scheduled,
            Self::Completed,
            Self::Excluded,
            Self::NotInScope,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dropped => "DROPPED",
            Self::InProgress => "IN_PROGRESS",
            Self::Scheduled => "SCHEDULED",
            Self::Completed => "COMPLETED",
            Self::Excluded => "EXCLUDED",
            Self::NotInScope => "NOT_IN_SCOPE",
        }
    }
}

macro_rules! labelled_enum {
    ($ty:ty, $kind:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownValue;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let trimmed = value.trim();
                <$ty>::ordered()
                    .into_iter()
                    .find(|candidate| candidate.label().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| UnknownValue {
                        kind: $kind,
                        value: trimmed.to_string(),
                    })
            }
        }
    };
}

labelled_enum!(AccountType, "account type");
labelled_enum!(MigrationStatus, "migration status");
labelled_enum!(CustomerStatus, "customer status");

/// Raised when a textual value does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

pub const NOT_APPLICABLE_WAVE: &str = "NOT_APPLICABLE";

/// Migration batch an account belongs to.
///
/// Upstream sends wave identifiers as strings; a missing, blank, or
/// `NOT_APPLICABLE` value means the account is not part of any wave.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum MigrationWave {
    #[default]
    NotApplicable,
    Wave(String),
}

impl MigrationWave {
    pub fn new(id: impl AsRef<str>) -> Self {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NOT_APPLICABLE_WAVE) {
            Self::NotApplicable
        } else {
            Self::Wave(trimmed.to_string())
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Self::Wave(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::NotApplicable => NOT_APPLICABLE_WAVE,
            Self::Wave(id) => id,
        }
    }
}

impl fmt::Display for MigrationWave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Option<String>> for MigrationWave {
    fn from(value: Option<String>) -> Self {
        value.map(Self::new).unwrap_or_default()
    }
}

impl From<MigrationWave> for String {
    fn from(value: MigrationWave) -> Self {
        match value {
            MigrationWave::NotApplicable => NOT_APPLICABLE_WAVE.to_string(),
            MigrationWave::Wave(id) => id,
        }
    }
}

/// One account as reported by the migration system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub account_id: String,
    pub account_type: AccountType,
    pub migration_status: MigrationStatus,
    #[serde(default)]
    pub migration_wave: MigrationWave,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_date: Option<NaiveDate>,
}

impl AccountRecord {
    pub fn new(
        account_id: impl Into<String>,
        account_type: AccountType,
        migration_status: MigrationStatus,
        migration_wave: MigrationWave,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            account_type,
            migration_status,
            migration_wave,
            migration_date: None,
        }
    }
}

/// Final decision for one requested feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVerdict {
    pub feature: String,
    pub enabled: bool,
    pub reason: String,
}
