use super::super::domain::{
    AccountRecord, AccountType, CustomerStatus, MigrationStatus, MigrationWave,
};
use super::DecisionError;

/// Rolls account statuses up into a single customer status.
///
/// Any `NOT_MIGRATED` account drops the customer, then `IN_PROGRESS` wins
/// over `SCHEDULED`. Only a uniform set of terminal statuses maps to
/// `COMPLETED` or `EXCLUDED`; mixed terminal sets are `NOT_IN_SCOPE`.
pub fn derive_customer_status(accounts: &[AccountRecord]) -> Result<CustomerStatus, DecisionError> {
    if accounts.is_empty() {
        return Err(DecisionError::InvalidInput(
            "cannot derive a customer status from an empty account list".to_string(),
        ));
    }

    let mut in_progress = false;
    let mut scheduled = false;
    let mut all_migrated = true;
    let mut all_excluded = true;

    for account in accounts {
        match account.migration_status {
            MigrationStatus::NotMigrated => return Ok(CustomerStatus::Dropped),
            MigrationStatus::InProgress => in_progress = true,
            MigrationStatus::Scheduled => scheduled = true,
            MigrationStatus::Migrated => {}
            MigrationStatus::Excluded => {}
        }
        all_migrated &= account.migration_status == MigrationStatus::Migrated;
        all_excluded &= account.migration_status == MigrationStatus::Excluded;
    }

    let status = if in_progress {
        CustomerStatus::InProgress
    } else if scheduled {
        CustomerStatus::Scheduled
    } else if all_migrated {
        CustomerStatus::Completed
    } else if all_excluded {
        CustomerStatus::Excluded
    } else {
        CustomerStatus::NotInScope
    };

    Ok(status)
}

pub fn has_account_type(accounts: &[AccountRecord], account_type: AccountType) -> bool {
    accounts
        .iter()
        .any(|account| account.account_type == account_type)
}

pub fn has_savings_or_cd(accounts: &[AccountRecord]) -> bool {
    has_account_type(accounts, AccountType::Savings) || has_account_type(accounts, AccountType::Cd)
}

pub fn has_checking(accounts: &[AccountRecord]) -> bool {
    has_account_type(accounts, AccountType::Checking)
}

pub fn has_lending_or_ira(accounts: &[AccountRecord]) -> bool {
    has_account_type(accounts, AccountType::Lending) || has_account_type(accounts, AccountType::Ira)
}

/// Wave of the first account that belongs to one.
pub fn current_wave(accounts: &[AccountRecord]) -> MigrationWave {
    accounts
        .iter()
        .map(|account| &account.migration_wave)
        .find(|wave| wave.is_applicable())
        .cloned()
        .unwrap_or_default()
}

pub fn migratable_account_types(accounts: &[AccountRecord]) -> Vec<AccountType> {
    accounts
        .iter()
        .filter(|account| account.migration_wave.is_applicable())
        .map(|account| account.account_type)
        .collect()
}
