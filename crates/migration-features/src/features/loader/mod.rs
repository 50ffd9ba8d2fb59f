mod parser;

use crate::features::decision::RuleTable;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use parser::ParseFailure;
pub use parser::RowError;

#[derive(Debug)]
pub enum RuleLoadError {
    Io(std::io::Error),
    Csv(csv::Error),
    Row(RowError),
}

impl std::fmt::Display for RuleLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleLoadError::Io(err) => write!(f, "failed to read decision table: {}", err),
            RuleLoadError::Csv(err) => write!(f, "invalid decision table CSV: {}", err),
            RuleLoadError::Row(err) => {
                write!(f, "decision table row {}: {}", err.row, err.message)
            }
        }
    }
}

impl std::error::Error for RuleLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuleLoadError::Io(err) => Some(err),
            RuleLoadError::Csv(err) => Some(err),
            RuleLoadError::Row(_) => None,
        }
    }
}

impl From<std::io::Error> for RuleLoadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ParseFailure> for RuleLoadError {
    fn from(err: ParseFailure) -> Self {
        match err {
            ParseFailure::Csv(err) => Self::Csv(err),
            ParseFailure::Row(err) => Self::Row(err),
        }
    }
}

/// Reads the CSV decision table the service evaluates for every request.
pub struct RuleTableLoader;

impl RuleTableLoader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<RuleTable, RuleLoadError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading decision table");
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<RuleTable, RuleLoadError> {
        let rules = parser::parse_rules(reader)?;
        if rules.is_empty() {
            warn!("decision table has no rules; every feature will use the default verdict");
        } else {
            info!(rules = rules.len(), "decision table loaded");
        }
        Ok(RuleTable::new(rules))
    }
}
