use clap::Args;
use migration_features::error::AppError;
use migration_features::features::decision::current_wave;
use migration_features::features::{
    derive_customer_status, AccountRecord, CustomerStatus, DecisionEngine, FeatureVerdict,
    RuleTableLoader,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// JSON file holding the customer's accounts (a list, or an object with an `accounts` field)
    #[arg(long)]
    pub(crate) accounts: PathBuf,
    /// Decision table CSV to evaluate
    #[arg(long)]
    pub(crate) rules: PathBuf,
    /// Feature to decide; repeat for several
    #[arg(long = "feature", required = true)]
    pub(crate) features: Vec<String>,
    /// Customer id used in reason text
    #[arg(long, default_value = "CLI")]
    pub(crate) customer: String,
    /// Emit JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AccountsDocument {
    List(Vec<AccountRecord>),
    Wrapped { accounts: Vec<AccountRecord> },
}

impl AccountsDocument {
    fn into_accounts(self) -> Vec<AccountRecord> {
        match self {
            AccountsDocument::List(accounts) | AccountsDocument::Wrapped { accounts } => accounts,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EvaluationReport {
    pub(crate) customer_id: String,
    pub(crate) customer_status: CustomerStatus,
    pub(crate) current_wave: String,
    pub(crate) features: Vec<FeatureVerdict>,
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let report = evaluate(&args)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.json {
        serde_json::to_writer_pretty(&mut out, &report).map_err(std::io::Error::from)?;
        writeln!(out)?;
    } else {
        render_report(&report, &mut out)?;
    }
    Ok(())
}

pub(crate) fn evaluate(args: &EvaluateArgs) -> Result<EvaluationReport, AppError> {
    let accounts = load_accounts(&args.accounts)?;
    let rules = RuleTableLoader::from_path(&args.rules)?;
    let engine = DecisionEngine::new(rules);

    let customer_status = derive_customer_status(&accounts)?;
    let features = engine.decide(&args.customer, &accounts, &args.features)?;

    Ok(EvaluationReport {
        customer_id: args.customer.clone(),
        customer_status,
        current_wave: current_wave(&accounts).to_string(),
        features,
    })
}

fn load_accounts(path: &Path) -> Result<Vec<AccountRecord>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let document: AccountsDocument = serde_json::from_str(&raw)?;
    Ok(document.into_accounts())
}

pub(crate) fn render_report<W: Write>(
    report: &EvaluationReport,
    out: &mut W,
) -> std::io::Result<()> {
    writeln!(
        out,
        "Customer {} | status {} | wave {}",
        report.customer_id, report.customer_status, report.current_wave
    )?;

    let width = report
        .features
        .iter()
        .map(|verdict| verdict.feature.len())
        .max()
        .unwrap_or(0);
    for verdict in &report.features {
        let state = if verdict.enabled { "enabled" } else { "disabled" };
        writeln!(
            out,
            "- {:<width$}  {:<8}  {}",
            verdict.feature, state, verdict.reason
        )?;
    }
    Ok(())
}
