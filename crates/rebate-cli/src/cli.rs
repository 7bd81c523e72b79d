use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoDate(pub String);

impl IsoDate {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn parse_iso_date(value: &str) -> Result<IsoDate, String> {
    if value.len() != 10 {
        return Err("date must use YYYY-MM-DD format".to_string());
    }

    let bytes = value.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return Err("date must use YYYY-MM-DD format".to_string());
    }

    for index in [0usize, 1, 2, 3, 5, 6, 8, 9] {
        if !bytes[index].is_ascii_digit() {
            return Err("date must use YYYY-MM-DD format".to_string());
        }
    }

    if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
        return Err("date must use valid calendar values".to_string());
    }

    Ok(IsoDate(value.to_string()))
}

const CLAIM_STATUSES: [&str; 3] = ["pending", "approved", "rejected"];

/// Extended help shown after `rebate claim create --help`.
pub const CLAIM_CREATE_AFTER_HELP: &str = "\
How claim amounts work:
  Leave out --amount (or pass 0) and the claim takes the transaction's
  current rebate: amount * program percentage / 100, rounded to cents.
  That amount is fixed when the claim is created. Later changes to the
  program or the transaction do not change it.

  A rebate is only earned while the linked program is active and today
  falls inside its start/end dates. Outside that window the computed
  amount is 0.00.

Rules:
  One claim per transaction. A second claim for the same transaction is
  rejected with `duplicate_claim`; update the existing claim instead.
  New claims start as `pending` unless --status is given.

What to do next:
  1. Run `rebate calculate <transaction-id>` to preview the amount.
  2. Run `rebate claim create <transaction-id>` to file the claim.
  3. Run `rebate claim update <claim-ref> --status approved` once reviewed.
";

/// Extended help shown after `rebate report --help`.
pub const REPORT_AFTER_HELP: &str = "\
Report fields:
  total_claims           Claims filed between --from and --to, both days included
  total_approved_amount  Sum of claim amounts for approved claims in that range

Caching:
  Each date range is cached for 10 minutes. Claims approved during that
  window show up once the cached result expires.
";

#[derive(Debug, Parser)]
#[command(
    name = "rebate",
    version,
    about = "rebate program, transaction, and claim ledger",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage rebate programs
    #[command(arg_required_else_help = true)]
    Program {
        #[command(subcommand)]
        command: ProgramCommand,
    },
    /// Record and inspect purchase transactions
    #[command(arg_required_else_help = true)]
    Transaction {
        #[command(subcommand)]
        command: TransactionCommand,
    },
    /// Show the rebate a transaction earns today
    Calculate {
        /// The transaction ID to price
        transaction_id: String,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// File and review rebate claims
    #[command(arg_required_else_help = true)]
    Claim {
        #[command(subcommand)]
        command: ClaimCommand,
    },
    /// Summarize claims filed in a date range
    #[command(after_long_help = REPORT_AFTER_HELP)]
    Report {
        /// First claim date to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        from: IsoDate,
        /// Last claim date to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        to: IsoDate,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProgramCommand {
    /// Create a rebate program
    Create {
        /// Unique program name
        #[arg(long)]
        name: String,
        /// Rebate percentage between 0 and 100, at most 2 decimal places
        #[arg(long)]
        percentage: String,
        /// First day of the program (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        start: IsoDate,
        /// Last day of the program (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        end: IsoDate,
        /// Free-text eligibility notes
        #[arg(long)]
        eligibility: Option<String>,
        /// Create the program switched off
        #[arg(long)]
        inactive: bool,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Change fields on an existing program
    Update {
        /// The program ID to change (e.g. prg_01J...)
        program_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        percentage: Option<String>,
        #[arg(long, value_parser = parse_iso_date)]
        start: Option<IsoDate>,
        #[arg(long, value_parser = parse_iso_date)]
        end: Option<IsoDate>,
        #[arg(long, conflicts_with = "clear_eligibility")]
        eligibility: Option<String>,
        /// Remove the eligibility notes
        #[arg(long)]
        clear_eligibility: bool,
        /// Switch the program on or off (true/false)
        #[arg(long)]
        active: Option<bool>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Delete a program; linked transactions keep existing without it
    Delete {
        /// The program ID to delete
        program_id: String,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// List programs, newest start date first
    List {
        /// Only show active programs
        #[arg(long)]
        active_only: bool,
        /// Case-insensitive match on name or eligibility notes
        #[arg(long)]
        search: Option<String>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum TransactionCommand {
    /// Record a transaction, optionally linked to a program
    Submit {
        /// Caller-chosen unique transaction ID
        transaction_id: String,
        /// Purchase amount, at most 2 decimal places
        #[arg(long)]
        amount: String,
        /// RFC 3339 timestamp or YYYY-MM-DD (midnight UTC)
        #[arg(long)]
        date: String,
        /// Program ID to link; the date must fall inside its window
        #[arg(long)]
        program: Option<String>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Change fields on an existing transaction
    Update {
        /// The transaction ID to change
        transaction_id: String,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, conflicts_with = "detach_program")]
        program: Option<String>,
        /// Remove the program link
        #[arg(long)]
        detach_program: bool,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Show one transaction with the rebate it earns today
    Show {
        transaction_id: String,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// List transactions, newest first
    List {
        /// Only show transactions linked to this program
        #[arg(long)]
        program: Option<String>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Delete a transaction and its claim
    Delete {
        transaction_id: String,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ClaimCommand {
    /// File a rebate claim for a transaction
    #[command(after_long_help = CLAIM_CREATE_AFTER_HELP)]
    Create {
        /// The transaction to claim against
        transaction_id: String,
        /// Optional external claim reference
        #[arg(long)]
        claim_id: Option<String>,
        /// Claim amount; omit or pass 0 to use the calculated rebate
        #[arg(long)]
        amount: Option<String>,
        #[arg(long, value_parser = CLAIM_STATUSES)]
        status: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Change status, notes, or the transaction of a claim
    Update {
        /// The claim ref to change (e.g. clm_01J...)
        claim_ref: String,
        /// Move the claim to another transaction
        #[arg(long)]
        transaction: Option<String>,
        #[arg(long, conflicts_with = "clear_claim_id")]
        claim_id: Option<String>,
        #[arg(long)]
        clear_claim_id: bool,
        #[arg(long, value_parser = CLAIM_STATUSES)]
        status: Option<String>,
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        #[arg(long)]
        clear_notes: bool,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// List claims, newest first
    List {
        #[arg(long, value_parser = CLAIM_STATUSES)]
        status: Option<String>,
        /// Case-insensitive match on claim ID or transaction ID
        #[arg(long)]
        search: Option<String>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    pub fn json_requested(&self) -> bool {
        match self {
            Commands::Program { command } => match command {
                ProgramCommand::Create { json, .. }
                | ProgramCommand::Update { json, .. }
                | ProgramCommand::Delete { json, .. }
                | ProgramCommand::List { json, .. } => *json,
            },
            Commands::Transaction { command } => match command {
                TransactionCommand::Submit { json, .. }
                | TransactionCommand::Update { json, .. }
                | TransactionCommand::Show { json, .. }
                | TransactionCommand::List { json, .. }
                | TransactionCommand::Delete { json, .. } => *json,
            },
            Commands::Claim { command } => match command {
                ClaimCommand::Create { json, .. }
                | ClaimCommand::Update { json, .. }
                | ClaimCommand::List { json, .. } => *json,
            },
            Commands::Calculate { json, .. } | Commands::Report { json, .. } => *json,
        }
    }
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}
