use std::path::{Path, PathBuf};

use chrono::{NaiveDate, TimeZone, Utc};
use rebate_client::clock::ManualClock;
use rebate_client::commands::claim::{self, ClaimCreateInput};
use rebate_client::commands::program::{self, ProgramCreateInput};
use rebate_client::commands::transaction::{self, TransactionSubmitInput};
use rebate_client::{ClientResult, CommandContext, SuccessEnvelope};
use serde_json::Value;
use tempfile::{TempDir, tempdir};

pub fn temp_home() -> std::io::Result<(TempDir, PathBuf)> {
    let dir = tempdir()?;
    let home = dir.path().join("rebate-home");
    Ok((dir, home))
}

pub fn clock_at(year: i32, month: u32, day: u32) -> ManualClock {
    let date = NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN);
    ManualClock::at_date(date)
}

pub fn clock_at_time(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> ManualClock {
    let now = Utc
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default();
    ManualClock::new(now)
}

pub fn context<'a>(home: &'a Path, clock: &'a ManualClock) -> CommandContext<'a> {
    CommandContext::at_home(home).with_clock(clock)
}

pub fn data(result: ClientResult<SuccessEnvelope>) -> Value {
    assert!(result.is_ok());
    match result {
        Ok(envelope) => envelope.data,
        Err(_) => Value::Null,
    }
}

pub fn error_code(result: ClientResult<SuccessEnvelope>) -> String {
    assert!(result.is_err());
    match result {
        Err(error) => error.code,
        Ok(_) => String::new(),
    }
}

pub fn program_input(name: &str, percentage: &str, start: &str, end: &str) -> ProgramCreateInput {
    ProgramCreateInput {
        program_name: name.to_string(),
        rebate_percentage: percentage.to_string(),
        start_date: start.to_string(),
        end_date: end.to_string(),
        eligibility_criteria: None,
        is_active: true,
    }
}

/// Creates a program and returns its generated id.
pub fn seed_program(
    context: &CommandContext<'_>,
    name: &str,
    percentage: &str,
    start: &str,
    end: &str,
) -> String {
    let created = data(program::create_with_context(
        program_input(name, percentage, start, end),
        context,
    ));
    created["program_id"].as_str().unwrap_or_default().to_string()
}

pub fn seed_transaction(
    context: &CommandContext<'_>,
    transaction_id: &str,
    amount: &str,
    transaction_date: &str,
    program_id: Option<&str>,
) -> Value {
    data(transaction::submit_with_context(
        TransactionSubmitInput {
            transaction_id: transaction_id.to_string(),
            amount: amount.to_string(),
            transaction_date: transaction_date.to_string(),
            rebate_program_id: program_id.map(str::to_string),
        },
        context,
    ))
}

/// Files a claim and returns its `claim_ref`.
pub fn seed_claim(
    context: &CommandContext<'_>,
    transaction_id: &str,
    claim_amount: Option<&str>,
    claim_status: Option<&str>,
) -> String {
    let created = data(claim::create_with_context(
        ClaimCreateInput {
            transaction_id: transaction_id.to_string(),
            claim_amount: claim_amount.map(str::to_string),
            claim_status: claim_status.map(str::to_string),
            ..ClaimCreateInput::default()
        },
        context,
    ));
    created["claim_ref"].as_str().unwrap_or_default().to_string()
}
