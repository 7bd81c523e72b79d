//! Store-backed rebate operations.
//!
//! Every write opens one `IMMEDIATE` transaction, runs its checks against
//! that transaction, and commits only when all of them pass. Callers hand in
//! an open connection (see [`crate::state::open_connection`]) and a clock.

pub mod claims;
pub mod programs;
pub mod report;
pub mod transactions;

use std::path::Path;

use rusqlite::{Connection, Row, Transaction as SqliteTransaction, TransactionBehavior};

use crate::ClientResult;
use crate::contracts::types::{ClaimStatus, RebateClaim, RebateProgram, Transaction};
use crate::dates::{date_from_column, timestamp_from_column};
use crate::money::decimal_from_column;
use crate::state::map_sqlite_error;

pub(crate) const PROGRAM_COLUMNS: &str = "program_id, program_name, rebate_percentage, start_date, end_date, eligibility_criteria, is_active";
pub(crate) const TRANSACTION_COLUMNS: &str =
    "transaction_id, amount, transaction_date, rebate_program_id";
pub(crate) const CLAIM_COLUMNS: &str =
    "claim_ref, claim_id, transaction_id, claim_amount, claim_status, claim_date, notes";

pub(crate) fn begin_write<'c>(
    connection: &'c mut Connection,
    db_path: &Path,
) -> ClientResult<SqliteTransaction<'c>> {
    connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|error| map_sqlite_error(db_path, &error))
}

pub(crate) fn commit(transaction: SqliteTransaction<'_>, db_path: &Path) -> ClientResult<()> {
    transaction
        .commit()
        .map_err(|error| map_sqlite_error(db_path, &error))
}

pub(crate) fn program_from_row(row: &Row<'_>) -> rusqlite::Result<RebateProgram> {
    let percentage = row.get::<_, String>(2)?;
    let start_date = row.get::<_, String>(3)?;
    let end_date = row.get::<_, String>(4)?;
    Ok(RebateProgram {
        program_id: row.get(0)?,
        program_name: row.get(1)?,
        rebate_percentage: decimal_from_column(&percentage, 2)?,
        start_date: date_from_column(&start_date, 3)?,
        end_date: date_from_column(&end_date, 4)?,
        eligibility_criteria: row.get(5)?,
        is_active: row.get(6)?,
    })
}

pub(crate) fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let amount = row.get::<_, String>(1)?;
    let transaction_date = row.get::<_, String>(2)?;
    Ok(Transaction {
        transaction_id: row.get(0)?,
        amount: decimal_from_column(&amount, 1)?,
        transaction_date: timestamp_from_column(&transaction_date, 2)?,
        rebate_program_id: row.get(3)?,
    })
}

pub(crate) fn claim_from_row(row: &Row<'_>) -> rusqlite::Result<RebateClaim> {
    let amount = row.get::<_, String>(3)?;
    let status = row.get::<_, String>(4)?;
    let claim_date = row.get::<_, String>(5)?;
    let claim_status = ClaimStatus::parse(&status).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(error))
    })?;
    Ok(RebateClaim {
        claim_ref: row.get(0)?,
        claim_id: row.get(1)?,
        transaction_id: row.get(2)?,
        claim_amount: decimal_from_column(&amount, 3)?,
        claim_status,
        claim_date: timestamp_from_column(&claim_date, 5)?,
        notes: row.get(6)?,
    })
}

/// Case-insensitive substring pattern for `LIKE ... ESCAPE '\'`. User text
/// is matched literally, so `%` and `_` are escaped rather than wildcards.
pub(crate) fn substring_pattern(search: Option<&str>) -> Option<String> {
    let needle = search.map(str::trim).filter(|value| !value.is_empty())?;
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    Some(pattern)
}

/// Trims optional free text and folds blank input to `None`.
pub(crate) fn clean_optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
