use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::clock::Clock;
use crate::contracts::types::{ProgramDeletion, RebateProgram};
use crate::dates::{format_iso_date, format_timestamp};
use crate::ledger::{
    PROGRAM_COLUMNS, begin_write, clean_optional_text, commit, program_from_row, substring_pattern,
};
use crate::money::{PERCENTAGE_MAX_DIGITS, check_money};
use crate::state::{KeyConflict, key_conflict, map_sqlite_error};
use crate::{ClientError, ClientResult};

const PROGRAM_NAME_MAX_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct ProgramFields {
    pub program_name: String,
    pub rebate_percentage: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub eligibility_criteria: Option<String>,
    pub is_active: bool,
}

/// Partial edit of a program. `eligibility_criteria: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ProgramChanges {
    pub program_name: Option<String>,
    pub rebate_percentage: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub eligibility_criteria: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ProgramFilter {
    pub active_only: bool,
    pub search: Option<String>,
}

pub fn create_program(
    connection: &mut Connection,
    db_path: &Path,
    clock: &dyn Clock,
    fields: ProgramFields,
) -> ClientResult<RebateProgram> {
    let program = RebateProgram {
        program_id: format!("prg_{}", Ulid::new()),
        program_name: fields.program_name.trim().to_string(),
        rebate_percentage: fields.rebate_percentage,
        start_date: fields.start_date,
        end_date: fields.end_date,
        eligibility_criteria: clean_optional_text(fields.eligibility_criteria),
        is_active: fields.is_active,
    };
    let program = validate_program(program)?;
    let timestamp = format_timestamp(&clock.now());

    let transaction = begin_write(connection, db_path)?;
    ensure_name_available(&transaction, db_path, &program.program_name, None)?;
    transaction
        .execute(
            "INSERT INTO internal_programs (
                program_id,
                program_name,
                rebate_percentage,
                start_date,
                end_date,
                eligibility_criteria,
                is_active,
                created_at,
                updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                &program.program_id,
                &program.program_name,
                program.rebate_percentage.to_string(),
                format_iso_date(&program.start_date),
                format_iso_date(&program.end_date),
                &program.eligibility_criteria,
                program.is_active,
                &timestamp
            ],
        )
        .map_err(|error| map_program_write_error(db_path, &error, &program.program_name))?;
    commit(transaction, db_path)?;

    tracing::info!(
        program_id = %program.program_id,
        program_name = %program.program_name,
        "created rebate program"
    );
    Ok(program)
}

/// Applies `changes` to an existing program. Transactions already linked to
/// it are not re-validated and existing claim amounts stay as they were.
pub fn update_program(
    connection: &mut Connection,
    db_path: &Path,
    clock: &dyn Clock,
    program_id: &str,
    changes: ProgramChanges,
) -> ClientResult<RebateProgram> {
    let timestamp = format_timestamp(&clock.now());
    let transaction = begin_write(connection, db_path)?;

    let Some(current) = load_program(&transaction, db_path, program_id)? else {
        return Err(ClientError::program_not_found(program_id));
    };

    let updated = RebateProgram {
        program_id: current.program_id,
        program_name: changes
            .program_name
            .map(|name| name.trim().to_string())
            .unwrap_or(current.program_name),
        rebate_percentage: changes
            .rebate_percentage
            .unwrap_or(current.rebate_percentage),
        start_date: changes.start_date.unwrap_or(current.start_date),
        end_date: changes.end_date.unwrap_or(current.end_date),
        eligibility_criteria: match changes.eligibility_criteria {
            Some(value) => clean_optional_text(value),
            None => current.eligibility_criteria,
        },
        is_active: changes.is_active.unwrap_or(current.is_active),
    };
    let updated = validate_program(updated)?;
    ensure_name_available(
        &transaction,
        db_path,
        &updated.program_name,
        Some(&updated.program_id),
    )?;

    transaction
        .execute(
            "UPDATE internal_programs
             SET program_name = ?2,
                 rebate_percentage = ?3,
                 start_date = ?4,
                 end_date = ?5,
                 eligibility_criteria = ?6,
                 is_active = ?7,
                 updated_at = ?8
             WHERE program_id = ?1",
            params![
                &updated.program_id,
                &updated.program_name,
                updated.rebate_percentage.to_string(),
                format_iso_date(&updated.start_date),
                format_iso_date(&updated.end_date),
                &updated.eligibility_criteria,
                updated.is_active,
                &timestamp
            ],
        )
        .map_err(|error| map_program_write_error(db_path, &error, &updated.program_name))?;
    commit(transaction, db_path)?;

    tracing::info!(program_id = %updated.program_id, "updated rebate program");
    Ok(updated)
}

/// Removes a program. Linked transactions survive with their program
/// reference cleared by the schema's `ON DELETE SET NULL`.
pub fn delete_program(
    connection: &mut Connection,
    db_path: &Path,
    program_id: &str,
) -> ClientResult<ProgramDeletion> {
    let transaction = begin_write(connection, db_path)?;

    if load_program(&transaction, db_path, program_id)?.is_none() {
        return Err(ClientError::program_not_found(program_id));
    }

    let detached_transactions = transaction
        .query_row(
            "SELECT COUNT(*) FROM internal_transactions WHERE rebate_program_id = ?1",
            params![program_id],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    transaction
        .execute(
            "DELETE FROM internal_programs WHERE program_id = ?1",
            params![program_id],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    commit(transaction, db_path)?;

    tracing::info!(program_id, detached_transactions, "deleted rebate program");
    Ok(ProgramDeletion {
        program_id: program_id.to_string(),
        detached_transactions,
    })
}

pub fn load_program(
    connection: &Connection,
    db_path: &Path,
    program_id: &str,
) -> ClientResult<Option<RebateProgram>> {
    connection
        .query_row(
            &format!("SELECT {PROGRAM_COLUMNS} FROM internal_programs WHERE program_id = ?1"),
            params![program_id],
            program_from_row,
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))
}

pub fn list_programs(
    connection: &Connection,
    db_path: &Path,
    filter: &ProgramFilter,
) -> ClientResult<Vec<RebateProgram>> {
    let search = substring_pattern(filter.search.as_deref());

    let mut statement = connection
        .prepare(&format!(
            "SELECT {PROGRAM_COLUMNS}
             FROM internal_programs
             WHERE (?1 = 0 OR is_active = 1)
               AND (?2 IS NULL
                    OR lower(program_name) LIKE ?2 ESCAPE '\\'
                    OR lower(COALESCE(eligibility_criteria, '')) LIKE ?2 ESCAPE '\\')
             ORDER BY start_date DESC, program_name ASC"
        ))
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let rows_iter = statement
        .query_map(params![filter.active_only, search], program_from_row)
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        rows.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    Ok(rows)
}

fn validate_program(program: RebateProgram) -> ClientResult<RebateProgram> {
    if program.program_name.is_empty() {
        return Err(ClientError::validation(
            "program_name",
            "`program_name` must not be empty.",
        ));
    }
    if program.program_name.chars().count() > PROGRAM_NAME_MAX_CHARS {
        return Err(ClientError::validation(
            "program_name",
            &format!("`program_name` must be at most {PROGRAM_NAME_MAX_CHARS} characters."),
        ));
    }

    let percentage = check_money(
        "rebate_percentage",
        program.rebate_percentage,
        PERCENTAGE_MAX_DIGITS,
    )?;
    if percentage > Decimal::ONE_HUNDRED {
        return Err(ClientError::validation(
            "rebate_percentage",
            "`rebate_percentage` must be between 0 and 100.",
        ));
    }

    if program.end_date < program.start_date {
        return Err(ClientError::validation(
            "end_date",
            "`end_date` must be on or after `start_date`.",
        ));
    }

    Ok(RebateProgram {
        rebate_percentage: percentage,
        ..program
    })
}

fn ensure_name_available(
    connection: &Connection,
    db_path: &Path,
    program_name: &str,
    exclude_program_id: Option<&str>,
) -> ClientResult<()> {
    let existing = connection
        .query_row(
            "SELECT program_id FROM internal_programs
             WHERE program_name = ?1 AND (?2 IS NULL OR program_id <> ?2)
             LIMIT 1",
            params![program_name, exclude_program_id],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    if existing.is_some() {
        tracing::warn!(program_name, "rejected duplicate program name");
        return Err(duplicate_name_error(program_name));
    }
    Ok(())
}

fn map_program_write_error(
    db_path: &Path,
    error: &rusqlite::Error,
    program_name: &str,
) -> ClientError {
    if key_conflict(error) == Some(KeyConflict::Unique) {
        return duplicate_name_error(program_name);
    }
    map_sqlite_error(db_path, error)
}

fn duplicate_name_error(program_name: &str) -> ClientError {
    ClientError::validation(
        "program_name",
        &format!("A rebate program named `{program_name}` already exists."),
    )
}
