use std::path::Path;

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::clock::Clock;
use crate::contracts::types::{RebateProgram, Transaction, TransactionDeletion};
use crate::dates::{format_iso_date, format_timestamp};
use crate::ledger::programs::load_program;
use crate::ledger::{TRANSACTION_COLUMNS, begin_write, commit, transaction_from_row};
use crate::money::{AMOUNT_MAX_DIGITS, check_money};
use crate::state::{key_conflict, map_sqlite_error};
use crate::{ClientError, ClientResult};

const TRANSACTION_ID_MAX_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct TransactionFields {
    pub transaction_id: String,
    pub amount: Decimal,
    pub transaction_date: DateTime<Utc>,
    pub rebate_program_id: Option<String>,
}

/// Partial edit of a transaction. `rebate_program_id: Some(None)` detaches
/// the program.
#[derive(Debug, Clone, Default)]
pub struct TransactionChanges {
    pub amount: Option<Decimal>,
    pub transaction_date: Option<DateTime<Utc>>,
    pub rebate_program_id: Option<Option<String>>,
}

pub fn submit_transaction(
    connection: &mut Connection,
    db_path: &Path,
    clock: &dyn Clock,
    fields: TransactionFields,
) -> ClientResult<Transaction> {
    let transaction_id = fields.transaction_id.trim().to_string();
    validate_transaction_id(&transaction_id)?;
    let record = Transaction {
        transaction_id,
        amount: check_money("amount", fields.amount, AMOUNT_MAX_DIGITS)?,
        transaction_date: fields.transaction_date.trunc_subsecs(0),
        rebate_program_id: fields.rebate_program_id,
    };
    let timestamp = format_timestamp(&clock.now());

    let transaction = begin_write(connection, db_path)?;
    if load_transaction(&transaction, db_path, &record.transaction_id)?.is_some() {
        tracing::warn!(transaction_id = %record.transaction_id, "rejected duplicate transaction id");
        return Err(duplicate_transaction_error(&record.transaction_id));
    }
    check_program_window(&transaction, db_path, &record)?;

    transaction
        .execute(
            "INSERT INTO internal_transactions (
                transaction_id,
                amount,
                transaction_date,
                rebate_program_id,
                created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &record.transaction_id,
                record.amount.to_string(),
                format_timestamp(&record.transaction_date),
                &record.rebate_program_id,
                &timestamp
            ],
        )
        .map_err(|error| {
            if key_conflict(&error).is_some() {
                return duplicate_transaction_error(&record.transaction_id);
            }
            map_sqlite_error(db_path, &error)
        })?;
    commit(transaction, db_path)?;

    tracing::info!(
        transaction_id = %record.transaction_id,
        program_id = ?record.rebate_program_id,
        "submitted transaction"
    );
    Ok(record)
}

/// Applies `changes`. The program window is checked again whenever the
/// program link or the date changes; an amount-only edit keeps whatever link
/// the transaction already has.
pub fn update_transaction(
    connection: &mut Connection,
    db_path: &Path,
    transaction_id: &str,
    changes: TransactionChanges,
) -> ClientResult<Transaction> {
    let transaction = begin_write(connection, db_path)?;
    let Some(current) = load_transaction(&transaction, db_path, transaction_id)? else {
        return Err(ClientError::transaction_not_found(transaction_id));
    };

    let revalidate = changes.transaction_date.is_some() || changes.rebate_program_id.is_some();
    let updated = Transaction {
        transaction_id: current.transaction_id,
        amount: match changes.amount {
            Some(amount) => check_money("amount", amount, AMOUNT_MAX_DIGITS)?,
            None => current.amount,
        },
        transaction_date: changes
            .transaction_date
            .map(|value| value.trunc_subsecs(0))
            .unwrap_or(current.transaction_date),
        rebate_program_id: changes
            .rebate_program_id
            .unwrap_or(current.rebate_program_id),
    };
    if revalidate {
        check_program_window(&transaction, db_path, &updated)?;
    }

    transaction
        .execute(
            "UPDATE internal_transactions
             SET amount = ?2, transaction_date = ?3, rebate_program_id = ?4
             WHERE transaction_id = ?1",
            params![
                &updated.transaction_id,
                updated.amount.to_string(),
                format_timestamp(&updated.transaction_date),
                &updated.rebate_program_id
            ],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    commit(transaction, db_path)?;

    tracing::info!(transaction_id = %updated.transaction_id, "updated transaction");
    Ok(updated)
}

/// Removes a transaction; its claim, if any, goes with it.
pub fn delete_transaction(
    connection: &mut Connection,
    db_path: &Path,
    transaction_id: &str,
) -> ClientResult<TransactionDeletion> {
    let transaction = begin_write(connection, db_path)?;
    if load_transaction(&transaction, db_path, transaction_id)?.is_none() {
        return Err(ClientError::transaction_not_found(transaction_id));
    }

    let claims_removed = transaction
        .query_row(
            "SELECT COUNT(*) FROM internal_claims WHERE transaction_id = ?1",
            params![transaction_id],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    transaction
        .execute(
            "DELETE FROM internal_transactions WHERE transaction_id = ?1",
            params![transaction_id],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    commit(transaction, db_path)?;

    tracing::info!(transaction_id, claims_removed, "deleted transaction");
    Ok(TransactionDeletion {
        transaction_id: transaction_id.to_string(),
        claims_removed,
    })
}

pub fn load_transaction(
    connection: &Connection,
    db_path: &Path,
    transaction_id: &str,
) -> ClientResult<Option<Transaction>> {
    connection
        .query_row(
            &format!(
                "SELECT {TRANSACTION_COLUMNS} FROM internal_transactions WHERE transaction_id = ?1"
            ),
            params![transaction_id],
            transaction_from_row,
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))
}

/// The transaction together with its linked program, if the link is set and
/// the program still exists.
pub fn load_transaction_with_program(
    connection: &Connection,
    db_path: &Path,
    transaction_id: &str,
) -> ClientResult<(Transaction, Option<RebateProgram>)> {
    let Some(record) = load_transaction(connection, db_path, transaction_id)? else {
        return Err(ClientError::transaction_not_found(transaction_id));
    };
    let program = match record.rebate_program_id.as_deref() {
        Some(program_id) => load_program(connection, db_path, program_id)?,
        None => None,
    };
    Ok((record, program))
}

pub fn list_transactions(
    connection: &Connection,
    db_path: &Path,
    program_id: Option<&str>,
) -> ClientResult<Vec<Transaction>> {
    let mut statement = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS}
             FROM internal_transactions
             WHERE (?1 IS NULL OR rebate_program_id = ?1)
             ORDER BY transaction_date DESC, transaction_id ASC"
        ))
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let rows_iter = statement
        .query_map(params![program_id], transaction_from_row)
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        rows.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    Ok(rows)
}

fn check_program_window(
    connection: &Connection,
    db_path: &Path,
    record: &Transaction,
) -> ClientResult<()> {
    let Some(program_id) = record.rebate_program_id.as_deref() else {
        return Ok(());
    };
    let Some(program) = load_program(connection, db_path, program_id)? else {
        return Err(ClientError::program_not_found(program_id));
    };

    let date = record.calendar_date();
    if !program.covers(date) {
        tracing::warn!(
            transaction_id = %record.transaction_id,
            program_id,
            "rejected transaction outside program window"
        );
        return Err(ClientError::date_outside_program_window(
            &format_iso_date(&date),
            program_id,
            &format_iso_date(&program.start_date),
            &format_iso_date(&program.end_date),
        ));
    }
    Ok(())
}

fn validate_transaction_id(transaction_id: &str) -> ClientResult<()> {
    if transaction_id.is_empty() {
        return Err(ClientError::validation(
            "transaction_id",
            "`transaction_id` must not be empty.",
        ));
    }
    if transaction_id.chars().count() > TRANSACTION_ID_MAX_CHARS {
        return Err(ClientError::validation(
            "transaction_id",
            &format!("`transaction_id` must be at most {TRANSACTION_ID_MAX_CHARS} characters."),
        ));
    }
    Ok(())
}

fn duplicate_transaction_error(transaction_id: &str) -> ClientError {
    ClientError::validation(
        "transaction_id",
        &format!("A transaction with id `{transaction_id}` already exists."),
    )
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{
        TransactionChanges, TransactionFields, delete_transaction, list_transactions,
        load_transaction, submit_transaction, update_transaction,
    };
    use crate::clock::ManualClock;
    use crate::contracts::types::RebateProgram;
    use crate::ledger::programs::{ProgramFields, create_program, delete_program};
    use crate::ledger::testkit::{TestStore, open_test_store};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
    }

    fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn decimal(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap_or_default()
    }

    fn spring_sale(store: &mut TestStore, clock: &ManualClock) -> Option<RebateProgram> {
        create_program(
            &mut store.connection,
            &store.db_path,
            clock,
            ProgramFields {
                program_name: "SpringSale".to_string(),
                rebate_percentage: decimal("10.00"),
                start_date: date(2024, 1, 1),
                end_date: date(2024, 1, 31),
                eligibility_criteria: None,
                is_active: true,
            },
        )
        .ok()
    }

    fn fields(id: &str, when: DateTime<Utc>, program_id: Option<&str>) -> TransactionFields {
        TransactionFields {
            transaction_id: id.to_string(),
            amount: decimal("200.00"),
            transaction_date: when,
            rebate_program_id: program_id.map(str::to_string),
        }
    }

    #[test]
    fn transaction_outside_window_is_rejected_but_accepted_without_program() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 1));
            let program = spring_sale(&mut store, &clock);
            assert!(program.is_some());
            if let Some(program) = program {
                let outside = submit_transaction(
                    &mut store.connection,
                    &store.db_path,
                    &clock,
                    fields("T2", at(2024, 2, 1, 9), Some(&program.program_id)),
                );
                assert!(matches!(outside, Err(ref error) if error.code == "validation_error"));
                let stored = load_transaction(&store.connection, &store.db_path, "T2");
                assert!(matches!(stored, Ok(None)));

                let unlinked = submit_transaction(
                    &mut store.connection,
                    &store.db_path,
                    &clock,
                    fields("T2", at(2024, 2, 1, 9), None),
                );
                assert!(unlinked.is_ok());
            }
        }
    }

    #[test]
    fn window_check_uses_calendar_date_of_timestamp() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 1));
            let program = spring_sale(&mut store, &clock);
            assert!(program.is_some());
            if let Some(program) = program {
                let late_on_last_day = submit_transaction(
                    &mut store.connection,
                    &store.db_path,
                    &clock,
                    fields("T-late", at(2024, 1, 31, 23), Some(&program.program_id)),
                );
                assert!(late_on_last_day.is_ok());
            }
        }
    }

    #[test]
    fn unknown_program_and_duplicate_id_are_rejected() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 1));
            let missing = submit_transaction(
                &mut store.connection,
                &store.db_path,
                &clock,
                fields("T1", at(2024, 1, 15, 9), Some("prg_missing")),
            );
            assert!(matches!(missing, Err(ref error) if error.code == "not_found"));

            let first = submit_transaction(
                &mut store.connection,
                &store.db_path,
                &clock,
                fields("T1", at(2024, 1, 15, 9), None),
            );
            assert!(first.is_ok());
            let second = submit_transaction(
                &mut store.connection,
                &store.db_path,
                &clock,
                fields("T1", at(2024, 1, 16, 9), None),
            );
            assert!(matches!(second, Err(ref error) if error.code == "validation_error"));
        }
    }

    #[test]
    fn update_revalidates_only_when_date_or_link_changes() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 1));
            let program = spring_sale(&mut store, &clock);
            assert!(program.is_some());
            if let Some(program) = program {
                let submitted = submit_transaction(
                    &mut store.connection,
                    &store.db_path,
                    &clock,
                    fields("T1", at(2024, 1, 15, 9), Some(&program.program_id)),
                );
                assert!(submitted.is_ok());

                let moved_out = update_transaction(
                    &mut store.connection,
                    &store.db_path,
                    "T1",
                    TransactionChanges {
                        transaction_date: Some(at(2024, 3, 1, 9)),
                        ..TransactionChanges::default()
                    },
                );
                assert!(matches!(moved_out, Err(ref error) if error.code == "validation_error"));

                let detached_and_moved = update_transaction(
                    &mut store.connection,
                    &store.db_path,
                    "T1",
                    TransactionChanges {
                        transaction_date: Some(at(2024, 3, 1, 9)),
                        rebate_program_id: Some(None),
                        ..TransactionChanges::default()
                    },
                );
                assert!(
                    matches!(detached_and_moved, Ok(ref record) if record.rebate_program_id.is_none())
                );

                let amount_only = update_transaction(
                    &mut store.connection,
                    &store.db_path,
                    "T1",
                    TransactionChanges {
                        amount: Some(decimal("250")),
                        ..TransactionChanges::default()
                    },
                );
                assert!(
                    matches!(amount_only, Ok(ref record) if record.amount.to_string() == "250.00")
                );
            }
        }
    }

    #[test]
    fn deleting_program_clears_reference_and_keeps_transaction() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 1));
            let program = spring_sale(&mut store, &clock);
            assert!(program.is_some());
            if let Some(program) = program {
                assert!(
                    submit_transaction(
                        &mut store.connection,
                        &store.db_path,
                        &clock,
                        fields("T1", at(2024, 1, 15, 9), Some(&program.program_id)),
                    )
                    .is_ok()
                );

                let deleted =
                    delete_program(&mut store.connection, &store.db_path, &program.program_id);
                assert!(matches!(deleted, Ok(ref summary) if summary.detached_transactions == 1));

                let stored = load_transaction(&store.connection, &store.db_path, "T1");
                assert!(
                    matches!(stored, Ok(Some(ref record)) if record.rebate_program_id.is_none())
                );
            }
        }
    }

    #[test]
    fn list_and_delete_transactions() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 1));
            for (id, day) in [("T1", 10), ("T2", 20)] {
                let submitted = submit_transaction(
                    &mut store.connection,
                    &store.db_path,
                    &clock,
                    fields(id, at(2024, 1, day, 9), None),
                );
                assert!(submitted.is_ok());
            }

            let listed = list_transactions(&store.connection, &store.db_path, None);
            assert!(
                matches!(listed, Ok(ref rows) if rows.len() == 2 && rows[0].transaction_id == "T2")
            );

            let deleted = delete_transaction(&mut store.connection, &store.db_path, "T1");
            assert!(matches!(deleted, Ok(ref summary) if summary.claims_removed == 0));
            let missing = delete_transaction(&mut store.connection, &store.db_path, "T1");
            assert!(matches!(missing, Err(ref error) if error.code == "not_found"));
        }
    }
}
