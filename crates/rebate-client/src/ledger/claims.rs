use std::path::Path;

use chrono::SubsecRound;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::calculator::calculate_rebate;
use crate::clock::Clock;
use crate::contracts::types::{ClaimStatus, RebateClaim};
use crate::dates::format_timestamp;
use crate::ledger::transactions::{load_transaction, load_transaction_with_program};
use crate::ledger::{
    CLAIM_COLUMNS, begin_write, claim_from_row, clean_optional_text, commit, substring_pattern,
};
use crate::money::{AMOUNT_MAX_DIGITS, check_money};
use crate::state::{KeyConflict, key_conflict, map_sqlite_error};
use crate::{ClientError, ClientResult};

const CLAIM_ID_MAX_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct ClaimFields {
    pub transaction_id: String,
    pub claim_id: Option<String>,
    /// Absent or zero means "compute from the transaction's program".
    pub claim_amount: Option<Decimal>,
    pub claim_status: Option<ClaimStatus>,
    pub notes: Option<String>,
}

/// Partial edit of a claim. The amount and claim date are fixed at creation
/// and cannot be changed here.
#[derive(Debug, Clone, Default)]
pub struct ClaimChanges {
    pub transaction_id: Option<String>,
    pub claim_id: Option<Option<String>>,
    pub claim_status: Option<ClaimStatus>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ClaimFilter {
    pub claim_status: Option<ClaimStatus>,
    pub search: Option<String>,
}

/// Files a claim against an existing transaction.
///
/// The transaction lookup, duplicate check, amount calculation and insert all
/// happen inside one immediate transaction, so two concurrent submissions for
/// the same transaction cannot both pass the duplicate check.
pub fn claim_rebate(
    connection: &mut Connection,
    db_path: &Path,
    clock: &dyn Clock,
    fields: ClaimFields,
) -> ClientResult<RebateClaim> {
    let transaction_id = fields.transaction_id.trim().to_string();
    let claim_id = validate_claim_id(fields.claim_id)?;
    let supplied_amount = match fields.claim_amount {
        Some(amount) => Some(check_money("claim_amount", amount, AMOUNT_MAX_DIGITS)?),
        None => None,
    };

    let transaction = begin_write(connection, db_path)?;
    let (record, program) = load_transaction_with_program(&transaction, db_path, &transaction_id)?;
    ensure_no_other_claim(&transaction, db_path, &transaction_id, None)?;

    let claim_amount = match supplied_amount {
        Some(amount) if !amount.is_zero() => amount,
        _ => calculate_rebate(&record, program.as_ref(), clock),
    };
    let claim = RebateClaim {
        claim_ref: format!("clm_{}", Ulid::new()),
        claim_id,
        transaction_id,
        claim_amount,
        claim_status: fields.claim_status.unwrap_or(ClaimStatus::Pending),
        claim_date: clock.now().trunc_subsecs(0),
        notes: clean_optional_text(fields.notes),
    };

    transaction
        .execute(
            "INSERT INTO internal_claims (
                claim_ref,
                claim_id,
                transaction_id,
                claim_amount,
                claim_status,
                claim_date,
                notes
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &claim.claim_ref,
                &claim.claim_id,
                &claim.transaction_id,
                claim.claim_amount.to_string(),
                claim.claim_status.as_str(),
                format_timestamp(&claim.claim_date),
                &claim.notes
            ],
        )
        .map_err(|error| map_claim_write_error(db_path, &error, &claim.transaction_id))?;
    commit(transaction, db_path)?;

    tracing::info!(
        claim_ref = %claim.claim_ref,
        transaction_id = %claim.transaction_id,
        claim_amount = %claim.claim_amount,
        "created rebate claim"
    );
    Ok(claim)
}

pub fn update_claim(
    connection: &mut Connection,
    db_path: &Path,
    claim_ref: &str,
    changes: ClaimChanges,
) -> ClientResult<RebateClaim> {
    let claim_id_change = match changes.claim_id {
        Some(value) => Some(validate_claim_id(value)?),
        None => None,
    };

    let transaction = begin_write(connection, db_path)?;
    let Some(current) = load_claim(&transaction, db_path, claim_ref)? else {
        return Err(ClientError::claim_not_found(claim_ref));
    };

    let transaction_id = match changes.transaction_id {
        Some(target) => {
            let target = target.trim().to_string();
            if load_transaction(&transaction, db_path, &target)?.is_none() {
                return Err(ClientError::transaction_not_found(&target));
            }
            ensure_no_other_claim(&transaction, db_path, &target, Some(claim_ref))?;
            target
        }
        None => current.transaction_id,
    };

    let updated = RebateClaim {
        claim_ref: current.claim_ref,
        claim_id: claim_id_change.unwrap_or(current.claim_id),
        transaction_id,
        claim_amount: current.claim_amount,
        claim_status: changes.claim_status.unwrap_or(current.claim_status),
        claim_date: current.claim_date,
        notes: match changes.notes {
            Some(value) => clean_optional_text(value),
            None => current.notes,
        },
    };

    transaction
        .execute(
            "UPDATE internal_claims
             SET claim_id = ?2, transaction_id = ?3, claim_status = ?4, notes = ?5
             WHERE claim_ref = ?1",
            params![
                &updated.claim_ref,
                &updated.claim_id,
                &updated.transaction_id,
                updated.claim_status.as_str(),
                &updated.notes
            ],
        )
        .map_err(|error| map_claim_write_error(db_path, &error, &updated.transaction_id))?;
    commit(transaction, db_path)?;

    tracing::info!(
        claim_ref = %updated.claim_ref,
        claim_status = updated.claim_status.as_str(),
        "updated rebate claim"
    );
    Ok(updated)
}

pub fn load_claim(
    connection: &Connection,
    db_path: &Path,
    claim_ref: &str,
) -> ClientResult<Option<RebateClaim>> {
    connection
        .query_row(
            &format!("SELECT {CLAIM_COLUMNS} FROM internal_claims WHERE claim_ref = ?1"),
            params![claim_ref],
            claim_from_row,
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))
}

pub fn list_claims(
    connection: &Connection,
    db_path: &Path,
    filter: &ClaimFilter,
) -> ClientResult<Vec<RebateClaim>> {
    let status = filter.claim_status.map(ClaimStatus::as_str);
    let search = substring_pattern(filter.search.as_deref());

    let mut statement = connection
        .prepare(&format!(
            "SELECT {CLAIM_COLUMNS}
             FROM internal_claims
             WHERE (?1 IS NULL OR claim_status = ?1)
               AND (?2 IS NULL
                    OR lower(COALESCE(claim_id, '')) LIKE ?2 ESCAPE '\\'
                    OR lower(transaction_id) LIKE ?2 ESCAPE '\\')
             ORDER BY claim_date DESC, claim_ref DESC"
        ))
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let rows_iter = statement
        .query_map(params![status, search], claim_from_row)
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        rows.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    Ok(rows)
}

fn ensure_no_other_claim(
    connection: &Connection,
    db_path: &Path,
    transaction_id: &str,
    exclude_claim_ref: Option<&str>,
) -> ClientResult<()> {
    let existing = connection
        .query_row(
            "SELECT claim_ref FROM internal_claims
             WHERE transaction_id = ?1 AND (?2 IS NULL OR claim_ref <> ?2)
             LIMIT 1",
            params![transaction_id, exclude_claim_ref],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    if let Some(existing_claim_ref) = existing {
        tracing::warn!(transaction_id, %existing_claim_ref, "rejected duplicate claim");
        return Err(ClientError::duplicate_claim(
            transaction_id,
            &existing_claim_ref,
        ));
    }
    Ok(())
}

fn validate_claim_id(claim_id: Option<String>) -> ClientResult<Option<String>> {
    let cleaned = clean_optional_text(claim_id);
    if let Some(value) = &cleaned
        && value.chars().count() > CLAIM_ID_MAX_CHARS
    {
        return Err(ClientError::validation(
            "claim_id",
            &format!("`claim_id` must be at most {CLAIM_ID_MAX_CHARS} characters."),
        ));
    }
    Ok(cleaned)
}

fn map_claim_write_error(
    db_path: &Path,
    error: &rusqlite::Error,
    transaction_id: &str,
) -> ClientError {
    // The only UNIQUE key on claims is `transaction_id`.
    if key_conflict(error) == Some(KeyConflict::Unique) {
        return ClientError::duplicate_claim(transaction_id, "unknown");
    }
    map_sqlite_error(db_path, error)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{
        ClaimChanges, ClaimFields, ClaimFilter, claim_rebate, list_claims, map_claim_write_error,
        update_claim,
    };
    use crate::clock::{Clock, ManualClock};
    use crate::contracts::types::ClaimStatus;
    use crate::ledger::programs::{ProgramChanges, ProgramFields, create_program, update_program};
    use crate::ledger::testkit::{TestStore, open_test_store};
    use crate::ledger::transactions::{TransactionFields, delete_transaction, submit_transaction};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
    }

    fn decimal(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap_or_default()
    }

    /// SpringSale 10% for January 2024 with T1 (200.00 on the 15th) linked.
    fn seed(store: &mut TestStore, clock: &ManualClock) -> Option<String> {
        let program = create_program(
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
        .ok()?;
        submit_transaction(
            &mut store.connection,
            &store.db_path,
            clock,
            TransactionFields {
                transaction_id: "T1".to_string(),
                amount: decimal("200.00"),
                transaction_date: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).single()?,
                rebate_program_id: Some(program.program_id.clone()),
            },
        )
        .ok()?;
        Some(program.program_id)
    }

    fn claim_for(transaction_id: &str) -> ClaimFields {
        ClaimFields {
            transaction_id: transaction_id.to_string(),
            claim_id: None,
            claim_amount: None,
            claim_status: None,
            notes: None,
        }
    }

    #[test]
    fn claim_without_amount_receives_calculated_rebate_and_pending_status() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 20));
            assert!(seed(&mut store, &clock).is_some());

            let claim = claim_rebate(&mut store.connection, &store.db_path, &clock, claim_for("T1"));
            assert!(claim.is_ok());
            if let Ok(value) = claim {
                assert_eq!(value.claim_amount.to_string(), "20.00");
                assert_eq!(value.claim_status, ClaimStatus::Pending);
                assert!(value.claim_ref.starts_with("clm_"));
                assert!(value.claim_id.is_none());
            }
        }
    }

    #[test]
    fn zero_amount_is_treated_as_absent() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 20));
            assert!(seed(&mut store, &clock).is_some());

            let mut fields = claim_for("T1");
            fields.claim_amount = Some(decimal("0"));
            let claim = claim_rebate(&mut store.connection, &store.db_path, &clock, fields);
            assert!(matches!(claim, Ok(ref value) if value.claim_amount.to_string() == "20.00"));
        }
    }

    #[test]
    fn explicit_amount_and_status_are_kept() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 20));
            assert!(seed(&mut store, &clock).is_some());

            let mut fields = claim_for("T1");
            fields.claim_amount = Some(decimal("15.5"));
            fields.claim_status = Some(ClaimStatus::Approved);
            fields.claim_id = Some("CLM-001".to_string());
            let claim = claim_rebate(&mut store.connection, &store.db_path, &clock, fields);
            assert!(claim.is_ok());
            if let Ok(value) = claim {
                assert_eq!(value.claim_amount.to_string(), "15.50");
                assert_eq!(value.claim_status, ClaimStatus::Approved);
                assert_eq!(value.claim_id.as_deref(), Some("CLM-001"));
            }
        }
    }

    #[test]
    fn second_claim_for_same_transaction_is_rejected_and_first_is_unchanged() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 20));
            assert!(seed(&mut store, &clock).is_some());

            let first = claim_rebate(&mut store.connection, &store.db_path, &clock, claim_for("T1"));
            assert!(first.is_ok());
            let mut again = claim_for("T1");
            again.claim_amount = Some(decimal("99.00"));
            let second = claim_rebate(&mut store.connection, &store.db_path, &clock, again);
            assert!(matches!(second, Err(ref error) if error.code == "duplicate_claim"));

            let listed = list_claims(&store.connection, &store.db_path, &ClaimFilter::default());
            assert!(listed.is_ok());
            if let (Ok(rows), Ok(original)) = (listed, first) {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0], original);
            }
        }
    }

    #[test]
    fn claim_against_unknown_transaction_is_not_found() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 20));
            let claim =
                claim_rebate(&mut store.connection, &store.db_path, &clock, claim_for("T404"));
            assert!(matches!(claim, Err(ref error) if error.code == "not_found"));
        }
    }

    #[test]
    fn claim_amount_stays_frozen_after_program_changes() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 20));
            let program_id = seed(&mut store, &clock);
            assert!(program_id.is_some());
            if let Some(program_id) = program_id {
                let claim =
                    claim_rebate(&mut store.connection, &store.db_path, &clock, claim_for("T1"));
                assert!(claim.is_ok());

                let raised = update_program(
                    &mut store.connection,
                    &store.db_path,
                    &clock,
                    &program_id,
                    ProgramChanges {
                        rebate_percentage: Some(decimal("50")),
                        ..ProgramChanges::default()
                    },
                );
                assert!(raised.is_ok());

                let listed =
                    list_claims(&store.connection, &store.db_path, &ClaimFilter::default());
                assert!(
                    matches!(listed, Ok(ref rows) if rows[0].claim_amount.to_string() == "20.00")
                );
            }
        }
    }

    #[test]
    fn claim_outside_program_validity_gets_zero() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 20));
            assert!(seed(&mut store, &clock).is_some());

            clock.set(
                Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0)
                    .single()
                    .unwrap_or_default(),
            );
            let claim = claim_rebate(&mut store.connection, &store.db_path, &clock, claim_for("T1"));
            assert!(matches!(claim, Ok(ref value) if value.claim_amount.to_string() == "0.00"));
        }
    }

    #[test]
    fn update_claim_changes_status_and_rechecks_duplicates_excluding_itself() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 20));
            assert!(seed(&mut store, &clock).is_some());
            let other = submit_transaction(
                &mut store.connection,
                &store.db_path,
                &clock,
                TransactionFields {
                    transaction_id: "T2".to_string(),
                    amount: decimal("50.00"),
                    transaction_date: clock.now(),
                    rebate_program_id: None,
                },
            );
            assert!(other.is_ok());

            let first = claim_rebate(&mut store.connection, &store.db_path, &clock, claim_for("T1"));
            let second =
                claim_rebate(&mut store.connection, &store.db_path, &clock, claim_for("T2"));
            assert!(first.is_ok() && second.is_ok());
            if let (Ok(first), Ok(second)) = (first, second) {
                let approve = update_claim(
                    &mut store.connection,
                    &store.db_path,
                    &first.claim_ref,
                    ClaimChanges {
                        claim_status: Some(ClaimStatus::Approved),
                        transaction_id: Some("T1".to_string()),
                        ..ClaimChanges::default()
                    },
                );
                assert!(matches!(approve, Ok(ref claim) if claim.claim_status == ClaimStatus::Approved));
                if let Ok(approved) = approve {
                    assert_eq!(approved.claim_amount, first.claim_amount);
                    assert_eq!(approved.claim_date, first.claim_date);
                }

                let collide = update_claim(
                    &mut store.connection,
                    &store.db_path,
                    &second.claim_ref,
                    ClaimChanges {
                        transaction_id: Some("T1".to_string()),
                        ..ClaimChanges::default()
                    },
                );
                assert!(matches!(collide, Err(ref error) if error.code == "duplicate_claim"));
            }

            let missing = update_claim(
                &mut store.connection,
                &store.db_path,
                "clm_missing",
                ClaimChanges::default(),
            );
            assert!(matches!(missing, Err(ref error) if error.code == "not_found"));
        }
    }

    #[test]
    fn list_claims_filters_by_status_and_search() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 20));
            assert!(seed(&mut store, &clock).is_some());
            let mut fields = claim_for("T1");
            fields.claim_id = Some("CLM-7".to_string());
            assert!(claim_rebate(&mut store.connection, &store.db_path, &clock, fields).is_ok());

            let approved = list_claims(
                &store.connection,
                &store.db_path,
                &ClaimFilter {
                    claim_status: Some(ClaimStatus::Approved),
                    search: None,
                },
            );
            assert!(matches!(approved, Ok(ref rows) if rows.is_empty()));

            let by_claim_id = list_claims(
                &store.connection,
                &store.db_path,
                &ClaimFilter {
                    claim_status: None,
                    search: Some("clm-7".to_string()),
                },
            );
            assert!(matches!(by_claim_id, Ok(ref rows) if rows.len() == 1));
        }
    }

    #[test]
    fn list_claims_search_matches_wildcard_characters_literally() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 20));
            for transaction_id in ["T_1", "TX1", "T%2"] {
                let submitted = submit_transaction(
                    &mut store.connection,
                    &store.db_path,
                    &clock,
                    TransactionFields {
                        transaction_id: transaction_id.to_string(),
                        amount: decimal("10.00"),
                        transaction_date: clock.now(),
                        rebate_program_id: None,
                    },
                );
                assert!(submitted.is_ok());
                assert!(
                    claim_rebate(
                        &mut store.connection,
                        &store.db_path,
                        &clock,
                        claim_for(transaction_id)
                    )
                    .is_ok()
                );
            }

            let search = |text: &str| {
                list_claims(
                    &store.connection,
                    &store.db_path,
                    &ClaimFilter {
                        claim_status: None,
                        search: Some(text.to_string()),
                    },
                )
                .map(|rows| {
                    rows.into_iter()
                        .map(|claim| claim.transaction_id)
                        .collect::<Vec<_>>()
                })
            };
            assert!(matches!(search("T_"), Ok(ref ids) if ids == &["T_1".to_string()]));
            assert!(matches!(search("%"), Ok(ref ids) if ids == &["T%2".to_string()]));
            assert!(matches!(search("t"), Ok(ref ids) if ids.len() == 3));
        }
    }

    #[test]
    fn only_the_transaction_key_maps_to_duplicate_claim() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 20));
            assert!(seed(&mut store, &clock).is_some());
            assert!(
                claim_rebate(&mut store.connection, &store.db_path, &clock, claim_for("T1")).is_ok()
            );

            let insert = |claim_ref: &str, status: &str| {
                store.connection.execute(
                    "INSERT INTO internal_claims
                        (claim_ref, transaction_id, claim_amount, claim_status, claim_date)
                     VALUES (?1, 'T1', '1.00', ?2, '2024-01-20T00:00:00Z')",
                    [claim_ref, status],
                )
            };

            let second_claim = insert("clm_second", "pending");
            assert!(second_claim.is_err());
            if let Err(error) = second_claim {
                let mapped = map_claim_write_error(&store.db_path, &error, "T1");
                assert_eq!(mapped.code, "duplicate_claim");
            }

            let bad_status = insert("clm_third", "paid");
            assert!(bad_status.is_err());
            if let Err(error) = bad_status {
                let mapped = map_claim_write_error(&store.db_path, &error, "T1");
                assert_ne!(mapped.code, "duplicate_claim");
            }
        }
    }

    #[test]
    fn deleting_transaction_cascades_to_claim() {
        let store = open_test_store();
        assert!(store.is_some());
        if let Some(mut store) = store {
            let clock = ManualClock::at_date(date(2024, 1, 20));
            assert!(seed(&mut store, &clock).is_some());
            assert!(
                claim_rebate(&mut store.connection, &store.db_path, &clock, claim_for("T1")).is_ok()
            );

            let deleted = delete_transaction(&mut store.connection, &store.db_path, "T1");
            assert!(matches!(deleted, Ok(ref summary) if summary.claims_removed == 1));
            let listed = list_claims(&store.connection, &store.db_path, &ClaimFilter::default());
            assert!(matches!(listed, Ok(ref rows) if rows.is_empty()));
        }
    }
}
