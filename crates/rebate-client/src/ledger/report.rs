use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::{Connection, params};

use crate::cache::ReportCache;
use crate::contracts::types::{ClaimStatus, RebateReport};
use crate::dates::format_iso_date;
use crate::money::{decimal_from_column, with_money_scale, zero};
use crate::state::map_sqlite_error;
use crate::{ClientError, ClientResult};

pub const REPORT_CACHE_TTL: Duration = Duration::from_secs(600);

pub fn report_cache_key(start_date: NaiveDate, end_date: NaiveDate) -> String {
    format!(
        "rebate_report_{}_{}",
        format_iso_date(&start_date),
        format_iso_date(&end_date)
    )
}

/// Serialized report for `[start_date, end_date]`, served from `cache` when a
/// live entry exists.
///
/// A hit is returned verbatim without touching the claims table, so a report
/// stays stale until its entry expires.
pub fn rebate_report(
    connection: &Connection,
    db_path: &Path,
    cache: &dyn ReportCache,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> ClientResult<String> {
    if start_date > end_date {
        return Err(ClientError::validation(
            "start_date",
            "`start_date` must be on or before `end_date`.",
        ));
    }

    let key = report_cache_key(start_date, end_date);
    if let Some(payload) = cache.get(&key)? {
        tracing::debug!(cache_key = %key, "report cache hit");
        return Ok(payload);
    }

    tracing::debug!(cache_key = %key, "report cache miss");
    let report = compute_report(connection, db_path, start_date, end_date)?;
    let payload = serde_json::to_string(&report)
        .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;
    // A failed write only costs the next caller a recompute.
    if let Err(error) = cache.set(&key, &payload, REPORT_CACHE_TTL) {
        tracing::warn!(cache_key = %key, code = %error.code, "report cache write failed");
    }
    Ok(payload)
}

/// Claim totals for claims filed on `start_date` through `end_date`, by the
/// UTC calendar date of `claim_date`.
pub fn compute_report(
    connection: &Connection,
    db_path: &Path,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> ClientResult<RebateReport> {
    let start = format_iso_date(&start_date);
    let end = format_iso_date(&end_date);

    let total_claims = connection
        .query_row(
            "SELECT COUNT(*) FROM internal_claims
             WHERE claim_date >= ?1 AND substr(claim_date, 1, 10) <= ?2",
            params![&start, &end],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    // Summed here rather than with SQL SUM(), which would go through REAL.
    let mut statement = connection
        .prepare(
            "SELECT claim_amount FROM internal_claims
             WHERE claim_date >= ?1 AND substr(claim_date, 1, 10) <= ?2
               AND claim_status = ?3",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    let amounts = statement
        .query_map(
            params![&start, &end, ClaimStatus::Approved.as_str()],
            |row| {
                let raw = row.get::<_, String>(0)?;
                decimal_from_column(&raw, 0)
            },
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut total_approved_amount = zero();
    for amount in amounts {
        total_approved_amount += amount.map_err(|error| map_sqlite_error(db_path, &error))?;
    }

    Ok(RebateReport {
        total_claims,
        total_approved_amount: with_money_scale(total_approved_amount),
    })
}
