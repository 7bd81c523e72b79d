use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};

use crate::{ClientError, ClientResult};

pub fn format_iso_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_iso_date(field: &str, value: &str) -> ClientResult<NaiveDate> {
    if !looks_like_iso_date(value) {
        return Err(ClientError::validation(
            field,
            &format!("`{field}` must use YYYY-MM-DD format with a real calendar date."),
        ));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ClientError::validation(
            field,
            &format!("`{field}` must use YYYY-MM-DD format with valid calendar values."),
        )
    })
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD`, which is read as
/// midnight UTC. Offsets are converted to UTC before the calendar date is
/// taken anywhere else.
pub fn parse_timestamp(field: &str, value: &str) -> ClientResult<DateTime<Utc>> {
    let trimmed = value.trim();
    if looks_like_iso_date(trimmed) {
        let date = parse_iso_date(field, trimmed)?;
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| {
            ClientError::validation(
                field,
                &format!("`{field}` must be an RFC 3339 timestamp or a YYYY-MM-DD date."),
            )
        })
}

pub(crate) fn date_from_column(value: &str, column: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })
}

pub(crate) fn timestamp_from_column(value: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(error),
            )
        })
}

fn looks_like_iso_date(value: &str) -> bool {
    if value.len() != 10 {
        return false;
    }
    let bytes = value.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }

    for index in [0usize, 1, 2, 3, 5, 6, 8, 9] {
        if !bytes[index].is_ascii_digit() {
            return false;
        }
    }
    true
}
