use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{ClientError, ClientResult};

pub const MONEY_SCALE: u32 = 2;

/// Total significant digits allowed for transaction and claim amounts.
pub const AMOUNT_MAX_DIGITS: u32 = 10;

/// Total significant digits allowed for a rebate percentage (`100.00`).
pub const PERCENTAGE_MAX_DIGITS: u32 = 5;

pub fn zero() -> Decimal {
    Decimal::new(0, MONEY_SCALE)
}

/// Parses a non-negative two-decimal amount from user input, rejecting
/// anything that would need rounding to fit.
pub fn parse_money(field: &str, raw: &str, max_digits: u32) -> ClientResult<Decimal> {
    let trimmed = raw.trim();
    let value = Decimal::from_str(trimmed).map_err(|_| {
        ClientError::validation(field, &format!("`{field}` must be a decimal number."))
    })?;
    check_money(field, value, max_digits)
}

pub fn check_money(field: &str, value: Decimal, max_digits: u32) -> ClientResult<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ClientError::validation(
            field,
            &format!("`{field}` must be greater than or equal to 0."),
        ));
    }

    let normalized = value.normalize();
    if normalized.scale() > MONEY_SCALE {
        return Err(ClientError::validation(
            field,
            &format!("`{field}` must have at most {MONEY_SCALE} decimal places."),
        ));
    }

    let scaled = with_money_scale(normalized.abs());
    let digit_count = scaled.mantissa().to_string().trim_start_matches('-').len() as u32;
    if digit_count > max_digits {
        return Err(ClientError::validation(
            field,
            &format!("`{field}` must have at most {max_digits} digits in total."),
        ));
    }

    Ok(scaled)
}

/// Rounds to cents with banker's rounding and pins the scale to two places,
/// so `20` and `20.000` both become `20.00`.
pub fn round_money(value: Decimal) -> Decimal {
    let rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven);
    with_money_scale(rounded)
}

pub fn with_money_scale(value: Decimal) -> Decimal {
    let mut scaled = value;
    scaled.rescale(MONEY_SCALE);
    scaled
}

pub(crate) fn decimal_from_column(value: &str, column: usize) -> rusqlite::Result<Decimal> {
    Decimal::from_str(value).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })
}
