use rust_decimal::Decimal;

use crate::clock::Clock;
use crate::contracts::types::{RebateProgram, Transaction};
use crate::money::{round_money, zero};

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rebate owed on `transaction` as of the clock's current day.
///
/// No linked program, an inactive program, or a current day outside the program
/// window all yield `0.00`. Otherwise the result is
/// `amount * percentage / 100` rounded to cents.
pub fn calculate_rebate(
    transaction: &Transaction,
    program: Option<&RebateProgram>,
    clock: &dyn Clock,
) -> Decimal {
    match program {
        Some(program) if program.is_valid_now(clock) => {
            round_money(transaction.amount * (program.rebate_percentage / ONE_HUNDRED))
        }
        _ => zero(),
    }
}
