use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebateProgram {
    pub program_id: String,
    pub program_name: String,
    pub rebate_percentage: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub eligibility_criteria: Option<String>,
    pub is_active: bool,
}

impl RebateProgram {
    /// Whether `date` falls inside the program window, both ends inclusive.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn is_valid_on(&self, today: NaiveDate) -> bool {
        self.is_active && self.covers(today)
    }

    pub fn is_valid_now(&self, clock: &dyn Clock) -> bool {
        self.is_valid_on(clock.today())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub amount: Decimal,
    pub transaction_date: DateTime<Utc>,
    pub rebate_program_id: Option<String>,
}

impl Transaction {
    pub fn calendar_date(&self) -> NaiveDate {
        self.transaction_date.date_naive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> ClientResult<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
            .ok_or_else(|| {
                ClientError::validation(
                    "claim_status",
                    "`claim_status` must be one of: pending, approved, rejected.",
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebateClaim {
    pub claim_ref: String,
    pub claim_id: Option<String>,
    pub transaction_id: String,
    pub claim_amount: Decimal,
    pub claim_status: ClaimStatus,
    pub claim_date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebateReport {
    pub total_claims: i64,
    pub total_approved_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub rebate_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebateCalculation {
    pub transaction_id: String,
    pub rebate_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgramList {
    pub total: usize,
    pub rows: Vec<RebateProgram>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionList {
    pub total: usize,
    pub rows: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimList {
    pub total: usize,
    pub rows: Vec<RebateClaim>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgramDeletion {
    pub program_id: String,
    pub detached_transactions: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionDeletion {
    pub transaction_id: String,
    pub claims_removed: i64,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{ClaimStatus, RebateProgram};
    use crate::clock::ManualClock;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
    }

    fn spring_sale(is_active: bool) -> RebateProgram {
        RebateProgram {
            program_id: "prg_1".to_string(),
            program_name: "SpringSale".to_string(),
            rebate_percentage: Decimal::new(1000, 2),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 31),
            eligibility_criteria: None,
            is_active,
        }
    }

    #[test]
    fn is_valid_on_requires_active_flag_and_window() {
        let active = spring_sale(true);
        assert!(active.is_valid_on(date(2024, 1, 1)));
        assert!(active.is_valid_on(date(2024, 1, 31)));
        assert!(!active.is_valid_on(date(2023, 12, 31)));
        assert!(!active.is_valid_on(date(2024, 2, 1)));

        let inactive = spring_sale(false);
        assert!(!inactive.is_valid_on(date(2024, 1, 15)));
        assert!(inactive.covers(date(2024, 1, 15)));
    }

    #[test]
    fn is_valid_now_follows_the_clock_across_the_window_end() {
        let program = spring_sale(true);
        let clock = ManualClock::at_date(date(2024, 1, 31));
        assert!(program.is_valid_now(&clock));

        clock.advance(chrono::Duration::days(1));
        assert!(!program.is_valid_now(&clock));

        clock.set(clock_start(2023, 12, 31));
        assert!(!program.is_valid_now(&clock));
    }

    fn clock_start(year: i32, month: u32, day: u32) -> chrono::DateTime<chrono::Utc> {
        date(year, month, day).and_time(chrono::NaiveTime::MIN).and_utc()
    }

    #[test]
    fn claim_status_parses_known_values_only() {
        assert!(matches!(ClaimStatus::parse("approved"), Ok(ClaimStatus::Approved)));
        assert!(matches!(ClaimStatus::parse(" pending "), Ok(ClaimStatus::Pending)));
        assert!(ClaimStatus::parse("APPROVED").is_err());
        assert!(ClaimStatus::parse("paid").is_err());
    }
}
