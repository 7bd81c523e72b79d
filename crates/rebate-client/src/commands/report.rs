use crate::ClientResult;
use crate::cache::SqliteReportCache;
use crate::commands::common::{CommandContext, open_store};
use crate::contracts::envelope::{SuccessEnvelope, success_raw};
use crate::dates::parse_iso_date;
use crate::ledger::report::rebate_report;

#[derive(Debug, Clone, Default)]
pub struct ReportInput {
    pub start_date: String,
    pub end_date: String,
}

pub fn run(input: ReportInput) -> ClientResult<SuccessEnvelope> {
    run_with_context(input, &CommandContext::default())
}

/// Claim totals for a date range. Results are cached in the store for ten
/// minutes per range, so repeated calls inside that window return the same
/// body even if claims changed in between.
#[doc(hidden)]
pub fn run_with_context(
    input: ReportInput,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    let start_date = parse_iso_date("start_date", &input.start_date)?;
    let end_date = parse_iso_date("end_date", &input.end_date)?;

    let store = open_store(context)?;
    let cache = SqliteReportCache::new(&store.connection, &store.db_path, context.clock);
    let payload = rebate_report(
        &store.connection,
        &store.db_path,
        &cache,
        start_date,
        end_date,
    )?;
    success_raw("report", &payload)
}
