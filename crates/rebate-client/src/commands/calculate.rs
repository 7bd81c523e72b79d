use crate::ClientResult;
use crate::calculator::calculate_rebate;
use crate::commands::common::{CommandContext, open_store};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::RebateCalculation;
use crate::ledger::transactions::load_transaction_with_program;

pub fn run(transaction_id: &str) -> ClientResult<SuccessEnvelope> {
    run_with_context(transaction_id, &CommandContext::default())
}

#[doc(hidden)]
pub fn run_with_context(
    transaction_id: &str,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    let store = open_store(context)?;
    let (transaction, program) =
        load_transaction_with_program(&store.connection, &store.db_path, transaction_id.trim())?;
    let rebate_amount = calculate_rebate(&transaction, program.as_ref(), context.clock);
    tracing::debug!(
        transaction_id = %transaction.transaction_id,
        %rebate_amount,
        "calculated rebate"
    );
    success(
        "calculate",
        RebateCalculation {
            transaction_id: transaction.transaction_id,
            rebate_amount,
        },
    )
}
