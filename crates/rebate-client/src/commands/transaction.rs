use crate::calculator::calculate_rebate;
use crate::commands::common::{CommandContext, open_store};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{TransactionDetail, TransactionList};
use crate::dates::parse_timestamp;
use crate::ledger::clean_optional_text;
use crate::ledger::transactions::{
    TransactionChanges, TransactionFields, delete_transaction, list_transactions,
    load_transaction_with_program, submit_transaction, update_transaction,
};
use crate::money::{AMOUNT_MAX_DIGITS, parse_money};
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Default)]
pub struct TransactionSubmitInput {
    pub transaction_id: String,
    pub amount: String,
    pub transaction_date: String,
    pub rebate_program_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionUpdateInput {
    pub transaction_id: String,
    pub amount: Option<String>,
    pub transaction_date: Option<String>,
    pub rebate_program_id: Option<String>,
    pub detach_program: bool,
}

pub fn submit(input: TransactionSubmitInput) -> ClientResult<SuccessEnvelope> {
    submit_with_context(input, &CommandContext::default())
}

#[doc(hidden)]
pub fn submit_with_context(
    input: TransactionSubmitInput,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    let fields = TransactionFields {
        transaction_id: input.transaction_id,
        amount: parse_money("amount", &input.amount, AMOUNT_MAX_DIGITS)?,
        transaction_date: parse_timestamp("transaction_date", &input.transaction_date)?,
        rebate_program_id: clean_optional_text(input.rebate_program_id),
    };

    let mut store = open_store(context)?;
    let transaction =
        submit_transaction(&mut store.connection, &store.db_path, context.clock, fields)?;
    success("transaction submit", transaction)
}

pub fn update(input: TransactionUpdateInput) -> ClientResult<SuccessEnvelope> {
    update_with_context(input, &CommandContext::default())
}

#[doc(hidden)]
pub fn update_with_context(
    input: TransactionUpdateInput,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    if input.detach_program && input.rebate_program_id.is_some() {
        return Err(ClientError::invalid_argument_for_command(
            "`--program` and `--detach-program` cannot be used together.",
            Some("transaction update"),
        ));
    }

    let rebate_program_id = if input.detach_program {
        Some(None)
    } else {
        clean_optional_text(input.rebate_program_id).map(Some)
    };
    let changes = TransactionChanges {
        amount: input
            .amount
            .as_deref()
            .map(|raw| parse_money("amount", raw, AMOUNT_MAX_DIGITS))
            .transpose()?,
        transaction_date: input
            .transaction_date
            .as_deref()
            .map(|raw| parse_timestamp("transaction_date", raw))
            .transpose()?,
        rebate_program_id,
    };

    let mut store = open_store(context)?;
    let transaction = update_transaction(
        &mut store.connection,
        &store.db_path,
        input.transaction_id.trim(),
        changes,
    )?;
    success("transaction update", transaction)
}

/// The stored transaction plus the rebate it would earn today.
pub fn show(transaction_id: &str) -> ClientResult<SuccessEnvelope> {
    show_with_context(transaction_id, &CommandContext::default())
}

#[doc(hidden)]
pub fn show_with_context(
    transaction_id: &str,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    let store = open_store(context)?;
    let (transaction, program) =
        load_transaction_with_program(&store.connection, &store.db_path, transaction_id.trim())?;
    let rebate_amount = calculate_rebate(&transaction, program.as_ref(), context.clock);
    success(
        "transaction show",
        TransactionDetail {
            transaction,
            rebate_amount,
        },
    )
}

pub fn list(program_id: Option<String>) -> ClientResult<SuccessEnvelope> {
    list_with_context(program_id, &CommandContext::default())
}

#[doc(hidden)]
pub fn list_with_context(
    program_id: Option<String>,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    let program_id = clean_optional_text(program_id);
    let store = open_store(context)?;
    let rows = list_transactions(&store.connection, &store.db_path, program_id.as_deref())?;
    success(
        "transaction list",
        TransactionList {
            total: rows.len(),
            rows,
        },
    )
}

pub fn delete(transaction_id: &str) -> ClientResult<SuccessEnvelope> {
    delete_with_context(transaction_id, &CommandContext::default())
}

#[doc(hidden)]
pub fn delete_with_context(
    transaction_id: &str,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    let mut store = open_store(context)?;
    let deletion =
        delete_transaction(&mut store.connection, &store.db_path, transaction_id.trim())?;
    success("transaction delete", deletion)
}
