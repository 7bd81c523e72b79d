use crate::commands::common::{CommandContext, open_store};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{ClaimList, ClaimStatus};
use crate::ledger::claims::{
    ClaimChanges, ClaimFields, ClaimFilter, claim_rebate, list_claims, update_claim,
};
use crate::money::{AMOUNT_MAX_DIGITS, parse_money};
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Default)]
pub struct ClaimCreateInput {
    pub transaction_id: String,
    pub claim_id: Option<String>,
    pub claim_amount: Option<String>,
    pub claim_status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClaimUpdateInput {
    pub claim_ref: String,
    pub transaction_id: Option<String>,
    pub claim_id: Option<String>,
    pub clear_claim_id: bool,
    pub claim_status: Option<String>,
    pub notes: Option<String>,
    pub clear_notes: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClaimListInput {
    pub claim_status: Option<String>,
    pub search: Option<String>,
}

pub fn create(input: ClaimCreateInput) -> ClientResult<SuccessEnvelope> {
    create_with_context(input, &CommandContext::default())
}

#[doc(hidden)]
pub fn create_with_context(
    input: ClaimCreateInput,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    let fields = ClaimFields {
        transaction_id: input.transaction_id,
        claim_id: input.claim_id,
        claim_amount: input
            .claim_amount
            .as_deref()
            .map(|raw| parse_money("claim_amount", raw, AMOUNT_MAX_DIGITS))
            .transpose()?,
        claim_status: parse_status(input.claim_status.as_deref())?,
        notes: input.notes,
    };

    let mut store = open_store(context)?;
    let claim = claim_rebate(&mut store.connection, &store.db_path, context.clock, fields)?;
    success("claim create", claim)
}

pub fn update(input: ClaimUpdateInput) -> ClientResult<SuccessEnvelope> {
    update_with_context(input, &CommandContext::default())
}

#[doc(hidden)]
pub fn update_with_context(
    input: ClaimUpdateInput,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    let claim_id = clearable("claim-id", input.claim_id, input.clear_claim_id)?;
    let notes = clearable("notes", input.notes, input.clear_notes)?;
    let changes = ClaimChanges {
        transaction_id: input.transaction_id,
        claim_id,
        claim_status: parse_status(input.claim_status.as_deref())?,
        notes,
    };

    let mut store = open_store(context)?;
    let claim = update_claim(
        &mut store.connection,
        &store.db_path,
        input.claim_ref.trim(),
        changes,
    )?;
    success("claim update", claim)
}

pub fn list(input: ClaimListInput) -> ClientResult<SuccessEnvelope> {
    list_with_context(input, &CommandContext::default())
}

#[doc(hidden)]
pub fn list_with_context(
    input: ClaimListInput,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    let filter = ClaimFilter {
        claim_status: parse_status(input.claim_status.as_deref())?,
        search: input.search,
    };
    let store = open_store(context)?;
    let rows = list_claims(&store.connection, &store.db_path, &filter)?;
    success(
        "claim list",
        ClaimList {
            total: rows.len(),
            rows,
        },
    )
}

fn parse_status(raw: Option<&str>) -> ClientResult<Option<ClaimStatus>> {
    raw.map(ClaimStatus::parse).transpose()
}

fn clearable(
    flag: &str,
    value: Option<String>,
    clear: bool,
) -> ClientResult<Option<Option<String>>> {
    match (value, clear) {
        (Some(_), true) => Err(ClientError::invalid_argument_for_command(
            &format!("`--{flag}` and `--clear-{flag}` cannot be used together."),
            Some("claim update"),
        )),
        (_, true) => Ok(Some(None)),
        (value, false) => Ok(value.map(Some)),
    }
}
