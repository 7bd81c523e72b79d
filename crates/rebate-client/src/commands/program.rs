use crate::commands::common::{CommandContext, open_store};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::ProgramList;
use crate::dates::parse_iso_date;
use crate::ledger::programs::{
    ProgramChanges, ProgramFields, ProgramFilter, create_program, delete_program, list_programs,
    update_program,
};
use crate::money::{PERCENTAGE_MAX_DIGITS, parse_money};
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone)]
pub struct ProgramCreateInput {
    pub program_name: String,
    pub rebate_percentage: String,
    pub start_date: String,
    pub end_date: String,
    pub eligibility_criteria: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProgramUpdateInput {
    pub program_id: String,
    pub program_name: Option<String>,
    pub rebate_percentage: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub eligibility_criteria: Option<String>,
    pub clear_eligibility_criteria: bool,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ProgramListInput {
    pub active_only: bool,
    pub search: Option<String>,
}

pub fn create(input: ProgramCreateInput) -> ClientResult<SuccessEnvelope> {
    create_with_context(input, &CommandContext::default())
}

#[doc(hidden)]
pub fn create_with_context(
    input: ProgramCreateInput,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    let fields = ProgramFields {
        program_name: input.program_name,
        rebate_percentage: parse_money(
            "rebate_percentage",
            &input.rebate_percentage,
            PERCENTAGE_MAX_DIGITS,
        )?,
        start_date: parse_iso_date("start_date", &input.start_date)?,
        end_date: parse_iso_date("end_date", &input.end_date)?,
        eligibility_criteria: input.eligibility_criteria,
        is_active: input.is_active,
    };

    let mut store = open_store(context)?;
    let program = create_program(&mut store.connection, &store.db_path, context.clock, fields)?;
    success("program create", program)
}

pub fn update(input: ProgramUpdateInput) -> ClientResult<SuccessEnvelope> {
    update_with_context(input, &CommandContext::default())
}

#[doc(hidden)]
pub fn update_with_context(
    input: ProgramUpdateInput,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    if input.clear_eligibility_criteria && input.eligibility_criteria.is_some() {
        return Err(ClientError::invalid_argument_for_command(
            "`--eligibility-criteria` and `--clear-eligibility-criteria` cannot be used together.",
            Some("program update"),
        ));
    }

    let eligibility_criteria = if input.clear_eligibility_criteria {
        Some(None)
    } else {
        input.eligibility_criteria.map(Some)
    };
    let changes = ProgramChanges {
        program_name: input.program_name,
        rebate_percentage: input
            .rebate_percentage
            .as_deref()
            .map(|raw| parse_money("rebate_percentage", raw, PERCENTAGE_MAX_DIGITS))
            .transpose()?,
        start_date: input
            .start_date
            .as_deref()
            .map(|raw| parse_iso_date("start_date", raw))
            .transpose()?,
        end_date: input
            .end_date
            .as_deref()
            .map(|raw| parse_iso_date("end_date", raw))
            .transpose()?,
        eligibility_criteria,
        is_active: input.is_active,
    };

    let mut store = open_store(context)?;
    let program = update_program(
        &mut store.connection,
        &store.db_path,
        context.clock,
        input.program_id.trim(),
        changes,
    )?;
    success("program update", program)
}

pub fn delete(program_id: &str) -> ClientResult<SuccessEnvelope> {
    delete_with_context(program_id, &CommandContext::default())
}

#[doc(hidden)]
pub fn delete_with_context(
    program_id: &str,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    let mut store = open_store(context)?;
    let deletion = delete_program(&mut store.connection, &store.db_path, program_id.trim())?;
    success("program delete", deletion)
}

pub fn list(input: ProgramListInput) -> ClientResult<SuccessEnvelope> {
    list_with_context(input, &CommandContext::default())
}

#[doc(hidden)]
pub fn list_with_context(
    input: ProgramListInput,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    let store = open_store(context)?;
    let rows = list_programs(
        &store.connection,
        &store.db_path,
        &ProgramFilter {
            active_only: input.active_only,
            search: input.search,
        },
    )?;
    success(
        "program list",
        ProgramList {
            total: rows.len(),
            rows,
        },
    )
}
