use rebate_client::commands::claim::{ClaimCreateInput, ClaimListInput, ClaimUpdateInput};
use rebate_client::commands::program::{ProgramCreateInput, ProgramListInput, ProgramUpdateInput};
use rebate_client::commands::report::ReportInput;
use rebate_client::commands::transaction::{TransactionSubmitInput, TransactionUpdateInput};
use rebate_client::commands::{self, CommandContext};
use rebate_client::{ClientResult, SuccessEnvelope};

use crate::cli::{ClaimCommand, Cli, Commands, IsoDate, ProgramCommand, TransactionCommand};

pub fn dispatch(cli: &Cli) -> ClientResult<SuccessEnvelope> {
    dispatch_with_context(cli, &CommandContext::default())
}

pub fn dispatch_with_context(
    cli: &Cli,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    match &cli.command {
        Commands::Program { command } => dispatch_program(command, context),
        Commands::Transaction { command } => dispatch_transaction(command, context),
        Commands::Calculate { transaction_id, .. } => {
            commands::calculate::run_with_context(transaction_id, context)
        }
        Commands::Claim { command } => dispatch_claim(command, context),
        Commands::Report { from, to, .. } => commands::report::run_with_context(
            ReportInput {
                start_date: from.as_str().to_string(),
                end_date: to.as_str().to_string(),
            },
            context,
        ),
    }
}

fn dispatch_program(
    command: &ProgramCommand,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    match command {
        ProgramCommand::Create {
            name,
            percentage,
            start,
            end,
            eligibility,
            inactive,
            json: _,
        } => commands::program::create_with_context(
            ProgramCreateInput {
                program_name: name.clone(),
                rebate_percentage: percentage.clone(),
                start_date: start.as_str().to_string(),
                end_date: end.as_str().to_string(),
                eligibility_criteria: eligibility.clone(),
                is_active: !*inactive,
            },
            context,
        ),
        ProgramCommand::Update {
            program_id,
            name,
            percentage,
            start,
            end,
            eligibility,
            clear_eligibility,
            active,
            json: _,
        } => commands::program::update_with_context(
            ProgramUpdateInput {
                program_id: program_id.clone(),
                program_name: name.clone(),
                rebate_percentage: percentage.clone(),
                start_date: start.as_ref().map(date_string),
                end_date: end.as_ref().map(date_string),
                eligibility_criteria: eligibility.clone(),
                clear_eligibility_criteria: *clear_eligibility,
                is_active: *active,
            },
            context,
        ),
        ProgramCommand::Delete { program_id, .. } => {
            commands::program::delete_with_context(program_id, context)
        }
        ProgramCommand::List {
            active_only,
            search,
            json: _,
        } => commands::program::list_with_context(
            ProgramListInput {
                active_only: *active_only,
                search: search.clone(),
            },
            context,
        ),
    }
}

fn dispatch_transaction(
    command: &TransactionCommand,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    match command {
        TransactionCommand::Submit {
            transaction_id,
            amount,
            date,
            program,
            json: _,
        } => commands::transaction::submit_with_context(
            TransactionSubmitInput {
                transaction_id: transaction_id.clone(),
                amount: amount.clone(),
                transaction_date: date.clone(),
                rebate_program_id: program.clone(),
            },
            context,
        ),
        TransactionCommand::Update {
            transaction_id,
            amount,
            date,
            program,
            detach_program,
            json: _,
        } => commands::transaction::update_with_context(
            TransactionUpdateInput {
                transaction_id: transaction_id.clone(),
                amount: amount.clone(),
                transaction_date: date.clone(),
                rebate_program_id: program.clone(),
                detach_program: *detach_program,
            },
            context,
        ),
        TransactionCommand::Show { transaction_id, .. } => {
            commands::transaction::show_with_context(transaction_id, context)
        }
        TransactionCommand::List { program, .. } => {
            commands::transaction::list_with_context(program.clone(), context)
        }
        TransactionCommand::Delete { transaction_id, .. } => {
            commands::transaction::delete_with_context(transaction_id, context)
        }
    }
}

fn dispatch_claim(
    command: &ClaimCommand,
    context: &CommandContext<'_>,
) -> ClientResult<SuccessEnvelope> {
    match command {
        ClaimCommand::Create {
            transaction_id,
            claim_id,
            amount,
            status,
            notes,
            json: _,
        } => commands::claim::create_with_context(
            ClaimCreateInput {
                transaction_id: transaction_id.clone(),
                claim_id: claim_id.clone(),
                claim_amount: amount.clone(),
                claim_status: status.clone(),
                notes: notes.clone(),
            },
            context,
        ),
        ClaimCommand::Update {
            claim_ref,
            transaction,
            claim_id,
            clear_claim_id,
            status,
            notes,
            clear_notes,
            json: _,
        } => commands::claim::update_with_context(
            ClaimUpdateInput {
                claim_ref: claim_ref.clone(),
                transaction_id: transaction.clone(),
                claim_id: claim_id.clone(),
                clear_claim_id: *clear_claim_id,
                claim_status: status.clone(),
                notes: notes.clone(),
                clear_notes: *clear_notes,
            },
            context,
        ),
        ClaimCommand::List { status, search, .. } => commands::claim::list_with_context(
            ClaimListInput {
                claim_status: status.clone(),
                search: search.clone(),
            },
            context,
        ),
    }
}

fn date_string(date: &IsoDate) -> String {
    date.as_str().to_string()
}
