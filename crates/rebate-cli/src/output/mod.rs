mod claim_text;
mod error_text;
mod format;
mod json;
mod mode;
mod program_text;
mod report_text;
mod transaction_text;

use std::io;

use rebate_client::{ClientError, SuccessEnvelope};

use crate::stdout_io::write_stdout_line;

pub use mode::{OutputMode, mode_for_command};

pub fn print_success(success: &SuccessEnvelope, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Text => render_text_success(success)?,
        OutputMode::Json => json::render_success_json(success)?,
    };
    write_stdout_line(&body)
}

pub fn print_failure(error: &ClientError, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Json => json::render_error_json(error)?,
        OutputMode::Text => error_text::render_error(error),
    };
    write_stdout_line(&body)
}

fn render_text_success(success: &SuccessEnvelope) -> io::Result<String> {
    let data = &success.data;
    match success.command.as_str() {
        "program create" | "program update" => program_text::render_program(&success.command, data),
        "program delete" => program_text::render_program_deletion(data),
        "program list" => program_text::render_program_list(data),
        "transaction submit" | "transaction update" | "transaction show" => {
            transaction_text::render_transaction(&success.command, data)
        }
        "transaction delete" => transaction_text::render_transaction_deletion(data),
        "transaction list" => transaction_text::render_transaction_list(data),
        "calculate" => transaction_text::render_calculation(data),
        "claim create" | "claim update" => claim_text::render_claim(&success.command, data),
        "claim list" => claim_text::render_claim_list(data),
        "report" => report_text::render_report(data),
        _ => Err(io::Error::other(format!(
            "unsupported text output command `{}`",
            success.command
        ))),
    }
}
