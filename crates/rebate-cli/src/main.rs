mod cli;
mod dispatch;
mod output;
mod stdout_io;

use std::process::ExitCode;

use clap::{Parser, error::ErrorKind};
use rebate_client::ClientError;
use stdout_io::write_stdout_text;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "REBATE_LOG";

const ROOT_HELP: &str = "rebate - rebate program, transaction, and claim ledger

Usage:
  rebate <command>

Start here:
  rebate program list
  rebate transaction submit --help
  rebate claim create --help
";

const TOP_LEVEL_HELP: &str = "rebate - rebate program, transaction, and claim ledger

USAGE: rebate <command>

Set up a program:
  rebate program create --name SpringSale --percentage 10 --start 2024-01-01 --end 2024-12-31
  rebate program list                                     Show programs and their windows

Record sales:
  rebate transaction submit <id> --amount 200.00 --date 2024-01-15 --program <program-id>
  rebate transaction show <id>                            Show a transaction with today's rebate
  rebate calculate <id>                                   Compute the rebate a transaction earns today

File and review claims:
  rebate claim create <transaction-id>                    File a claim at the computed amount
  rebate claim update <claim-ref> --status approved       Approve or reject a claim
  rebate claim list --status pending                      Show claims awaiting review

Report:
  rebate report --from 2024-01-01 --to 2024-01-31         Claim count and approved total (cached 10 minutes)

Data lives in ~/.rebate/rebate.db unless REBATE_HOME is set.
Add --json to any command for machine-readable output, and
run `rebate <command> --help` for command usage.
";

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(code) => code,
    }
}

/// Diagnostics go to stderr so stdout stays parseable with `--json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<ExitCode, ExitCode> {
    let raw_args = std::env::args().collect::<Vec<String>>();
    if raw_args.len() == 1 {
        if write_stdout_text(ROOT_HELP).is_err() {
            return Err(ExitCode::from(2));
        }
        return Ok(ExitCode::SUCCESS);
    }
    let parsed = cli::Cli::try_parse();
    let cli = match parsed {
        Ok(value) => value,
        Err(err) => return handle_parse_error(&err, &raw_args),
    };
    let mode = output::mode_for_command(&cli.command);

    match dispatch::dispatch(&cli) {
        Ok(success) => {
            if output::print_success(&success, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            tracing::debug!(code = %error.code, "command failed");
            if output::print_failure(&error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(exit_code_for_error(&error))
        }
    }
}

fn handle_parse_error(err: &clap::Error, raw_args: &[String]) -> Result<ExitCode, ExitCode> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            let text = if is_top_level_help_request(raw_args) {
                TOP_LEVEL_HELP.to_string()
            } else {
                err.to_string()
            };
            if write_stdout_text(&text).is_err() {
                return Err(ExitCode::from(2));
            }
            return Ok(ExitCode::SUCCESS);
        }
        ErrorKind::DisplayVersion => {
            if write_stdout_text(&err.to_string()).is_err() {
                return Err(ExitCode::from(2));
            }
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let command_hint = if matches!(
        err.kind(),
        ErrorKind::MissingRequiredArgument
            | ErrorKind::InvalidValue
            | ErrorKind::ValueValidation
            | ErrorKind::WrongNumberOfValues
            | ErrorKind::UnknownArgument
            | ErrorKind::InvalidSubcommand
            | ErrorKind::ArgumentConflict
    ) {
        command_path_from_args(raw_args)
    } else {
        None
    };
    let clean_message = strip_clap_boilerplate(&err.to_string());
    let parse_error = ClientError::invalid_argument_for_command(&clean_message, command_hint);
    let mode = infer_requested_output_mode(raw_args);
    if output::print_failure(&parse_error, mode).is_err() {
        return Err(ExitCode::from(2));
    }
    Err(ExitCode::from(1))
}

fn is_top_level_help_request(raw_args: &[String]) -> bool {
    raw_args.len() == 2 && matches!(raw_args[1].as_str(), "--help" | "-h")
}

/// Strips clap's trailing boilerplate (Usage line, "For more information" hint)
/// so our "What to do next" section is the single source of guidance.
fn strip_clap_boilerplate(message: &str) -> String {
    let trimmed = if let Some(pos) = message.find("\n\nUsage:") {
        &message[..pos]
    } else if let Some(pos) = message.find("\nFor more information") {
        &message[..pos]
    } else {
        message
    };
    trimmed.trim_end().to_string()
}

/// Maps raw CLI args to the subcommand path used in help hints, such as
/// "claim create" or "program".
fn command_path_from_args(raw_args: &[String]) -> Option<&'static str> {
    let non_flags: Vec<&str> = raw_args
        .iter()
        .skip(1)
        .filter(|value| !value.starts_with('-'))
        .map(String::as_str)
        .collect();

    match non_flags.as_slice() {
        ["program", "create", ..] => Some("program create"),
        ["program", "update", ..] => Some("program update"),
        ["program", "delete", ..] => Some("program delete"),
        ["program", "list", ..] => Some("program list"),
        ["program", ..] => Some("program"),
        ["transaction", "submit", ..] => Some("transaction submit"),
        ["transaction", "update", ..] => Some("transaction update"),
        ["transaction", "show", ..] => Some("transaction show"),
        ["transaction", "list", ..] => Some("transaction list"),
        ["transaction", "delete", ..] => Some("transaction delete"),
        ["transaction", ..] => Some("transaction"),
        ["claim", "create", ..] => Some("claim create"),
        ["claim", "update", ..] => Some("claim update"),
        ["claim", "list", ..] => Some("claim list"),
        ["claim", ..] => Some("claim"),
        ["calculate", ..] => Some("calculate"),
        ["report", ..] => Some("report"),
        _ => None,
    }
}

fn exit_code_for_error(error: &ClientError) -> ExitCode {
    if error.is_caller_error() {
        ExitCode::from(1)
    } else {
        ExitCode::from(2)
    }
}

fn infer_requested_output_mode(raw_args: &[String]) -> output::OutputMode {
    if raw_args.iter().skip(1).any(|value| value == "--json") {
        return output::OutputMode::Json;
    }
    output::OutputMode::Text
}
