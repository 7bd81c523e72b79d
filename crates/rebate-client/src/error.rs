use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn invalid_argument_for_command(message: &str, command: Option<&str>) -> Self {
        let help_hint = match command {
            Some(cmd) => format!("Run `rebate {cmd} --help` for usage."),
            None => "Run `rebate --help` for usage.".to_string(),
        };
        let error = Self::new("invalid_argument", message, vec![help_hint]);
        if let Some(cmd) = command {
            return error.with_data(json!({
                "command_hint": cmd,
            }));
        }
        error
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    /// A field constraint or date-window violation. `field` names the input
    /// that failed so callers can point at it.
    pub fn validation(field: &str, message: &str) -> Self {
        Self::new(
            "validation_error",
            message,
            vec![format!("Fix `{field}` and retry; nothing was written.")],
        )
        .with_data(json!({
            "field": field,
        }))
    }

    pub fn date_outside_program_window(
        transaction_date: &str,
        program_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Self {
        Self::new(
            "validation_error",
            "Transaction date must be within the start and end dates of the associated rebate program.",
            vec![
                format!("Use a transaction date between {start_date} and {end_date}."),
                "Or submit the transaction without a rebate program.".to_string(),
            ],
        )
        .with_data(json!({
            "field": "transaction_date",
            "transaction_date": transaction_date,
            "rebate_program_id": program_id,
            "program_start_date": start_date,
            "program_end_date": end_date,
        }))
    }

    pub fn duplicate_claim(transaction_id: &str, existing_claim_ref: &str) -> Self {
        Self::new(
            "duplicate_claim",
            &format!("A rebate claim already exists for transaction `{transaction_id}`."),
            vec![
                format!("Run `rebate claim list --search {transaction_id}` to inspect it."),
                "Update the existing claim instead of creating a new one.".to_string(),
            ],
        )
        .with_data(json!({
            "transaction_id": transaction_id,
            "existing_claim_ref": existing_claim_ref,
        }))
    }

    pub fn program_not_found(program_id: &str) -> Self {
        Self::not_found(
            "program",
            program_id,
            "Run `rebate program list` to find a valid program id.",
        )
    }

    pub fn transaction_not_found(transaction_id: &str) -> Self {
        Self::not_found(
            "transaction",
            transaction_id,
            "Run `rebate transaction list` to find a valid transaction id.",
        )
    }

    pub fn claim_not_found(claim_ref: &str) -> Self {
        Self::not_found(
            "claim",
            claim_ref,
            "Run `rebate claim list` to find a valid claim reference.",
        )
    }

    fn not_found(entity: &str, id: &str, hint: &str) -> Self {
        let mut label = entity.to_string();
        if let Some(first) = label.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        Self::new(
            "not_found",
            &format!("{label} `{id}` was not found."),
            vec![hint.to_string()],
        )
        .with_data(json!({
            "entity": entity,
            "id": id,
        }))
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    pub fn store_init_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_init_permission_denied",
            &format!("Cannot initialize rebate store at `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or set `REBATE_HOME` to a writable directory."
            )],
        )
    }

    pub fn store_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_locked",
            &format!("Rebate database is locked at `{location}`."),
            vec![format!(
                "Close other processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn store_corrupt(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_corrupt",
            &format!("Rebate database appears corrupt at `{location}`."),
            vec![format!(
                "Replace `{location}` with a valid SQLite rebate store or restore from backup."
            )],
        )
    }

    pub fn migration_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "migration_failed",
            &format!("Rebate store migration failed at `{location}`: {detail}"),
            vec!["Resolve conflicting schema objects referenced in the error details.".to_string()],
        )
    }

    pub fn store_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_init_failed",
            &format!("Rebate store operation failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }

    pub fn is_caller_error(&self) -> bool {
        matches!(
            self.code.as_str(),
            "invalid_argument" | "validation_error" | "duplicate_claim" | "not_found"
        )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
