use std::io;

use rebate_client::{ClientError, SuccessEnvelope};
use serde::Serialize;
use serde_json::{Value, json};

const JSON_VERSION: &str = "v1";

pub fn render_success_json(success: &SuccessEnvelope) -> io::Result<String> {
    let value = match success.command.as_str() {
        "program list" | "transaction list" | "claim list" => render_list_json(&success.data),
        "program create" | "program update" | "program delete" | "transaction submit"
        | "transaction update" | "transaction show" | "transaction delete" | "calculate"
        | "claim create" | "claim update" | "report" => {
            render_envelope_json(&success.command, &success.data)
        }
        _ => {
            return Err(io::Error::other(format!(
                "JSON output is not supported for command `{}`",
                success.command
            )));
        }
    };

    serialize_json_pretty(&value)
}

pub fn render_error_json(error: &ClientError) -> io::Result<String> {
    let mut payload = json!({
        "error": {
            "code": error.code,
            "message": error.message,
            "recovery_steps": error.recovery_steps,
        }
    });
    if let Some(data) = &error.data {
        payload["error"]["details"] = data.clone();
    }
    serialize_json_pretty(&payload)
}

fn render_envelope_json(command: &str, data: &Value) -> Value {
    json!({
        "ok": true,
        "command": command,
        "version": JSON_VERSION,
        "data": data.clone()
    })
}

/// List commands print the bare row array.
fn render_list_json(data: &Value) -> Value {
    Value::Array(
        data.get("rows")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    )
}

fn serialize_json_pretty<T>(value: &T) -> io::Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(value).map_err(io::Error::other)
}
