use std::io;

use serde_json::Value;

use super::format::{key_value_rows, value_text};

pub fn render_report(data: &Value) -> io::Result<String> {
    if data.get("total_claims").is_none() {
        return Err(io::Error::other("report output requires total_claims"));
    }
    let entries = [
        ("Total claims", value_text(data, "total_claims")),
        ("Approved amount", value_text(data, "total_approved_amount")),
    ];

    let mut lines = vec!["Rebate claim report:".to_string(), String::new()];
    lines.extend(key_value_rows(&entries, 2));
    Ok(lines.join("\n"))
}
