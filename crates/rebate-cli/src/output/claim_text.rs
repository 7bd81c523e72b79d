use std::io;

use serde_json::Value;

use super::format::{
    Align, Column, key_value_rows, render_table_or_blocks, terminal_width, value_text,
};

const CLAIM_COLUMNS: [Column<'static>; 6] = [
    Column {
        name: "Claim Ref",
        key: "claim_ref",
        align: Align::Left,
    },
    Column {
        name: "Claim ID",
        key: "claim_id",
        align: Align::Left,
    },
    Column {
        name: "Transaction",
        key: "transaction_id",
        align: Align::Left,
    },
    Column {
        name: "Amount",
        key: "claim_amount",
        align: Align::Right,
    },
    Column {
        name: "Status",
        key: "claim_status",
        align: Align::Left,
    },
    Column {
        name: "Claimed",
        key: "claim_date",
        align: Align::Left,
    },
];

pub fn render_claim(command: &str, data: &Value) -> io::Result<String> {
    let heading = match command {
        "claim create" => "Created rebate claim:",
        _ => "Updated rebate claim:",
    };
    let entries = vec![
        ("Claim Ref", value_text(data, "claim_ref")),
        ("Claim ID", value_text(data, "claim_id")),
        ("Transaction", value_text(data, "transaction_id")),
        ("Amount", value_text(data, "claim_amount")),
        ("Status", value_text(data, "claim_status")),
        ("Claimed", value_text(data, "claim_date")),
        ("Notes", value_text(data, "notes")),
    ];

    let mut lines = vec![heading.to_string(), String::new()];
    lines.extend(key_value_rows(&entries, 2));
    Ok(lines.join("\n"))
}

pub fn render_claim_list(data: &Value) -> io::Result<String> {
    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("claim list output requires rows"))?;

    if rows.is_empty() {
        return Ok([
            "No rebate claims found.",
            "",
            "File one for a recorded transaction:",
            "  rebate claim create <transaction-id>",
        ]
        .join("\n"));
    }

    let mut lines = vec![format!("Rebate claims ({}):", rows.len()), String::new()];
    lines.extend(render_table_or_blocks(
        &CLAIM_COLUMNS,
        rows,
        terminal_width(),
        "Claim",
    ));
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{render_claim, render_claim_list};

    #[test]
    fn created_claim_lists_every_field() {
        let rendered = render_claim(
            "claim create",
            &json!({
                "claim_ref": "clm_1",
                "claim_id": null,
                "transaction_id": "T1",
                "claim_amount": "20.00",
                "claim_status": "pending",
                "claim_date": "2024-01-20T09:30:00Z",
                "notes": null
            }),
        );
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("Created rebate claim:"));
            assert!(text.contains("  Amount       20.00"));
            assert!(text.contains("  Claim ID     -"));
        }
    }

    #[test]
    fn claim_list_renders_table_rows() {
        let rendered = render_claim_list(&json!({
            "total": 1,
            "rows": [{
                "claim_ref": "clm_1",
                "claim_id": "EXT-9",
                "transaction_id": "T1",
                "claim_amount": "20.00",
                "claim_status": "approved",
                "claim_date": "2024-01-20T09:30:00Z",
                "notes": null
            }]
        }));
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("Rebate claims (1):"));
            assert!(text.contains("EXT-9"));
            assert!(text.contains("approved"));
        }
    }

    #[test]
    fn empty_claim_list_points_at_create() {
        let rendered = render_claim_list(&json!({"total": 0, "rows": []}));
        assert!(matches!(rendered, Ok(ref text) if text.contains("rebate claim create")));
    }
}
