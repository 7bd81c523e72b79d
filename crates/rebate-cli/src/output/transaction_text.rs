use std::io;

use serde_json::Value;

use super::format::{
    Align, Column, key_value_rows, render_table_or_blocks, terminal_width, value_text,
};

const TRANSACTION_COLUMNS: [Column<'static>; 4] = [
    Column {
        name: "Transaction",
        key: "transaction_id",
        align: Align::Left,
    },
    Column {
        name: "Amount",
        key: "amount",
        align: Align::Right,
    },
    Column {
        name: "Date",
        key: "transaction_date",
        align: Align::Left,
    },
    Column {
        name: "Program",
        key: "rebate_program_id",
        align: Align::Left,
    },
];

pub fn render_transaction(command: &str, data: &Value) -> io::Result<String> {
    let heading = match command {
        "transaction submit" => "Recorded transaction:",
        "transaction update" => "Updated transaction:",
        _ => "Transaction:",
    };
    let mut entries = transaction_entries(data);
    if data.get("rebate_amount").is_some() {
        entries.push(("Rebate today", value_text(data, "rebate_amount")));
    }

    let mut lines = vec![heading.to_string(), String::new()];
    lines.extend(key_value_rows(&entries, 2));
    Ok(lines.join("\n"))
}

pub fn render_transaction_deletion(data: &Value) -> io::Result<String> {
    let transaction_id = data
        .get("transaction_id")
        .and_then(Value::as_str)
        .ok_or_else(|| io::Error::other("transaction delete output requires transaction_id"))?;
    let claims_removed = data
        .get("claims_removed")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    let mut lines = vec![format!("Deleted transaction {transaction_id}.")];
    if claims_removed > 0 {
        lines.push("Its rebate claim was deleted with it.".to_string());
    }
    Ok(lines.join("\n"))
}

pub fn render_transaction_list(data: &Value) -> io::Result<String> {
    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("transaction list output requires rows"))?;

    if rows.is_empty() {
        return Ok([
            "No transactions found.",
            "",
            "Record one first:",
            "  rebate transaction submit <transaction-id> --amount <amount> --date <date>",
        ]
        .join("\n"));
    }

    let mut lines = vec![format!("Transactions ({}):", rows.len()), String::new()];
    lines.extend(render_table_or_blocks(
        &TRANSACTION_COLUMNS,
        rows,
        terminal_width(),
        "Transaction",
    ));
    Ok(lines.join("\n"))
}

pub fn render_calculation(data: &Value) -> io::Result<String> {
    let transaction_id = data
        .get("transaction_id")
        .and_then(Value::as_str)
        .ok_or_else(|| io::Error::other("calculate output requires transaction_id"))?;
    Ok(format!(
        "Rebate for transaction {transaction_id}: {}",
        value_text(data, "rebate_amount")
    ))
}

fn transaction_entries(data: &Value) -> Vec<(&'static str, String)> {
    vec![
        ("Transaction", value_text(data, "transaction_id")),
        ("Amount", value_text(data, "amount")),
        ("Date", value_text(data, "transaction_date")),
        ("Program", value_text(data, "rebate_program_id")),
    ]
}
