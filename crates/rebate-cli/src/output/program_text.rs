use std::io;

use serde_json::Value;

use super::format::{
    Align, Column, key_value_rows, render_table_or_blocks, terminal_width, value_text,
};

const PROGRAM_COLUMNS: [Column<'static>; 6] = [
    Column {
        name: "Program ID",
        key: "program_id",
        align: Align::Left,
    },
    Column {
        name: "Name",
        key: "program_name",
        align: Align::Left,
    },
    Column {
        name: "Rebate %",
        key: "rebate_percentage",
        align: Align::Right,
    },
    Column {
        name: "Start",
        key: "start_date",
        align: Align::Left,
    },
    Column {
        name: "End",
        key: "end_date",
        align: Align::Left,
    },
    Column {
        name: "Active",
        key: "is_active",
        align: Align::Left,
    },
];

pub fn render_program(command: &str, data: &Value) -> io::Result<String> {
    let heading = match command {
        "program create" => "Created rebate program:",
        _ => "Updated rebate program:",
    };
    let mut lines = vec![heading.to_string(), String::new()];
    lines.extend(program_detail_rows(data));
    Ok(lines.join("\n"))
}

pub fn render_program_deletion(data: &Value) -> io::Result<String> {
    let program_id = data
        .get("program_id")
        .and_then(Value::as_str)
        .ok_or_else(|| io::Error::other("program delete output requires program_id"))?;
    let detached = data
        .get("detached_transactions")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    let mut lines = vec![format!("Deleted rebate program {program_id}.")];
    if detached > 0 {
        lines.push(format!(
            "{detached} linked transaction(s) now have no program and earn no rebate."
        ));
    }
    Ok(lines.join("\n"))
}

pub fn render_program_list(data: &Value) -> io::Result<String> {
    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("program list output requires rows"))?;

    if rows.is_empty() {
        return Ok([
            "No rebate programs found.",
            "",
            "Create one first:",
            "  rebate program create --name <name> --percentage <pct> --start <date> --end <date>",
        ]
        .join("\n"));
    }

    let mut lines = vec![format!("Rebate programs ({}):", rows.len()), String::new()];
    lines.extend(render_table_or_blocks(
        &PROGRAM_COLUMNS,
        rows,
        terminal_width(),
        "Program",
    ));
    Ok(lines.join("\n"))
}

fn program_detail_rows(data: &Value) -> Vec<String> {
    key_value_rows(
        &[
            ("Program ID", value_text(data, "program_id")),
            ("Name", value_text(data, "program_name")),
            ("Rebate", format!("{}%", value_text(data, "rebate_percentage"))),
            (
                "Window",
                format!(
                    "{} to {}",
                    value_text(data, "start_date"),
                    value_text(data, "end_date")
                ),
            ),
            ("Active", value_text(data, "is_active")),
            ("Eligibility", value_text(data, "eligibility_criteria")),
        ],
        2,
    )
}
