use std::cmp;

use serde_json::Value;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub name: &'a str,
    pub key: &'a str,
    pub align: Align,
}

const INDENT: usize = 2;
const COLUMN_GAP: usize = 2;
const MISSING: &str = "-";

pub fn terminal_width() -> usize {
    let from_env = std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(120);
    cmp::max(from_env, 40)
}

/// Display text for `row[key]`: strings as-is, `null` or a missing key as `-`.
pub fn value_text(row: &Value, key: &str) -> String {
    match row.get(key) {
        None | Some(Value::Null) => MISSING.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Bool(flag)) => if *flag { "yes" } else { "no" }.to_string(),
        Some(other) => other.to_string(),
    }
}

pub fn key_value_rows(entries: &[(&str, String)], indent: usize) -> Vec<String> {
    let label_width = entries
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0);
    let padding = " ".repeat(indent);

    entries
        .iter()
        .map(|(label, value)| format!("{padding}{label:<label_width$}  {value}"))
        .collect()
}

/// Renders `rows` as an aligned table, or as one labelled block per row when
/// the table would not fit in `max_width`.
pub fn render_table_or_blocks(
    columns: &[Column<'_>],
    rows: &[Value],
    max_width: usize,
    block_label: &str,
) -> Vec<String> {
    let cells = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| value_text(row, column.key))
                .collect::<Vec<String>>()
        })
        .collect::<Vec<_>>();

    let widths = column_widths(columns, &cells);
    let table_width =
        INDENT + widths.iter().sum::<usize>() + COLUMN_GAP * widths.len().saturating_sub(1);
    if table_width > max_width {
        return render_blocks(columns, &cells, block_label);
    }

    let header = columns
        .iter()
        .map(|column| column.name.to_string())
        .collect::<Vec<_>>();
    let mut output = vec![format_row(columns, &header, &widths)];
    for row in &cells {
        output.push(format_row(columns, row, &widths));
    }
    output
}

fn column_widths(columns: &[Column<'_>], cells: &[Vec<String>]) -> Vec<usize> {
    let mut widths = columns
        .iter()
        .map(|column| column.name.chars().count())
        .collect::<Vec<usize>>();
    for row in cells {
        for (slot, value) in widths.iter_mut().zip(row) {
            *slot = cmp::max(*slot, value.chars().count());
        }
    }
    widths
}

fn format_row(columns: &[Column<'_>], cells: &[String], widths: &[usize]) -> String {
    let pieces = columns
        .iter()
        .zip(cells)
        .zip(widths)
        .map(|((column, value), width)| match column.align {
            Align::Left => format!("{value:<width$}"),
            Align::Right => format!("{value:>width$}"),
        })
        .collect::<Vec<_>>();

    let line = format!("{}{}", " ".repeat(INDENT), pieces.join("  "));
    line.trim_end().to_string()
}

fn render_blocks(columns: &[Column<'_>], cells: &[Vec<String>], block_label: &str) -> Vec<String> {
    let mut output = Vec::new();
    for (index, row) in cells.iter().enumerate() {
        output.push(format!("  {block_label} {}:", index + 1));
        let entries = columns
            .iter()
            .zip(row)
            .map(|(column, value)| (column.name, value.clone()))
            .collect::<Vec<_>>();
        output.extend(key_value_rows(&entries, 4));
        if index + 1 < cells.len() {
            output.push(String::new());
        }
    }
    output
}
