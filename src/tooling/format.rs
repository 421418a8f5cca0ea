//! Text rendering of admin command results.

use crate::action::Action;
use crate::domain::FieldOption;
use crate::record::{Record, RecordSchema};
use crate::store::TableStatus;
use crate::types::NodeId;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;

/// One line of the ordered tree listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeRow {
    pub id: NodeId,
    pub kind: String,
    pub parent_id: Option<NodeId>,
    pub depth: usize,
    pub title: String,
    pub description: String,
    /// Numeric sort key, as text since it may exceed 64 bits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
}

/// Cut `text` to at most `max_chars` characters, marking the cut with "..."
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Short label for a record kind
pub fn kind_label(kind: &str) -> &str {
    match kind {
        "FMEA_Function" => "function",
        "FMEA_Failure_Mode" => "failure mode",
        "FMEA_Action" => "action",
        "FMEA_Domain" => "domain",
        other => other,
    }
}

pub fn status_label(status: &Option<TableStatus>) -> String {
    match status {
        Some(TableStatus::Created) => "created".to_string(),
        Some(TableStatus::Exists) => "ok".to_string(),
        Some(TableStatus::Conflict(diff)) => format!(
            "conflict: {} missing, {} unexpected, {} retyped",
            diff.missing.len(),
            diff.unexpected.len(),
            diff.retyped.len()
        ),
        None => "error".to_string(),
    }
}

pub fn format_table_status_text(statuses: &[(&'static RecordSchema, Option<TableStatus>)]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Table", "Version", "Status"]);
    for (schema, status) in statuses {
        table.add_row(vec![
            schema.table(),
            schema.version.to_string(),
            status_label(status),
        ]);
    }
    format!("{}", table)
}

pub fn format_sheets_text(sheets: &[Record]) -> String {
    if sheets.is_empty() {
        return "No sheets.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Id", "Title", "Author", "Created", "Asset"]);
    for sheet in sheets {
        table.add_row(vec![
            sheet.id().map(|id| id.to_string()).unwrap_or_default(),
            sheet.text("title").unwrap_or_default().to_string(),
            sheet.text("sheet_author").unwrap_or_default().to_string(),
            sheet.text("sheet_created").unwrap_or_default().to_string(),
            sheet.text("asset_name").unwrap_or_default().to_string(),
        ]);
    }
    format!("{}", table)
}

pub fn format_tree_text(rows: &[TreeRow], unplaced: &[NodeId], with_keys: bool) -> String {
    let mut out = String::new();
    if rows.is_empty() {
        out.push_str("Empty tree.\n");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        let mut header = vec!["Id", "Kind", "Title", "Description"];
        if with_keys {
            header.push("Sort key");
        }
        table.set_header(header);
        for row in rows {
            let mut cells = vec![
                row.id.to_string(),
                row.kind.clone(),
                format!("{}{}", "  ".repeat(row.depth), row.title),
                row.description.clone(),
            ];
            if with_keys {
                cells.push(row.sort_key.clone().unwrap_or_else(|| "-".to_string()));
            }
            table.add_row(cells);
        }
        out.push_str(&format!("{}\n", table));
    }
    if !unplaced.is_empty() {
        let ids: Vec<String> = unplaced.iter().map(|id| id.to_string()).collect();
        out.push_str(&format!("Unplaced: {}\n", ids.join(", ")));
    }
    out
}

pub fn format_actions_text(actions: &[&Action], max_chars: usize) -> String {
    if actions.is_empty() {
        return "No actions.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Id", "Title", "Category", "Attached to"]);
    for action in actions {
        let record = action.record();
        table.add_row(vec![
            action.id().map(|id| id.to_string()).unwrap_or_default(),
            truncate_chars(record.text("title").unwrap_or_default(), max_chars),
            record.text("category").unwrap_or_default().to_string(),
            action.parents().to_string(),
        ]);
    }
    format!("{}", table)
}

pub fn format_options_text(options: &[FieldOption]) -> String {
    if options.is_empty() {
        return "No options.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Value", "Title", "Color"]);
    for option in options {
        table.add_row(vec![
            option.value.clone(),
            option.title.clone(),
            option.color.clone().unwrap_or_default(),
        ]);
    }
    format!("{}", table)
}
