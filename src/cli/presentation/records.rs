//! Record presentation: single records, position lists, move and destroy results.

use crate::lifecycle::DestroySummary;
use crate::types::OrderedRecord;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn position_cell(record: &OrderedRecord) -> String {
    record
        .position
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn attributes_cell(record: &OrderedRecord) -> String {
    record
        .attributes
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_record(record: &OrderedRecord, json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(record).unwrap_or_else(|_| "{}".to_string());
    }
    let mut out = format!("{} {}\n", record.kind, record.id);
    out.push_str(&format!("  Position: {}\n", position_cell(record)));
    if !record.attributes.is_empty() {
        out.push_str(&format!("  Attributes: {}", attributes_cell(record)));
    }
    out.trim_end().to_string()
}

pub fn format_record_list(kind: &str, records: &[OrderedRecord], json: bool) -> String {
    if json {
        let out = json!({ "kind": kind, "records": records, "total": records.len() });
        return serde_json::to_string_pretty(&out).unwrap_or_else(|_| "{}".to_string());
    }
    if records.is_empty() {
        return format!("No '{}' records found.", kind);
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Position", "ID", "Attributes"]);
    for record in records {
        table.add_row(vec![
            position_cell(record),
            record.id.to_string(),
            attributes_cell(record),
        ]);
    }
    format!(
        "{}\n\n{}\n\nTotal: {} record(s)",
        format_section_heading(kind),
        table,
        records.len()
    )
}

/// Result of a move: whether it applied and the record's group afterwards
pub fn format_move_result(record: &OrderedRecord, moved: bool, group: &[OrderedRecord], json: bool) -> String {
    if json {
        let out = json!({ "id": record.id, "moved": moved, "position": record.position, "group": group });
        return serde_json::to_string_pretty(&out).unwrap_or_else(|_| "{}".to_string());
    }
    let status = if moved {
        format!("{}", "moved".green())
    } else {
        format!("{}", "not moved".yellow())
    };
    let mut out = format!("{} {}: {}, position {}\n\n", record.kind, record.id, status, position_cell(record));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Position", "ID"]);
    for sibling in group {
        let marker = if sibling.id == record.id { " *" } else { "" };
        table.add_row(vec![position_cell(sibling), format!("{}{}", sibling.id, marker)]);
    }
    out.push_str(&table.to_string());
    out
}

pub fn format_destroy_summary(summary: &DestroySummary, json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string());
    }
    let mut out = format!("Destroyed {} record(s)", summary.destroyed.len());
    for id in &summary.destroyed {
        out.push_str(&format!("\n  - {}", id));
    }
    if !summary.nullified.is_empty() {
        out.push_str(&format!("\nDetached {} record(s)", summary.nullified.len()));
        for id in &summary.nullified {
            out.push_str(&format!("\n  - {}", id));
        }
    }
    out
}
