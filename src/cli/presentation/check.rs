//! Density check presentation.

use crate::engine::DensityReport;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

pub fn format_density_reports_text(reports: &[DensityReport]) -> String {
    if reports.is_empty() {
        return "No kinds configured.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Kind", "Groups", "Records", "Status"]);
    for report in reports {
        let status = if report.is_dense() {
            format!("{}", "dense".green())
        } else {
            format!("{}", format!("{} broken group(s)", report.violations.len()).red())
        };
        table.add_row(vec![
            report.kind.clone(),
            report.groups.to_string(),
            report.records.to_string(),
            status,
        ]);
    }

    let mut out = table.to_string();
    for report in reports.iter().filter(|r| !r.is_dense()) {
        for violation in &report.violations {
            let scope = violation
                .scope
                .iter()
                .map(|(attr, value)| format!("{}={}", attr, value))
                .collect::<Vec<_>>()
                .join(", ");
            let positions = violation
                .positions
                .iter()
                .map(|(id, p)| match p {
                    Some(p) => format!("{}:{}", id, p),
                    None => format!("{}:-", id),
                })
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!("\n{}[{}]: {}", report.kind, scope, positions));
        }
    }
    out
}

pub fn format_density_reports_json(reports: &[DensityReport]) -> String {
    let dense = reports.iter().all(DensityReport::is_dense);
    let out = json!({ "dense": dense, "kinds": reports });
    serde_json::to_string_pretty(&out).unwrap_or_else(|_| "{}".to_string())
}
