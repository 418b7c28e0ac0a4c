//! CLI presentation: text and json formatters per command family.

mod check;
mod records;

pub use check::{format_density_reports_json, format_density_reports_text};
pub use records::{
    format_destroy_summary, format_move_result, format_record, format_record_list,
    format_section_heading,
};
