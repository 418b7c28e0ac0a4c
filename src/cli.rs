//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; a single route table dispatches to the ordering API.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{parse_assignment, Cli, Commands, MoveDirection};
pub use presentation::{
    format_density_reports_json, format_density_reports_text, format_destroy_summary,
    format_move_result, format_record, format_record_list, format_section_heading,
};
pub use route::RunContext;
