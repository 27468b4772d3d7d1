//! Output formatting for CLI results

pub mod display;
pub mod formatters;
pub mod json;
pub mod table;

pub use json::print_json;
pub use table::format_table;
