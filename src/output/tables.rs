use chrono::{DateTime, Utc};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table with a cyan header row.
pub fn create_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .iter()
                .map(|label| Cell::new(*label).fg(TableColor::Cyan)),
        );
    table
}

/// Traffic-light colour for a status or result label.
pub fn status_color(status: &str) -> Option<TableColor> {
    match status.to_ascii_lowercase().as_str() {
        "succeeded" | "completed" | "active" | "wellformed" => Some(TableColor::Green),
        "partiallysucceeded" | "inprogress" | "in_progress" | "queued" | "notstarted"
        | "scheduled" | "notdeployed" => Some(TableColor::Yellow),
        "failed" | "rejected" | "canceled" | "cancelled" | "abandoned" => Some(TableColor::Red),
        _ => None,
    }
}

pub fn status_cell(status: &str) -> Cell {
    let cell = Cell::new(status);
    match status_color(status) {
        Some(color) => cell.fg(color),
        None => cell,
    }
}

pub fn timestamp_cell(timestamp: Option<DateTime<Utc>>) -> Cell {
    match timestamp {
        Some(ts) => Cell::new(ts.format("%Y-%m-%d %H:%M")),
        None => Cell::new("-").fg(TableColor::DarkGrey),
    }
}
