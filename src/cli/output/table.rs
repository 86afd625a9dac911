//! Table output formatting for CLI commands
//!
//! Renders endpoints, failures, run history and daily trends with
//! comfy-table. Colors are dropped when `NO_COLOR` is set or the terminal
//! is dumb.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::{DailyTrend, Endpoint, Failure, RunRecord, RunStatus};

use super::truncate;

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    pub fn format_endpoints(&self, endpoints: &[Endpoint]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Method", "Path"]));

        for endpoint in endpoints {
            let method = if self.use_colors {
                Cell::new(&endpoint.method).fg(method_color(&endpoint.method))
            } else {
                Cell::new(&endpoint.method)
            };
            table.add_row(vec![method, Cell::new(&endpoint.path)]);
        }

        table.to_string()
    }

    pub fn format_failures(&self, failures: &[Failure]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Test", "Location", "Message"]));

        for failure in failures {
            let message = Cell::new(truncate(failure.display_message(), 80));
            let message = if self.use_colors {
                message.fg(Color::Red)
            } else {
                message
            };
            table.add_row(vec![
                Cell::new(&failure.test_id),
                Cell::new(failure.location()),
                message,
            ]);
        }

        table.to_string()
    }

    pub fn format_history(&self, history: &[RunRecord]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Timestamp", "Project", "Status", "Score", "Passed", "Failed"]));

        for record in history {
            let label = match record.status {
                RunStatus::Passed => "passed",
                RunStatus::Failed => "failed",
            };
            let status = if self.use_colors {
                Cell::new(label).fg(run_status_color(record.status))
            } else {
                Cell::new(label)
            };
            table.add_row(vec![
                Cell::new(&record.timestamp),
                Cell::new(truncate(&record.project_name, 30)),
                status,
                Cell::new(format_score(record.score)),
                Cell::new(record.summary.passed),
                Cell::new(record.summary.failed + record.summary.error),
            ]);
        }

        table.to_string()
    }

    pub fn format_trend(&self, trend: &[DailyTrend]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Date", "Passed", "Failed"]));

        for day in trend {
            table.add_row(vec![
                Cell::new(day.date),
                Cell::new(day.passed),
                Cell::new(day.failed),
            ]);
        }

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }
        if !self.use_colors {
            table.force_no_tty();
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Scores are unbounded rewards and may be negative.
pub fn format_score(score: f64) -> String {
    format!("{score:.2}")
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).add_attribute(Attribute::Bold))
        .collect()
}

fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

fn method_color(method: &str) -> Color {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Color::Green,
        "POST" => Color::Cyan,
        "PUT" | "PATCH" => Color::Yellow,
        "DELETE" => Color::Red,
        _ => Color::White,
    }
}

const fn run_status_color(status: RunStatus) -> Color {
    match status {
        RunStatus::Passed => Color::Green,
        RunStatus::Failed => Color::Red,
    }
}
