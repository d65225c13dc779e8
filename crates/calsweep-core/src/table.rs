//! In-memory tabular dataset of event rows.
//!
//! [`EventTable`] is what the fetch pipeline hands back: a fixed set of
//! columns ([`COLUMNS`]) and one [`EventRow`] per event, with rendering to an
//! aligned text table or JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::event::EventRow;

/// Column names, in display and storage order.
pub const COLUMNS: [&str; 7] = [
    "id",
    "calendar_id",
    "summary",
    "start_time",
    "end_time",
    "guests",
    "created_at",
];

/// Placeholder rendered for null cells.
const NULL_CELL: &str = "-";

/// How an [`EventTable`] is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned plain-text columns.
    #[default]
    Table,
    /// Pretty-printed JSON array of rows.
    Json,
}

/// A tabular collection of event rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EventTable {
    rows: Vec<EventRow>,
}

impl EventTable {
    pub fn new(rows: Vec<EventRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EventRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the table in the requested format.
    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Table => Ok(self.render_text()),
            OutputFormat::Json => serde_json::to_string_pretty(self),
        }
    }

    fn render_text(&self) -> String {
        if self.rows.is_empty() {
            return format!("Empty table\nColumns: {}", COLUMNS.join(", "));
        }

        let cells: Vec<[String; 7]> = self.rows.iter().map(row_cells).collect();

        let mut widths = COLUMNS.map(|c| c.chars().count());
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        push_line(&mut out, COLUMNS.iter().copied(), &widths);
        for row in &cells {
            push_line(&mut out, row.iter().map(String::as_str), &widths);
        }
        out.push_str(&format!(
            "[{} rows x {} columns]",
            self.rows.len(),
            COLUMNS.len()
        ));
        out
    }
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize; 7]) {
    let line = cells
        .zip(widths.iter())
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn row_cells(row: &EventRow) -> [String; 7] {
    [
        row.id.clone(),
        row.calendar_id.clone(),
        row.summary.clone().unwrap_or_else(|| NULL_CELL.to_string()),
        timestamp_cell(row.start_time),
        timestamp_cell(row.end_time),
        row.guests.clone(),
        timestamp_cell(row.created_at),
    ]
}

fn timestamp_cell(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| NULL_CELL.to_string())
}
