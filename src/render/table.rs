//! Markdown table rendering.

use crate::core::{ScanError, Verdict};
use crate::render::Renderer;

use std::fmt::Write;

const HEADER: [&str; 5] = ["Infected", "Result", "Engine", "Definitions", "Updated"];
const EMPTY_CELL: &str = "-";
const CLEAN_RESULT: &str = "No";

/// Renders a single-row Markdown table under a `####` heading.
///
/// ```text
/// #### McAfee
///
/// | Infected | Result | Engine | Definitions | Updated |
/// |----------|--------|--------|-------------|---------|
/// | true | EICAR-Test-File | 6.0.4.564 | 9324 | 20260110 |
/// ```
#[derive(Debug, Clone)]
pub struct TableRenderer {
    title: String,
}

impl TableRenderer {
    /// Creates a renderer with the given heading.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl Renderer for TableRenderer {
    fn render(&self, verdict: &Verdict) -> Result<String, ScanError> {
        let result = if verdict.is_infected() {
            verdict.threat_name()
        } else {
            CLEAN_RESULT
        };
        let infected = verdict.is_infected().to_string();
        let row = [
            infected.as_str(),
            result,
            verdict.engine_version(),
            verdict.definition_version(),
            verdict.definition_date(),
        ];

        let mut out = String::new();
        write_table(&mut out, &self.title, &row).map_err(|e| ScanError::render(e.to_string()))?;
        Ok(out)
    }
}

fn write_table(out: &mut String, title: &str, row: &[&str; 5]) -> std::fmt::Result {
    writeln!(out, "#### {}", title)?;
    writeln!(out)?;
    writeln!(out, "| {} |", HEADER.join(" | "))?;

    let rule: Vec<String> = HEADER.iter().map(|h| "-".repeat(h.len() + 2)).collect();
    writeln!(out, "|{}|", rule.join("|"))?;

    let cells: Vec<String> = row.iter().map(|cell| escape_cell(cell)).collect();
    writeln!(out, "| {} |", cells.join(" | "))
}

fn escape_cell(cell: &str) -> String {
    let cell = cell.trim();
    if cell.is_empty() {
        return EMPTY_CELL.to_string();
    }
    cell.replace('|', "\\|").replace(['\r', '\n'], " ")
}
