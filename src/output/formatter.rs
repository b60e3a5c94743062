//! Output formatters for grid results
//!
//! Provides table, JSON, CSV and one-line summary output formats.

use anyhow::{Context, Result};
use std::path::Path;

use crate::models::{CellResult, RunOutcome, TestSummary};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a grid summary
    pub fn format_summary(&self, summary: &TestSummary) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(self.format_summary_table(summary)),
            OutputFormat::Json => {
                serde_json::to_string(summary).context("Failed to serialize summary")
            }
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(summary).context("Failed to serialize summary")
            }
            OutputFormat::Csv => self.format_summary_csv(summary),
            OutputFormat::Summary => Ok(self.format_summary_brief(summary)),
        }
    }

    fn format_outcome_row(&self, outcome: &RunOutcome) -> String {
        let status_str = match (outcome.is_success(), self.colorize) {
            (true, true) => "\x1b[32m✓ OK  \x1b[0m",
            (true, false) => "✓ OK  ",
            (false, true) => "\x1b[31m✗ FAIL\x1b[0m",
            (false, false) => "✗ FAIL",
        };

        let detail = match &outcome.result {
            CellResult::Success { value } => value.to_string(),
            CellResult::Failure { error } => error.to_string(),
        };

        format!(
            "{:10} {:8} {} [{:>6}ms] {}",
            outcome.coordinate.thread_name(),
            outcome.coordinate.iteration_name(),
            status_str,
            outcome.duration_ms,
            truncate(&detail, 60)
        )
    }

    fn format_summary_table(&self, summary: &TestSummary) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!("║  Test: {:53} ║\n", truncate(&summary.name, 53)));
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        for outcome in summary.sorted_records() {
            output.push_str(&format!("║  {}\n", self.format_outcome_row(outcome)));
        }

        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        let success_str = if self.colorize {
            format!("\x1b[32m{}\x1b[0m", summary.success)
        } else {
            summary.success.to_string()
        };
        let failure_str = if self.colorize && summary.failure > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failure)
        } else {
            summary.failure.to_string()
        };

        output.push_str(&format!(
            "║  Total: {} | Success: {} | Failure: {}{}\n",
            summary.total,
            success_str,
            failure_str,
            if summary.cancelled { " | CANCELLED" } else { "" }
        ));
        output.push_str(&format!(
            "║  Pass Rate: {:5.1}% | Duration: {}ms\n",
            summary.pass_rate(),
            summary.duration_ms
        ));
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        output
    }

    fn format_summary_csv(&self, summary: &TestSummary) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "thread",
            "iteration",
            "status",
            "error_kind",
            "value",
            "error",
            "started_at",
            "duration_ms",
        ])?;

        for outcome in summary.sorted_records() {
            let (status, kind, value, error) = match &outcome.result {
                CellResult::Success { value } => {
                    ("success", String::new(), value.to_string(), String::new())
                }
                CellResult::Failure { error } => (
                    "failure",
                    error.kind().to_string(),
                    String::new(),
                    error.message().to_string(),
                ),
            };
            writer.write_record([
                outcome.coordinate.thread_index.to_string(),
                outcome.coordinate.iteration_index.to_string(),
                status.to_string(),
                kind,
                value,
                error,
                outcome.started_at.to_rfc3339(),
                outcome.duration_ms.to_string(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
        String::from_utf8(bytes).context("CSV output is not valid UTF-8")
    }

    fn format_summary_brief(&self, summary: &TestSummary) -> String {
        format!(
            "{}: {}/{} cells succeeded, {} failed ({:.1}%) in {}ms{}",
            summary.name,
            summary.success,
            summary.total,
            summary.failure,
            summary.pass_rate(),
            summary.duration_ms,
            if summary.cancelled { " [cancelled]" } else { "" }
        )
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Write a formatted summary to a file, without color codes
pub fn write_summary_to_file(
    path: impl AsRef<Path>,
    summary: &TestSummary,
    format: OutputFormat,
) -> Result<()> {
    let path = path.as_ref();
    let content = ResultFormatter::new(format).no_color().format_summary(summary)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write results to {}", path.display()))?;
    Ok(())
}
