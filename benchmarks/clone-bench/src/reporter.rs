//! Run report formatting
//!
//! Renders a [`RunReport`] for the terminal or as JSON.

use crate::{MemorySnapshot, RunReport};

/// Output format for run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output
    Terminal,
    /// Machine-readable JSON
    Json,
}

/// Run report generator
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render the full report
    pub fn report(&self, report: &RunReport) -> String {
        match self.format {
            OutputFormat::Terminal => self.report_terminal(report),
            OutputFormat::Json => self.report_json(report),
        }
    }

    fn report_json(&self, report: &RunReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    fn report_terminal(&self, report: &RunReport) -> String {
        let mut output = String::new();

        let status = if report.outcome.is_success() {
            "✅"
        } else {
            "❌"
        };

        output.push_str(&format!(
            "\n{} Clone Benchmark: {} -> {}\n",
            status, report.repo_url, report.destination
        ));
        output.push_str(&format!(
            "   Strategy: {} | Clone duration: {}ms\n",
            report.strategy,
            report.clone_duration.as_millis()
        ));
        if let crate::CloneOutcome::Failed { message } = &report.outcome {
            output.push_str(&format!("   Error: {}\n", message));
        }

        for (point, snapshot) in report.snapshots() {
            output.push_str(&format!("\n   {}:\n", point));
            output.push_str(&Self::snapshot_block(snapshot));
        }

        output.push('\n');
        output
    }

    fn snapshot_block(snapshot: &MemorySnapshot) -> String {
        let mut output = String::new();
        for (name, value) in snapshot.fields() {
            output.push_str(&format!("     {:<22} {:>12}\n", name, value.to_string()));
        }
        output
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(OutputFormat::Terminal)
    }
}
