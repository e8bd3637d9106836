//! Output and Reporting
//!
//! Renders validation results as a human-readable report, a JSON document or
//! a one-line summary.

use std::time::Duration;

use serde::Serialize;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::error::Result;
use crate::validator::{
    FileValidationResult, PerformanceMetrics, ValidationResults, ValidationStatus,
};

/// Formatter for validation results
pub struct Output {
    format: OutputFormat,
    verbosity: VerbosityLevel,
    show_colors: bool,
}

#[derive(Serialize)]
struct JsonReport<'r> {
    generated_at: String,
    schema: &'r str,
    #[serde(flatten)]
    results: &'r ValidationResults,
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            format,
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    /// Disable ANSI colors regardless of the terminal
    pub fn without_colors(mut self) -> Self {
        self.show_colors = false;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// Render `results` in the configured format
    pub fn render(&self, schema: &str, results: &ValidationResults) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_results(results)),
            OutputFormat::Json => self.format_json(schema, results),
            OutputFormat::Summary => Ok(self.format_one_line(results)),
        }
    }

    pub fn format_results(&self, results: &ValidationResults) -> String {
        let mut output = String::new();

        match self.verbosity {
            VerbosityLevel::Quiet => {
                let failures = results
                    .file_results
                    .iter()
                    .filter(|r| r.status.is_error() || r.status.is_invalid());
                for file_result in failures {
                    output.push_str(&self.format_file_result(file_result));
                    output.push('\n');
                }
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose | VerbosityLevel::Debug => {
                let shown = results.file_results.iter().filter(|r| {
                    self.verbosity == VerbosityLevel::Debug || !r.status.is_valid()
                });
                for file_result in shown {
                    output.push_str(&self.format_file_result(file_result));
                    output.push('\n');
                }
                if !results.file_results.is_empty() {
                    output.push('\n');
                }
                output.push_str(&self.format_summary(results));
            }
        }

        output
    }

    pub fn format_file_result(&self, result: &FileValidationResult) -> String {
        let path_display = result.path.display();
        let duration_str = format_duration(result.duration);

        match &result.status {
            ValidationStatus::Valid => format!(
                "{}  {} ({})",
                self.colorize("✓ VALID", "32"),
                path_display,
                duration_str
            ),
            ValidationStatus::Invalid => format!(
                "{}  {} ({})",
                self.colorize("✗ INVALID", "31"),
                path_display,
                duration_str
            ),
            ValidationStatus::Error { message } => format!(
                "{}  {} ({}) - {}",
                self.colorize("⚠ ERROR", "33"),
                path_display,
                duration_str,
                message
            ),
            ValidationStatus::Skipped { reason } => format!(
                "{}  {} - {}",
                self.colorize("- SKIPPED", "36"),
                path_display,
                reason
            ),
        }
    }

    fn format_summary(&self, results: &ValidationResults) -> String {
        let mut output = String::new();
        output.push_str("Validation Summary:\n");
        output.push_str(&format!("  Total files: {}\n", results.total_files));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Valid:", "32"),
            results.valid_files
        ));

        if results.invalid_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Invalid:", "31"),
                results.invalid_files
            ));
        }
        if results.error_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Errors:", "33"),
                results.error_files
            ));
        }
        if results.skipped_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Skipped:", "36"),
                results.skipped_files
            ));
        }

        output.push_str(&format!("  Success rate: {:.1}%\n", results.success_rate()));
        output.push_str(&format!(
            "  Duration: {}\n",
            format_duration(results.performance_metrics.total_duration)
        ));

        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&self.format_performance_metrics(&results.performance_metrics));
        }

        output
    }

    fn format_performance_metrics(&self, metrics: &PerformanceMetrics) -> String {
        let mut output = String::new();
        output.push_str("\nPerformance Metrics:\n");
        output.push_str(&format!(
            "  Throughput: {:.1} files/sec\n",
            metrics.throughput_files_per_second
        ));
        output.push_str(&format!(
            "  Concurrent validations: {}\n",
            metrics.concurrent_validations
        ));

        if self.verbosity == VerbosityLevel::Debug {
            output.push_str(&format!("  Schema nodes: {}\n", metrics.schema_nodes));
            output.push_str(&format!(
                "  Schema compilation: {}\n",
                format_duration(metrics.schema_loading_duration)
            ));
            output.push_str(&format!(
                "  Discovery: {}\n",
                format_duration(metrics.discovery_duration)
            ));
        }
        output
    }

    fn format_json(&self, schema: &str, results: &ValidationResults) -> Result<String> {
        let report = JsonReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            schema,
            results,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }

    fn format_one_line(&self, results: &ValidationResults) -> String {
        format!(
            "{} files: {} valid, {} invalid, {} errors, {} skipped\n",
            results.total_files,
            results.valid_files,
            results.invalid_files,
            results.error_files,
            results.skipped_files
        )
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
