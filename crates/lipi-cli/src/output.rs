//! Output formatting and progress reporting.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use lipi::{RunSummary, ScenarioReport};
use serde::{Deserialize, Serialize};

use crate::error::CliResult;

/// Output format for run results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Progress reporter for scenario execution
#[derive(Debug)]
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl ProgressReporter {
    /// Create a reporter; quiet mode suppresses the bar and per-case lines
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }

    /// Start a progress bar over the suite
    pub fn start(&mut self, total: u64) {
        if self.quiet {
            return;
        }
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        self.bar = Some(bar);
    }

    /// Announce the scenario about to run
    pub fn begin_case(&self, name: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_message(name.to_string());
        }
    }

    /// Record a finished scenario
    pub fn finish_case(&self, report: &ScenarioReport) {
        if let Some(ref bar) = self.bar {
            let mark = if report.status.is_passed() {
                style("PASS").green()
            } else {
                style("FAIL").red()
            };
            bar.println(format!(
                "{mark} {} ({}ms)",
                report.case_name, report.duration_ms
            ));
            bar.inc(1);
        }
    }

    /// Tear down the bar
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Print the run summary in the requested format
pub fn print_summary(summary: &RunSummary, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Text => {
            print!("{}", summary.render_text());
            if summary.all_passed() {
                println!("{}", style("all scenarios passed").green().bold());
            } else {
                println!("{}", style("run had failures").red().bold());
            }
        }
        OutputFormat::Json => println!("{}", summary.to_json()?),
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format_is_text() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }

    #[test]
    fn test_quiet_reporter_has_no_bar() {
        let mut reporter = ProgressReporter::new(true);
        reporter.start(10);
        assert!(reporter.bar.is_none());
    }

    #[test]
    fn test_print_json_summary() {
        let summary = RunSummary::from_reports(vec![]);
        assert!(print_summary(&summary, OutputFormat::Json).is_ok());
    }
}
