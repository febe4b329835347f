//! Rendering of a check [`Report`] for terminals, tools and CI logs.
use std::fmt::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::engine::{CheckResult, Report};

const RULE: &str = "========================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    /// Workflow-command annotations for GitHub Actions logs.
    GithubActions,
}

/// Render `report`; `threshold` decides which inconsistencies are failures.
pub fn render(report: &Report, format: OutputFormat, threshold: f64) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report, threshold)),
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("failed to serialize report")
        }
        OutputFormat::GithubActions => Ok(render_github(report, threshold)),
    }
}

fn status(result: &CheckResult, threshold: f64) -> &'static str {
    if result.is_violation(threshold) {
        "[FAIL]"
    } else if !result.related {
        "[SKIP]"
    } else if !result.consistent {
        "[WARN]"
    } else {
        "[PASS]"
    }
}

fn render_text(report: &Report, threshold: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nDocDrift Check Report");
    let _ = writeln!(out, "{RULE}\n");

    if report.results.is_empty() {
        let _ = writeln!(out, "No documentation appears to be affected by these changes\n");
    }

    for (i, result) in report.results.iter().enumerate() {
        let seg = &result.segment;
        let sym = &result.symbol;
        let _ = writeln!(out, "[{}] {}", i + 1, status(result, threshold));
        let _ = writeln!(out, "  Doc:        {}:{} ({})", seg.file, seg.start_line, seg.heading);
        let _ = writeln!(
            out,
            "  Code:       {}:{} {} ({}, {})",
            sym.file, sym.start_line, sym.name, sym.kind, sym.change_kind
        );
        let _ = writeln!(out, "  Confidence: {:.0}%", result.confidence * 100.0);
        let _ = writeln!(out, "  Reason:     {}", result.reason);
        if !result.suggestion.is_empty() {
            let _ = writeln!(out, "  Suggestion: {}", result.suggestion);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "Summary: {} symbols, {} segments, {} pairs, {} inconsistent",
        report.total_symbols, report.total_segments, report.relevant_pairs, report.inconsistent
    );
    if report.skipped_files > 0 {
        let _ = writeln!(out, "Skipped: {} source files could not be parsed", report.skipped_files);
    }
    let _ = writeln!(out, "Time: {}ms", report.execution_time_ms);
    out
}

/// Escape a workflow-command message.
fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

/// Escape a workflow-command property value.
fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}

fn render_github(report: &Report, threshold: f64) -> String {
    let mut out = String::new();
    for result in report.results.iter().filter(|r| r.is_violation(threshold)) {
        let mut message = format!("{} ({}): {}", result.symbol.name, result.symbol.file, result.reason);
        if !result.suggestion.is_empty() {
            let _ = write!(message, "\nSuggestion: {}", result.suggestion);
        }
        let _ = writeln!(
            out,
            "::error file={},line={},title={}::{}",
            escape_property(&result.segment.file),
            result.segment.start_line,
            escape_property("Documentation out of date"),
            escape_data(&message)
        );
    }

    if report.inconsistent > 0 {
        let _ = writeln!(
            out,
            "::error::Found {} documentation inconsistencies",
            report.inconsistent
        );
    } else {
        let _ = writeln!(out, "::notice::Documentation is consistent with the code changes");
    }
    out
}
