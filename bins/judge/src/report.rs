// Report rendering: console summary and JSON export
use anyhow::{Context, Result};
use judge_common::types::{RunReport, RunStatus, ERROR_PREFIX};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const RULE: &str = "======================================================";

/// Render the final console report
pub fn render(report: &RunReport, testcase_dir: &Path) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "==================== Judge Report ====================");
    let _ = writeln!(out, "Total testcases: {}", report.total);
    let _ = writeln!(out, "✓ Passed: {}", report.passed);
    let _ = writeln!(out, "✗ Failed: {}", report.failed);

    match report.status() {
        RunStatus::NoTestCases => {
            let _ = writeln!(out, "\nNo testcases were run.");
        }
        RunStatus::AllPassed => {
            let _ = writeln!(out, "\nAll testcases passed!");
        }
        RunStatus::Failures | RunStatus::Fatal => {
            let _ = writeln!(out, "\nFailed testcases details:");
            for (identifier, outcome) in &report.failures {
                let _ = writeln!(out, "\n[{}] {}:", outcome.status(), identifier);
                for line in outcome.message().lines() {
                    let _ = writeln!(out, "  {}", line);
                }
            }
            if !report.cleaned {
                let _ = writeln!(
                    out,
                    "\nError output files: {}<identifier>.txt (in {})",
                    ERROR_PREFIX,
                    testcase_dir.display()
                );
            }
        }
    }

    out.push_str(RULE);
    out
}

/// Write the full report as pretty JSON
pub fn write_json(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}
