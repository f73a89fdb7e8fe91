//! Judge Executor - High-Level Orchestration
//!
//! **Responsibility:**
//! Drive one judge run from directory to `RunReport`.
//!
//! **Architecture:**
//! 1. Discover test case pairs once (discovery.rs)
//! 2. Hand each case to the selected strategy (strategy.rs), in discovery order
//! 3. Aggregate outcomes into the report
//! 4. Optionally sweep reserved `temp_` / `error_` artifacts
//!
//! This module is the glue layer - it knows nothing about:
//! - How programs are run (engine's job)
//! - How outputs are compared (evaluator's job)

use crate::discovery;
use crate::strategy::ExecutionStrategy;
use anyhow::{bail, Context, Result};
use judge_common::types::{is_reserved_artifact, ExecutionConfig, RunReport};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Run every discovered test case through `strategy`
///
/// A missing testcase directory is the only fatal condition; every per-case
/// problem ends up in the report instead.
#[instrument(skip(config, strategy), fields(testcase_dir = %config.testcase_dir.display(), strategy = strategy.name()))]
pub async fn run_all(config: &ExecutionConfig, strategy: &dyn ExecutionStrategy) -> Result<RunReport> {
    if !config.testcase_dir.is_dir() {
        bail!("Testcase directory not found: {}", config.testcase_dir.display());
    }

    println!("→ Scanning testcase directory: {}", config.testcase_dir.display());
    let cases = discovery::discover(&config.testcase_dir)?;

    let mut report = RunReport::new();

    if cases.is_empty() {
        warn!("No valid testcase pairs found");
        println!("  No valid testcase pairs found! (Need inputXXX.txt + outputXXX.txt)");
        report.finalize();
        return Ok(report);
    }

    info!(
        run_id = %report.run_id,
        test_cases = cases.len(),
        mode = %config.language_mode,
        timeout_seconds = config.timeout_seconds,
        source = %config.source_path.display(),
        "Starting judge run"
    );

    println!("  Found {} valid testcase pairs:", cases.len());
    for (idx, case) in cases.iter().enumerate() {
        println!(
            "  {}. {} ↔ {}",
            idx + 1,
            file_name(&case.input_path),
            file_name(&case.expected_output_path)
        );
    }
    println!();
    println!("→ Running testcases");

    for case in &cases {
        let start = Instant::now();
        let outcome = strategy.execute(case, config).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            identifier = %case.identifier,
            status = %outcome.status(),
            elapsed_ms,
            "Test case finished"
        );

        if outcome.is_success() {
            println!("  ✓ {}: {}", case.identifier, outcome.message());
        } else {
            println!(
                "  ✗ {}: [{}] {}",
                case.identifier,
                outcome.status(),
                headline(outcome.message())
            );
        }

        report.record(&case.identifier, outcome);
    }

    if config.clean_temp {
        println!();
        println!("→ Cleaning temp/error files");
        match clean_artifacts(&config.testcase_dir) {
            Ok(removed) => {
                info!(removed, "Cleanup completed");
                report.cleaned = true;
            }
            Err(e) => warn!(error = %format!("{:#}", e), "Cleanup failed; artifacts left in place"),
        }
    }

    report.finalize();

    info!(
        run_id = %report.run_id,
        total = report.total,
        passed = report.passed,
        failed = report.failed,
        "Judge run completed"
    );

    Ok(report)
}

/// Delete every file in `dir` carrying a reserved artifact prefix
///
/// ## Returns
/// Number of files removed
pub fn clean_artifacts(dir: &Path) -> Result<usize> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read testcase directory: {}", dir.display()))?;

    let mut removed = 0;
    for entry in entries {
        let path = entry.context("Failed to read directory entry")?.path();
        if !path.is_file() || !is_reserved_artifact(&path) {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove artifact"),
        }
    }
    Ok(removed)
}

/// First non-empty line of an outcome message
fn headline(message: &str) -> &str {
    message
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
