//! Execution Strategies - Compiled and Interpreted
//!
//! **Core Responsibility:**
//! Turn one `TestCase` into one `CaseOutcome`.
//!
//! **Pipeline (both strategies):**
//! 1. Source, input and expected output must exist (`FileMissing`)
//! 2. Compiled only: build the artifact (`CompileError`, `RunError` if no artifact)
//! 3. Run with stdin from the input file and stdout into `temp_<id>.txt`
//! 4. Timeout / launch failure sentinels are `RunError` in both strategies;
//!    an ordinary non-zero exit is `RunError` for native code and
//!    `ScriptError` for scripts
//! 5. Compare; a mismatch keeps the output as `error_<id>.txt`
//!
//! Partial output from a failed run is always deleted.

use crate::config::{LanguageConfig, LanguageExecution};
use crate::engine::{CommandOutput, CommandRunner, CommandSpec};
use crate::evaluator;
use anyhow::{Context, Result};
use async_trait::async_trait;
use judge_common::types::{CaseOutcome, ExecutionConfig, LanguageMode, ResultKind, TestCase};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Shared contract of the two execution variants
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, case: &TestCase, config: &ExecutionConfig) -> CaseOutcome;
}

/// Build the strategy matching a language profile
pub fn strategy_for(
    language: &LanguageConfig,
    runner: CommandRunner,
) -> Result<Box<dyn ExecutionStrategy>> {
    match language.mode {
        LanguageMode::Compiled => {
            let compile = language
                .compile
                .clone()
                .with_context(|| format!("Language '{}' has no compile command", language.name))?;
            Ok(Box::new(CompiledStrategy::new(runner, compile, language.run.clone())))
        }
        LanguageMode::Interpreted => Ok(Box::new(InterpretedStrategy::new(
            runner,
            language.run.clone(),
        ))),
    }
}

/// Compile-then-run
pub struct CompiledStrategy {
    runner: CommandRunner,
    compile: LanguageExecution,
    run: LanguageExecution,
}

impl CompiledStrategy {
    pub fn new(runner: CommandRunner, compile: LanguageExecution, run: LanguageExecution) -> Self {
        Self {
            runner,
            compile,
            run,
        }
    }
}

#[async_trait]
impl ExecutionStrategy for CompiledStrategy {
    fn name(&self) -> &'static str {
        "compiled"
    }

    async fn execute(&self, case: &TestCase, config: &ExecutionConfig) -> CaseOutcome {
        if let Some(missing) = check_files(case, config) {
            return missing;
        }

        let artifact = config.artifact_path(
            &case.identifier,
            &self.runner.platform().executable_suffix,
        );
        let _guard = ArtifactGuard::new(artifact.clone());

        let build_cmd = self.compile.render(&config.source_path, &artifact);
        let build = self.runner.run(&build_cmd, config.timeout_seconds).await;
        if !build.success() {
            debug!(identifier = %case.identifier, exit_code = build.exit_code, "Compilation failed");
            return CaseOutcome::new(
                ResultKind::CompileError,
                format!("Compile failed:\n{}", build.output),
            );
        }
        if !artifact.exists() {
            return CaseOutcome::new(
                ResultKind::RunError,
                "Compile success but no executable generated",
            );
        }

        let run_cmd = self.run.render(&config.source_path, &artifact);
        run_and_compare(&self.runner, run_cmd, case, config, ResultKind::RunError).await
    }
}

/// Run a script directly
pub struct InterpretedStrategy {
    runner: CommandRunner,
    run: LanguageExecution,
}

impl InterpretedStrategy {
    pub fn new(runner: CommandRunner, run: LanguageExecution) -> Self {
        Self { runner, run }
    }
}

#[async_trait]
impl ExecutionStrategy for InterpretedStrategy {
    fn name(&self) -> &'static str {
        "interpreted"
    }

    async fn execute(&self, case: &TestCase, config: &ExecutionConfig) -> CaseOutcome {
        if let Some(missing) = check_files(case, config) {
            return missing;
        }

        let run_cmd = self.run.render(&config.source_path, &config.source_path);
        run_and_compare(&self.runner, run_cmd, case, config, ResultKind::ScriptError).await
    }
}

/// Removes the compiled artifact however the case ends
struct ArtifactGuard {
    path: PathBuf,
}

impl ArtifactGuard {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        remove_if_exists(&self.path);
    }
}

fn remove_if_exists(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove temporary file");
        }
    }
}

fn check_files(case: &TestCase, config: &ExecutionConfig) -> Option<CaseOutcome> {
    let required = [
        ("Source file", config.source_path.as_path()),
        ("Input file", case.input_path.as_path()),
        ("Expected output file", case.expected_output_path.as_path()),
    ];
    required
        .iter()
        .find(|(_, path)| !path.is_file())
        .map(|(what, path)| {
            CaseOutcome::new(
                ResultKind::FileMissing,
                format!("{} not found: {}", what, path.display()),
            )
        })
}

/// Classify a run that did not exit with 0
fn classify_failure(output: &CommandOutput, timeout_seconds: u64, ordinary: ResultKind) -> CaseOutcome {
    if output.timed_out() {
        return CaseOutcome::new(ResultKind::RunError, format!("Timeout (>{}s)", timeout_seconds));
    }
    if output.launch_failed() {
        return CaseOutcome::new(ResultKind::RunError, output.output.clone());
    }

    let label = match ordinary {
        ResultKind::ScriptError => "Script error",
        _ => "Run error",
    };
    CaseOutcome::new(
        ordinary,
        format!("{} (Exit code: {}):\n{}", label, output.exit_code, output.output),
    )
}

async fn run_and_compare(
    runner: &CommandRunner,
    run_cmd: CommandSpec,
    case: &TestCase,
    config: &ExecutionConfig,
    ordinary_failure: ResultKind,
) -> CaseOutcome {
    let temp_out = config.temp_output_path(&case.identifier);
    let err_out = config.error_output_path(&case.identifier);

    let run_cmd = run_cmd.stdin_from(&case.input_path).stdout_to(&temp_out);
    let output = runner.run(&run_cmd, config.timeout_seconds).await;

    if !output.success() {
        remove_if_exists(&temp_out);
        return classify_failure(&output, config.timeout_seconds, ordinary_failure);
    }

    if !temp_out.exists() {
        return CaseOutcome::new(ResultKind::RunError, "No output generated (temp file missing)");
    }

    let (is_match, diff_report) =
        evaluator::compare(&temp_out, &case.expected_output_path, &config.comparison);
    if is_match {
        remove_if_exists(&temp_out);
        return CaseOutcome::success();
    }

    let saved = match fs::rename(&temp_out, &err_out) {
        Ok(()) => format!("Error output saved to: {}", err_out.display()),
        Err(e) => {
            warn!(from = %temp_out.display(), to = %err_out.display(), error = %e, "Failed to keep mismatching output");
            remove_if_exists(&temp_out);
            format!("Error output could not be saved: {}", e)
        }
    };

    CaseOutcome::new(
        ResultKind::AnswerMismatch,
        format!("Answer error:\n{}\n{}", diff_report, saved),
    )
}
