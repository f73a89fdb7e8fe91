use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Identifier given to a pair named plainly `input.txt` / `output.txt`
pub const DEFAULT_IDENTIFIER: &str = "default";

/// Reserved artifact prefixes inside the testcase directory
pub const TEMP_PREFIX: &str = "temp_";
pub const ERROR_PREFIX: &str = "error_";

/// One discovered input/expected-output pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub identifier: String,
    pub input_path: PathBuf,
    pub expected_output_path: PathBuf,
}

/// Closed classification of a single test case execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultKind {
    Success,
    CompileError,
    RunError,
    FileMissing,
    AnswerMismatch,
    ScriptError,
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResultKind::Success => write!(f, "SUCCESS"),
            ResultKind::CompileError => write!(f, "COMPILE_ERROR"),
            ResultKind::RunError => write!(f, "RUN_ERROR"),
            ResultKind::FileMissing => write!(f, "FILE_MISSING"),
            ResultKind::AnswerMismatch => write!(f, "ANSWER_MISMATCH"),
            ResultKind::ScriptError => write!(f, "SCRIPT_ERROR"),
        }
    }
}

/// Verdict for one test case
///
/// Fields are private: an outcome is fixed once a strategy hands it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseOutcome {
    status: ResultKind,
    message: String,
}

impl CaseOutcome {
    pub fn new(status: ResultKind, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn success() -> Self {
        Self::new(ResultKind::Success, "Answer correct!")
    }

    pub fn status(&self) -> ResultKind {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultKind::Success
    }
}

/// Output normalization applied before line comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonConfig {
    pub ignore_trailing_spaces: bool,
    pub ignore_leading_spaces: bool,
    pub ignore_blank_lines: bool,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            ignore_trailing_spaces: true,
            ignore_leading_spaces: false,
            ignore_blank_lines: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageMode {
    Compiled,
    Interpreted,
}

impl fmt::Display for LanguageMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LanguageMode::Compiled => write!(f, "compiled"),
            LanguageMode::Interpreted => write!(f, "interpreted"),
        }
    }
}

/// Settings for one judge run, fixed for its whole lifetime
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub source_path: PathBuf,
    pub testcase_dir: PathBuf,
    pub timeout_seconds: u64,
    pub language_mode: LanguageMode,
    pub clean_temp: bool,
    pub comparison: ComparisonConfig,
}

impl ExecutionConfig {
    /// Where a case's program output is captured while it runs
    pub fn temp_output_path(&self, identifier: &str) -> PathBuf {
        self.testcase_dir
            .join(format!("{}{}.txt", TEMP_PREFIX, identifier))
    }

    /// Where a mismatching output is kept for inspection
    pub fn error_output_path(&self, identifier: &str) -> PathBuf {
        self.testcase_dir
            .join(format!("{}{}.txt", ERROR_PREFIX, identifier))
    }

    /// Executable produced by the build step for one case
    pub fn artifact_path(&self, identifier: &str, executable_suffix: &str) -> PathBuf {
        self.testcase_dir
            .join(format!("{}build_{}{}", TEMP_PREFIX, identifier, executable_suffix))
    }
}

/// True if the file name carries one of the reserved artifact prefixes
pub fn is_reserved_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with(TEMP_PREFIX) || name.starts_with(ERROR_PREFIX))
        .unwrap_or(false)
}

/// Aggregate result of one judge run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub failures: BTreeMap<String, CaseOutcome>,
    pub cleaned: bool,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            total: 0,
            passed: 0,
            failed: 0,
            failures: BTreeMap::new(),
            cleaned: false,
        }
    }

    /// Count one outcome; anything but `Success` lands in `failures`
    pub fn record(&mut self, identifier: &str, outcome: CaseOutcome) {
        self.total += 1;
        if outcome.is_success() {
            self.passed += 1;
        } else {
            self.failed += 1;
            self.failures.insert(identifier.to_string(), outcome);
        }
    }

    pub fn finalize(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn status(&self) -> RunStatus {
        if self.total == 0 {
            RunStatus::NoTestCases
        } else if self.failed > 0 {
            RunStatus::Failures
        } else {
            RunStatus::AllPassed
        }
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Overall signal of a run; not collapsible to a boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    AllPassed,
    Failures,
    NoTestCases,
    Fatal,
}

impl RunStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::AllPassed => 0,
            RunStatus::Failures => 1,
            RunStatus::Fatal => 2,
            RunStatus::NoTestCases => 3,
        }
    }
}
