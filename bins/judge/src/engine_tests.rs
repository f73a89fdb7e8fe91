/// End-to-end tests for a full judge run
///
/// These tests drive `executor::run_all` over a real testcase directory:
/// 1. Mixed pass/fail runs aggregate correctly
/// 2. Compilation failures never reach the run step
/// 3. Timeouts are reported with their threshold
/// 4. Cleanup leaves the directory as it was found
///
/// Programs are shell scripts, so the suite only runs on unix.

#[cfg(all(test, unix))]
mod judge_run_tests {
    use crate::config::LanguageExecution;
    use crate::engine::CommandRunner;
    use crate::executor::run_all;
    use crate::strategy::{CompiledStrategy, InterpretedStrategy};
    use judge_common::config::Platform;
    use judge_common::types::{
        ComparisonConfig, ExecutionConfig, LanguageMode, ResultKind, RunStatus,
    };
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const DOUBLE: &str = "read n\necho $((n * 2))\n";

    fn config(dir: &Path, mode: LanguageMode, clean_temp: bool) -> ExecutionConfig {
        ExecutionConfig {
            source_path: dir.join("prog.sh"),
            testcase_dir: dir.to_path_buf(),
            timeout_seconds: 5,
            language_mode: mode,
            clean_temp,
            comparison: ComparisonConfig::default(),
        }
    }

    fn interpreted() -> InterpretedStrategy {
        InterpretedStrategy::new(
            CommandRunner::new(Platform::unix()),
            LanguageExecution::new("sh", &["{source}"]),
        )
    }

    fn write_case(dir: &Path, id: &str, input: &str, expected: &str) {
        fs::write(dir.join(format!("input{}.txt", id)), input).unwrap();
        fs::write(dir.join(format!("output{}.txt", id)), expected).unwrap();
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Three pairs where case 2 expects the wrong answer
    fn mixed_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prog.sh"), DOUBLE).unwrap();
        write_case(dir.path(), "1", "5\n", "10\n");
        write_case(dir.path(), "2", "7\n", "15\n");
        write_case(dir.path(), "3", "0\n", "0\n");
        dir
    }

    #[tokio::test]
    async fn test_mixed_run_aggregates() {
        let dir = mixed_dir();
        let config = config(dir.path(), LanguageMode::Interpreted, false);

        let report = run_all(&config, &interpreted()).await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.status(), RunStatus::Failures);
        assert_eq!(report.failures.len(), 1);
        let outcome = &report.failures["2"];
        assert_eq!(outcome.status(), ResultKind::AnswerMismatch);
        assert!(outcome.message().contains("Your output: 14"));
        assert!(report.finished_at.is_some());

        // Only the failing case keeps its output
        assert!(dir.path().join("error_2.txt").exists());
        assert!(!dir.path().join("temp_1.txt").exists());
        assert!(!dir.path().join("error_1.txt").exists());
    }

    #[tokio::test]
    async fn test_clean_temp_run_is_idempotent() {
        let dir = mixed_dir();
        let config = config(dir.path(), LanguageMode::Interpreted, true);
        let before = listing(dir.path());

        let first = run_all(&config, &interpreted()).await.unwrap();
        assert!(first.cleaned);
        assert_eq!(listing(dir.path()), before);

        let second = run_all(&config, &interpreted()).await.unwrap();
        assert_eq!(listing(dir.path()), before);
        assert_eq!(second.failed, first.failed);
    }

    #[tokio::test]
    async fn test_empty_directory_reports_no_test_cases() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("input1.txt"), "1\n").unwrap();
        let config = config(dir.path(), LanguageMode::Interpreted, false);

        let report = run_all(&config, &interpreted()).await.unwrap();

        assert_eq!(report.total, 0);
        assert_eq!(report.status(), RunStatus::NoTestCases);
        assert_eq!(report.status().exit_code(), 3);
    }

    #[tokio::test]
    async fn test_missing_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir.path().join("nope"), LanguageMode::Interpreted, false);

        let err = run_all(&config, &interpreted()).await.unwrap_err();
        assert!(err.to_string().contains("Testcase directory not found"));
    }

    #[tokio::test]
    async fn test_compile_error_never_runs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prog.sh"), DOUBLE).unwrap();
        write_case(dir.path(), "a", "1\n", "2\n");
        write_case(dir.path(), "b", "2\n", "4\n");
        let marker = dir.path().join("ran");

        let strategy = CompiledStrategy::new(
            CommandRunner::new(Platform::unix()),
            LanguageExecution::new("sh", &["-c", "echo 'syntax error' >&2; exit 1"]),
            LanguageExecution::new("touch", &[marker.to_str().unwrap()]),
        );
        let config = config(dir.path(), LanguageMode::Compiled, false);

        let report = run_all(&config, &strategy).await.unwrap();

        assert_eq!(report.failed, 2);
        for outcome in report.failures.values() {
            assert_eq!(outcome.status(), ResultKind::CompileError);
            assert!(outcome.message().contains("syntax error"));
        }
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_timeout_reports_threshold() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prog.sh"), "sleep 10\n").unwrap();
        write_case(dir.path(), "1", "\n", "\n");
        let mut config = config(dir.path(), LanguageMode::Interpreted, false);
        config.timeout_seconds = 1;

        let report = run_all(&config, &interpreted()).await.unwrap();

        let outcome = &report.failures["1"];
        assert_eq!(outcome.status(), ResultKind::RunError);
        assert!(outcome.message().contains("1s"));
        assert!(!dir.path().join("temp_1.txt").exists());
        assert!(!dir.path().join("error_1.txt").exists());
    }
}
