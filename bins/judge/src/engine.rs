//! Execution Engine - Command Runner
//!
//! **Core Responsibility:**
//! Run one external command under a wall-clock timeout and report how it ended.
//!
//! **Critical Architectural Boundary:**
//! - Engine knows HOW to run a process (spawn, redirect, wait, kill)
//! - Engine does NOT know what the process is (compiler, binary, script)
//! - Engine does NOT classify results; strategies do
//!
//! **Exit Code Contract:**
//! - `0..=255` (or any platform code): the process ran and exited with it
//! - `128 + n`: terminated by signal `n` (Unix)
//! - [`LAUNCH_FAILURE_EXIT_CODE`]: the process could not be run at all
//! - [`TIMEOUT_EXIT_CODE`]: the process exceeded its time budget and was killed
//!
//! A real exit code equal to a sentinel (possible on Windows) is reported as 255.

use judge_common::config::{OsFamily, Platform};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// The process could not be started (or waited on)
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = -1;
/// The process ran past its timeout and was killed
pub const TIMEOUT_EXIT_CODE: i32 = -2;

/// Exit code used when a real process reports a value that collides with a sentinel
const COLLIDING_EXIT_CODE: i32 = 255;

/// How long captured pipes may stay open after the process has exited.
/// A background descendant can hold them open indefinitely.
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// An external command: program, arguments and optional file redirections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin_file: Option<PathBuf>,
    pub stdout_file: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin_file: None,
            stdout_file: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin_file = Some(path.into());
        self
    }

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_file = Some(path.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        if let Some(path) = &self.stdin_file {
            write!(f, " < {}", path.display())?;
        }
        if let Some(path) = &self.stdout_file {
            write!(f, " > {}", path.display())?;
        }
        Ok(())
    }
}

/// How a command ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    /// Captured stdout (when not redirected to a file) followed by stderr
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn timed_out(&self) -> bool {
        self.exit_code == TIMEOUT_EXIT_CODE
    }

    pub fn launch_failed(&self) -> bool {
        self.exit_code == LAUNCH_FAILURE_EXIT_CODE
    }

    fn launch_failure(error: impl fmt::Display) -> Self {
        Self {
            exit_code: LAUNCH_FAILURE_EXIT_CODE,
            output: format!("Execution failed: {}", error),
        }
    }
}

/// Stateless process runner parameterized by the platform it runs on
#[derive(Debug, Clone)]
pub struct CommandRunner {
    platform: Platform,
}

impl CommandRunner {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Unix does not search the working directory for bare program names,
    /// so an existing local file gets an explicit `./`.
    fn resolve_program(&self, program: &str) -> PathBuf {
        let path = Path::new(program);
        let bare = path.components().count() == 1 && !path.is_absolute();
        if self.platform.os_family == OsFamily::Unix && bare && path.is_file() {
            Path::new(".").join(path)
        } else {
            path.to_path_buf()
        }
    }

    /// Run `spec` with a hard timeout of `timeout_seconds`
    ///
    /// Never returns an error: launch problems and timeouts are folded into
    /// the sentinel exit codes. The timeout bounds the process itself, not
    /// its output pipes. On timeout the process is killed and reaped before
    /// this returns.
    #[instrument(skip(self, spec), fields(program = %spec.program))]
    pub async fn run(&self, spec: &CommandSpec, timeout_seconds: u64) -> CommandOutput {
        let start = Instant::now();

        let mut command = Command::new(self.resolve_program(&spec.program));
        command
            .args(&spec.args)
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match &spec.stdin_file {
            Some(path) => match File::open(path) {
                Ok(file) => {
                    command.stdin(Stdio::from(file));
                }
                Err(e) => {
                    return CommandOutput::launch_failure(format!(
                        "cannot open input {}: {}",
                        path.display(),
                        e
                    ))
                }
            },
            None => {
                command.stdin(Stdio::null());
            }
        }

        match &spec.stdout_file {
            Some(path) => match File::create(path) {
                Ok(file) => {
                    command.stdout(Stdio::from(file));
                }
                Err(e) => {
                    return CommandOutput::launch_failure(format!(
                        "cannot create output {}: {}",
                        path.display(),
                        e
                    ))
                }
            },
            None => {
                command.stdout(Stdio::piped());
            }
        }

        debug!(command = %spec, timeout_seconds, "Spawning process");

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %spec, error = %e, "Failed to spawn process");
                return CommandOutput::launch_failure(e);
            }
        };

        let stdout = PipeReader::spawn(child.stdout.take());
        let stderr = PipeReader::spawn(child.stderr.take());

        let waited = tokio::time::timeout(Duration::from_secs(timeout_seconds), child.wait()).await;

        match waited {
            Ok(Ok(status)) => {
                let exit_code = exit_code_of(&status);
                let execution_time_ms = start.elapsed().as_millis() as u64;
                debug!(exit_code, execution_time_ms, "Process exited");
                let (stdout, stderr) = tokio::join!(stdout.finish(), stderr.finish());
                CommandOutput {
                    exit_code,
                    output: merge_output(&stdout, &stderr),
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to wait for process");
                stdout.abort();
                stderr.abort();
                CommandOutput::launch_failure(e)
            }
            Err(_) => {
                warn!(command = %spec, timeout_seconds, "Process timed out - killing");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed-out process");
                }
                stdout.abort();
                stderr.abort();
                CommandOutput {
                    exit_code: TIMEOUT_EXIT_CODE,
                    output: format!("Timeout (>{}s exceeded)", timeout_seconds),
                }
            }
        }
    }
}

/// Drains one captured pipe on a background task
///
/// Bytes land in a shared buffer as they arrive, so whatever was read
/// survives even if the task is aborted.
struct PipeReader {
    buf: Arc<Mutex<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl PipeReader {
    fn spawn<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let task = pipe.map(|mut pipe| {
            let buf = Arc::clone(&buf);
            tokio::spawn(async move {
                let mut chunk = [0u8; 8192];
                loop {
                    match pipe.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => {
                            lock(&buf).extend_from_slice(&chunk[..n]);
                        }
                        Err(e) => {
                            warn!(error = %e, "Error reading process output");
                            break;
                        }
                    }
                }
            })
        });
        Self { buf, task }
    }

    /// Wait for EOF, at most [`PIPE_DRAIN_TIMEOUT`], and take what was read
    async fn finish(self) -> Vec<u8> {
        if let Some(mut task) = self.task {
            if tokio::time::timeout(PIPE_DRAIN_TIMEOUT, &mut task).await.is_err() {
                debug!("Output pipe still held open after exit; keeping partial output");
                task.abort();
            }
        }
        std::mem::take(&mut *lock(&self.buf))
    }

    fn abort(self) {
        if let Some(task) = self.task {
            task.abort();
        }
    }
}

fn lock(buf: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(PoisonError::into_inner)
}

fn merge_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut merged = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        if !merged.is_empty() && !merged.ends_with('\n') {
            merged.push('\n');
        }
        merged.push_str(&String::from_utf8_lossy(stderr));
    }
    merged
}

fn exit_code_of(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        if code == TIMEOUT_EXIT_CODE || code == LAUNCH_FAILURE_EXIT_CODE {
            return COLLIDING_EXIT_CODE;
        }
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn runner() -> CommandRunner {
        CommandRunner::new(Platform::unix())
    }

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let out = runner().run(&sh("echo hello"), 5).await;
        assert_eq!(out.exit_code, 0);
        assert!(out.success());
        assert_eq!(out.output, "hello\n");
    }

    #[tokio::test]
    async fn test_merges_stderr() {
        let out = runner().run(&sh("printf out; echo err >&2"), 5).await;
        assert_eq!(out.output, "out\nerr\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_code() {
        let out = runner().run(&sh("echo failing; exit 3"), 5).await;
        assert_eq!(out.exit_code, 3);
        assert!(!out.success());
        assert!(!out.timed_out());
        assert!(!out.launch_failed());
        assert!(out.output.contains("failing"));
    }

    #[tokio::test]
    async fn test_signal_maps_above_128() {
        let out = runner().run(&sh("kill -9 $$"), 5).await;
        assert_eq!(out.exit_code, 128 + 9);
    }

    #[tokio::test]
    async fn test_timeout_sentinel() {
        let started = Instant::now();
        let out = runner().run(&CommandSpec::new("sleep").arg("5"), 1).await;

        assert_eq!(out.exit_code, TIMEOUT_EXIT_CODE);
        assert!(out.timed_out());
        assert!(out.output.contains(">1s"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_background_child_does_not_count_as_timeout() {
        let started = Instant::now();
        let out = runner().run(&sh("sleep 4 & echo done"), 2).await;

        assert_eq!(out.exit_code, 0);
        assert!(!out.timed_out());
        assert!(out.output.starts_with("done"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_large_output_does_not_block() {
        let out = runner().run(&sh("seq 1 100000"), 5).await;

        assert_eq!(out.exit_code, 0);
        assert_eq!(out.output.lines().count(), 100000);
        assert!(out.output.ends_with("100000\n"));
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_failure() {
        let out = runner()
            .run(&CommandSpec::new("definitely-not-a-real-program-xyz"), 5)
            .await;
        assert_eq!(out.exit_code, LAUNCH_FAILURE_EXIT_CODE);
        assert!(out.launch_failed());
        assert!(out.output.starts_with("Execution failed:"));
    }

    #[tokio::test]
    async fn test_missing_stdin_file_is_launch_failure() {
        let dir = TempDir::new().unwrap();
        let spec = CommandSpec::new("cat").stdin_from(dir.path().join("absent.txt"));

        let out = runner().run(&spec, 5).await;
        assert_eq!(out.exit_code, LAUNCH_FAILURE_EXIT_CODE);
        assert!(out.output.contains("absent.txt"));
    }

    #[tokio::test]
    async fn test_file_redirection() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        std::fs::write(&input, "1 2 3\n").unwrap();

        let spec = CommandSpec::new("cat").stdin_from(&input).stdout_to(&output);
        let out = runner().run(&spec, 5).await;

        assert_eq!(out.exit_code, 0);
        assert_eq!(out.output, "");
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "1 2 3\n");
    }

    #[test]
    fn test_display() {
        let spec = CommandSpec::new("./a.out")
            .args(["-x", "y"])
            .stdin_from("in.txt")
            .stdout_to("out.txt");
        assert_eq!(spec.to_string(), "./a.out -x y < in.txt > out.txt");
    }

    #[test]
    fn test_merge_output() {
        assert_eq!(merge_output(b"a\n", b"b\n"), "a\nb\n");
        assert_eq!(merge_output(b"a", b"b"), "a\nb");
        assert_eq!(merge_output(b"", b"b"), "b");
        assert_eq!(merge_output(b"a", b""), "a");
    }
}
