mod config;
mod discovery;
mod engine;
mod evaluator;
mod executor;
mod report;
mod strategy;

#[cfg(test)]
mod engine_tests;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use config::LanguageConfigManager;
use engine::CommandRunner;
use judge_common::config::Platform;
use judge_common::types::{ComparisonConfig, ExecutionConfig, RunStatus};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "judge")]
#[command(about = "Local judge - run a program against inputXXX/outputXXX test case pairs", long_about = None)]
struct Cli {
    /// Language profile (built-in: cpp, python)
    #[arg(short, long)]
    lang: String,

    /// Source file (defaults to the profile's default source, e.g. main.cpp)
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Directory holding the test case pairs
    #[arg(short = 'd', long, default_value = ".")]
    testcase_dir: PathBuf,

    /// Per-command timeout in seconds
    #[arg(short, long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Remove temp_/error_ files after the run
    #[arg(long)]
    clean_temp: bool,

    /// Ignore leading whitespace when comparing lines
    #[arg(long)]
    ignore_leading_spaces: bool,

    /// Treat trailing whitespace as significant
    #[arg(long)]
    keep_trailing_spaces: bool,

    /// Ignore blank lines on both sides
    #[arg(long)]
    ignore_blank_lines: bool,

    /// Extra language profiles (languages.json), layered over the built-ins
    #[arg(long, env = "JUDGE_LANGUAGES")]
    languages: Option<PathBuf>,

    /// Also write the full report as JSON to this path
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "JUDGE_LOG_FORMAT")]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let status = match run(cli).await {
        Ok(status) => status,
        Err(e) => {
            error!("Judge run aborted: {:#}", e);
            eprintln!("✗ Fatal error: {:#}", e);
            RunStatus::Fatal
        }
    };

    std::process::exit(status.exit_code());
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout belongs to the progress lines and the report
    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

async fn run(cli: Cli) -> Result<RunStatus> {
    let platform = Platform::current();
    info!(os = %platform.os_family, python = %platform.python_command, "Judge booting...");

    let config_manager = LanguageConfigManager::load_or_builtin(cli.languages.as_deref(), &platform)?;
    info!("Loaded language configurations for: {:?}", config_manager.list_languages());

    let language = config_manager.get_config(&cli.lang)?;

    let config = ExecutionConfig {
        source_path: cli
            .source
            .unwrap_or_else(|| PathBuf::from(&language.default_source)),
        testcase_dir: cli.testcase_dir,
        timeout_seconds: cli.timeout,
        language_mode: language.mode,
        clean_temp: cli.clean_temp,
        comparison: ComparisonConfig {
            ignore_trailing_spaces: !cli.keep_trailing_spaces,
            ignore_leading_spaces: cli.ignore_leading_spaces,
            ignore_blank_lines: cli.ignore_blank_lines,
        },
    };

    println!("==================== Judge ====================");
    println!("Language: {} ({})", language.name, language.mode);
    println!("Source: {}", config.source_path.display());
    println!("Timeout: {}s", config.timeout_seconds);
    println!();

    let strategy = strategy::strategy_for(language, CommandRunner::new(platform))?;
    let report = executor::run_all(&config, strategy.as_ref()).await?;

    println!();
    println!("{}", report::render(&report, &config.testcase_dir));

    if let Some(path) = &cli.report_json {
        report::write_json(&report, path)?;
        info!(path = %path.display(), "Report written");
    }

    Ok(report.status())
}
