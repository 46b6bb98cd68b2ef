use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};

use tracepad::completion::{CompletionBackend, CompletionOutcome, HttpCompletionClient};
use tracepad::config::StudyConfig;
use tracepad::engine::EditorEngine;
use tracepad::host::EditorUi;
use tracepad::replay;
use tracepad::SessionContext;

#[derive(Parser)]
#[command(
    name = "tracepad",
    about = "Instrumented study editor — suggestion lifecycle and keystroke logging",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to the study config file (default: tracepad.toml)
    #[arg(long, env = "TRACEPAD_CONFIG")]
    config: Option<PathBuf>,

    /// Root directory for event logs
    #[arg(long, env = "TRACEPAD_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TRACEPAD_LOG")]
    log: Option<String>,

    /// Write operator logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TRACEPAD_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Log output format: "pretty" (default) or "json"
    #[arg(long, env = "TRACEPAD_LOG_FORMAT")]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Open an exercise in the instrumented editor.
    ///
    /// Seeds the buffer from the exercise's starter file, appends to its
    /// event log, and fetches inline suggestions from the assistant's
    /// completion endpoint. Tab accepts the visible suggestion, Esc
    /// dismisses it, Ctrl+Q quits.
    ///
    /// Examples:
    ///   tracepad run --exercise fizzbuzz --assistant control
    ///   tracepad run --exercise warmup --assistant full --config study.toml
    Run {
        /// Exercise name from the config file
        #[arg(long)]
        exercise: String,
        /// Assistant (completion condition) name from the config file
        #[arg(long)]
        assistant: String,
    },
    /// Send one completion request and print the prediction.
    ///
    /// Bypasses the editor entirely — use it to verify an endpoint is up
    /// and its response shape parses before a participant sits down.
    ///
    /// Examples:
    ///   tracepad ping --assistant control --prefix "def add(a, b):"
    ///   tracepad ping --url http://localhost:5000/complete --prefix "x = "
    Ping {
        /// Assistant name from the config file
        #[arg(long, conflicts_with = "url")]
        assistant: Option<String>,
        /// Explicit endpoint URL instead of a configured assistant
        #[arg(long)]
        url: Option<String>,
        /// Prefix text to request a completion for
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// Validate an event log and print derived statistics.
    ///
    /// Replays the log against an in-memory buffer, resynchronizing on
    /// current_code checkpoints, and reports how much suggested text was
    /// inserted, later deleted, and survives. Exits non-zero only when
    /// the log cannot be replayed at all.
    ///
    /// Examples:
    ///   tracepad check logs/control/fizzbuzz.csv
    Check {
        /// Event log to replay
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = StudyConfig::new(args.config, args.log_dir, args.log, args.log_format);

    match args.command {
        Command::Run {
            exercise,
            assistant,
        } => {
            // Raw mode owns the terminal, so operator logs default to a
            // file instead of stdout.
            let log_file = args
                .log_file
                .unwrap_or_else(|| config.log_dir.join("tracepad.log"));
            let _guard = setup_logging(&config.log, Some(&log_file), &config.log_format);
            run_editor(&config, &exercise, &assistant).await?;
        }
        Command::Ping {
            assistant,
            url,
            prefix,
        } => {
            let _guard = setup_logging(&config.log, args.log_file.as_deref(), &config.log_format);
            run_ping(&config, assistant.as_deref(), url, &prefix).await?;
        }
        Command::Check { path } => {
            let _guard = setup_logging(&config.log, args.log_file.as_deref(), &config.log_format);
            run_check(&path).await?;
        }
    }

    Ok(())
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn run_editor(config: &StudyConfig, exercise: &str, assistant: &str) -> Result<()> {
    let assistant_info = config
        .assistant(assistant)
        .with_context(|| format!("assistant {assistant:?} is not defined in the config"))?;
    let exercise_info = config
        .exercise(exercise)
        .with_context(|| format!("exercise {exercise:?} is not defined in the config"))?;

    let starter = match &exercise_info.starter_path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading starter file {}", path.display()))?,
        None => String::new(),
    };

    let client = HttpCompletionClient::new(
        &assistant_info.base_url,
        Duration::from_millis(config.tuning.request_timeout_ms),
    )?;
    let backend: Arc<dyn CompletionBackend> = Arc::new(client);

    let ctx = SessionContext::new(&config.log_dir, assistant, exercise);
    let (engine, events) = EditorEngine::open(ctx, &config.tuning, backend, &starter).await;
    EditorUi::new(engine, events).run().await
}

async fn run_ping(
    config: &StudyConfig,
    assistant: Option<&str>,
    url: Option<String>,
    prefix: &str,
) -> Result<()> {
    let base_url = match (assistant, url) {
        (Some(name), None) => config
            .assistant(name)
            .with_context(|| format!("assistant {name:?} is not defined in the config"))?
            .base_url
            .clone(),
        (None, Some(url)) => url,
        _ => bail!("pass exactly one of --assistant or --url"),
    };

    let client = HttpCompletionClient::new(
        &base_url,
        Duration::from_millis(config.tuning.request_timeout_ms),
    )?;
    let predicted = client.complete(prefix).await?;

    println!("endpoint:  {base_url}");
    println!("predicted: {predicted:?}");
    match CompletionOutcome::from_predicted(&predicted, prefix) {
        CompletionOutcome::Suffix(suffix) => println!("suffix:    {suffix:?}"),
        CompletionOutcome::Empty => println!("suffix:    (empty after trimming — nothing shown)"),
        CompletionOutcome::Failure(err) => bail!("completion failed: {err}"),
    }
    Ok(())
}

async fn run_check(path: &Path) -> Result<()> {
    let summary = replay::replay_file(path).await?;

    println!("entries:              {}", summary.entries);
    println!("typed characters:     {}", summary.typed);
    println!("deletions:            {}", summary.deletions);
    println!("arrow keys:           {}", summary.arrows);
    println!("suggestions proposed: {}", summary.proposed);
    println!("suggestions accepted: {}", summary.accepted);
    println!(
        "suggested chars:      {} inserted, {} deleted, {} surviving",
        summary.suggested_inserted, summary.suggested_deleted, summary.suggested_surviving
    );
    println!(
        "checkpoints:          {} ({} diverged)",
        summary.checkpoints, summary.checkpoint_mismatches
    );
    if summary.torn_tail {
        println!("note:                 log ends in a torn entry from an interrupted write");
    }
    println!(
        "final buffer:         {} chars, caret at {}",
        summary.final_text.chars().count(),
        summary.final_caret
    );
    Ok(())
}

// ─── Logging setup ────────────────────────────────────────────────────────────

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to a daily-rolling file only — in the
/// editor, raw mode owns stdout. Returns a `WorkerGuard` that must stay
/// alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format)
/// or `"json"` (structured JSON for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only
/// logging with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("tracepad.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}
