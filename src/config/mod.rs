use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_CONFIG_PATH: &str = "tracepad.toml";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_DEBOUNCE_MS: u64 = 100;
const DEFAULT_CHECKPOINT_EVERY: u32 = 100;
const DEFAULT_FILLER_WIDTH: usize = 4;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

// ─── EditorTuning ─────────────────────────────────────────────────────────────

/// Editor behavior knobs (`[tuning]` in tracepad.toml).
///
/// Participants all run with the same tuning within one study; these exist
/// so pilots can calibrate before data collection starts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EditorTuning {
    /// Quiet time after the last edit before a completion request fires
    /// (milliseconds). Default: 100.
    pub debounce_ms: u64,
    /// Write a full-buffer `current_code` checkpoint after this many log
    /// entries. 0 disables periodic checkpoints. Default: 100.
    pub checkpoint_every: u32,
    /// Width of the neutral filler inserted when accept finds nothing to
    /// splice. Default: 4.
    pub filler_width: usize,
    /// Completion request timeout (milliseconds). Default: 10000.
    pub request_timeout_ms: u64,
}

impl Default for EditorTuning {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            filler_width: DEFAULT_FILLER_WIDTH,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

// ─── Assistants and exercises ─────────────────────────────────────────────────

/// One completion condition (`[[assistant]]` in tracepad.toml). The name is
/// the condition label participants are assigned; it also names the log
/// subdirectory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantInfo {
    pub name: String,
    /// Completion endpoint; the whole prefix is POSTed here as JSON.
    pub base_url: String,
}

/// One task participants work on (`[[exercise]]` in tracepad.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExerciseInfo {
    pub name: String,
    /// Problem statement link, shown to participants by outer tooling.
    /// The engine itself only needs the name.
    pub reference_url: Option<String>,
    /// File whose contents seed the buffer. Absent means an empty buffer.
    pub starter_path: Option<PathBuf>,
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `tracepad.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// Root directory for event logs (default: "logs").
    log_dir: Option<PathBuf>,
    /// Log level filter string, e.g. "debug", "info,tracepad=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default) | "json".
    log_format: Option<String>,
    /// Editor tuning (`[tuning]`).
    tuning: Option<EditorTuning>,
    /// Completion conditions (`[[assistant]]`).
    assistant: Option<Vec<AssistantInfo>>,
    /// Study tasks (`[[exercise]]`).
    exercise: Option<Vec<ExerciseInfo>>,
}

fn load_toml(path: &Path) -> Option<TomlConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config — using defaults");
            None
        }
    }
}

// ─── StudyConfig ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StudyConfig {
    /// Root under which per-assistant log directories are created
    /// (TRACEPAD_LOG_DIR env var, default: "logs").
    pub log_dir: PathBuf,
    /// Log level filter (TRACEPAD_LOG env var, default: "info").
    pub log: String,
    /// Log output format: "pretty" (default) | "json" (TRACEPAD_LOG_FORMAT).
    pub log_format: String,
    pub tuning: EditorTuning,
    pub assistants: Vec<AssistantInfo>,
    pub exercises: Vec<ExerciseInfo>,
}

impl StudyConfig {
    /// Build config from CLI args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file (`--config`, default `tracepad.toml`)
    ///   3. Built-in defaults
    pub fn new(
        config_path: Option<PathBuf>,
        log_dir: Option<PathBuf>,
        log: Option<String>,
        log_format: Option<String>,
    ) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let toml = load_toml(&config_path).unwrap_or_default();

        let log_dir = log_dir
            .or_else(|| {
                std::env::var("TRACEPAD_LOG_DIR")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
            })
            .or(toml.log_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

        let log = log
            .or_else(|| std::env::var("TRACEPAD_LOG").ok().filter(|s| !s.is_empty()))
            .or(toml.log)
            .unwrap_or_else(|| "info".to_string());

        let log_format = log_format
            .or_else(|| {
                std::env::var("TRACEPAD_LOG_FORMAT")
                    .ok()
                    .filter(|s| !s.is_empty())
            })
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        Self {
            log_dir,
            log,
            log_format,
            tuning: toml.tuning.unwrap_or_default(),
            assistants: toml.assistant.unwrap_or_default(),
            exercises: toml.exercise.unwrap_or_default(),
        }
    }

    /// Look up a completion condition by its label.
    pub fn assistant(&self, name: &str) -> Option<&AssistantInfo> {
        self.assistants.iter().find(|a| a.name == name)
    }

    /// Look up an exercise by name.
    pub fn exercise(&self, name: &str) -> Option<&ExerciseInfo> {
        self.exercises.iter().find(|e| e.name == name)
    }
}
