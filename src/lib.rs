pub mod buffer;
pub mod completion;
pub mod config;
pub mod engine;
pub mod host;
pub mod logging;
pub mod overlay;
pub mod replay;
pub mod session;

use std::path::{Path, PathBuf};

/// Identity of one editing session, passed explicitly to the engine and
/// its logging — which exercise, under which completion condition, and
/// where the event log lives.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub exercise: String,
    pub assistant: String,
    pub log_path: PathBuf,
}

impl SessionContext {
    /// Standard log layout: `<log_root>/<assistant>/<exercise>.csv`. One
    /// file per (assistant, exercise) pair; reopening the pair appends.
    pub fn new(log_root: &Path, assistant: &str, exercise: &str) -> Self {
        Self {
            exercise: exercise.to_string(),
            assistant: assistant.to_string(),
            log_path: log_root.join(assistant).join(format!("{exercise}.csv")),
        }
    }
}
