use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

use super::record::{LogRecord, LOG_HEADER};

/// Append-only event log for one (exercise, assistant) pair.
///
/// Writes one tab-separated line per entry to the configured path. The file
/// handle is cached for the session lifetime to avoid an `open()` syscall
/// per keystroke. A fresh file gets the fixed header row before the first
/// entry. Every append is flushed and synced before returning, so an
/// acknowledged entry survives a process crash. The log is never rotated,
/// rewritten, or truncated.
pub struct EventLog {
    path: PathBuf,
    /// Cached, open file handle; `None` until the first write.
    file: Mutex<Option<tokio::fs::File>>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry to the log.
    ///
    /// Opens the file lazily on first call, creating parent directories and
    /// the header row as needed. Errors are logged at WARN level and never
    /// propagated — a broken log must not interrupt editing, and the lost
    /// entry is not retried.
    pub async fn append(&self, record: &LogRecord) {
        if let Err(e) = self.try_append(record).await {
            tracing::warn!(path = %self.path.display(), err = %e, "event log write failed");
        }
    }

    async fn try_append(&self, record: &LogRecord) -> Result<()> {
        let line = record.to_line() + "\n";

        let mut guard = self.file.lock().await;

        // Open lazily. Resuming an exercise appends to the existing file, so
        // the header is only written while the file is still empty.
        if guard.is_none() {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let mut f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            if f.metadata().await?.len() == 0 {
                f.write_all(LOG_HEADER.as_bytes()).await?;
                f.write_all(b"\n").await?;
            }
            *guard = Some(f);
        }

        let file = guard.as_mut().unwrap();
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::record::EventKind;

    #[tokio::test]
    async fn first_append_creates_file_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assistant_1").join("keyboard.csv");
        let log = EventLog::new(&path);

        log.append(&LogRecord::new(EventKind::CharacterTyped, "a", 1))
            .await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], LOG_HEADER);
        assert!(lines[1].ends_with("character_typed\ta\t1"));
    }

    #[tokio::test]
    async fn header_is_not_repeated_on_later_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let log = EventLog::new(&path);

        log.append(&LogRecord::new(EventKind::CharacterTyped, "a", 1))
            .await;
        log.append(&LogRecord::new(EventKind::Deletion, "1", 0)).await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.matches("action_type").count(), 1);
        assert_eq!(content.lines().count(), 3);
    }

    #[tokio::test]
    async fn resuming_an_existing_log_appends_after_old_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");

        {
            let log = EventLog::new(&path);
            log.append(&LogRecord::new(EventKind::CharacterTyped, "a", 1))
                .await;
        }
        // New writer instance, same file — as after an editor restart.
        let log = EventLog::new(&path);
        log.append(&LogRecord::new(EventKind::CharacterTyped, "b", 2))
            .await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("\ta\t"));
        assert!(lines[2].contains("\tb\t"));
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        // Parent "path" is a regular file, so opening the log must fail.
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, b"x").await.unwrap();
        let log = EventLog::new(blocker.join("log.csv"));

        // Must return normally; the failure is reported via tracing only.
        log.append(&LogRecord::new(EventKind::Deletion, "1", 0)).await;
    }

    #[tokio::test]
    async fn multiline_info_stays_on_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let log = EventLog::new(&path);

        log.append(&LogRecord::new(
            EventKind::CurrentCode,
            "def f():\n\treturn 1",
            0,
        ))
        .await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("def f():\\n\\treturn 1"));
    }
}
