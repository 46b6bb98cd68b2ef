//! Event Log Store and Logging Adapter.
//!
//! `record` defines the entry model and the tab-separated encoding,
//! `writer` the durable append-only store, `recorder` the adapter the
//! engine drives. One log file per (exercise, assistant) pair.

pub mod record;
pub mod recorder;
pub mod writer;

pub use record::{escape_info, unescape_info, EventKind, LogRecord, LOG_HEADER};
pub use recorder::Recorder;
pub use writer::EventLog;
