//! Command log.
//!
//! A [`CommandLog`] records every command a simulator executes. It is owned
//! by whoever constructs it and shared with the simulator by cloning the
//! handle; there is no process-wide log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// One executed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// When the command finished.
    pub at: DateTime<Utc>,
    /// The verb, e.g. `mkvdisk`.
    pub verb: String,
    /// The full command line.
    pub line: String,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl LogEntry {
    /// Whether the command reported an error.
    #[must_use]
    pub fn failed(&self) -> bool {
        !self.stderr.is_empty()
    }
}

/// A shared, clearable log of executed commands.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CommandLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with the current time.
    pub fn record(
        &self,
        verb: impl Into<String>,
        line: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.entries.lock().push(LogEntry {
            at: Utc::now(),
            verb: verb.into(),
            line: line.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }

    /// A snapshot of every entry, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Entries for one verb, oldest first.
    #[must_use]
    pub fn query(&self, verb: &str) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.verb == verb)
            .cloned()
            .collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_queries() {
        let log = CommandLog::new();
        log.record("mkvdisk", "mkvdisk -name v1", "Virtual Disk, id [0], successfully created", "");
        log.record("rmvdisk", "rmvdisk v1", "", "CMMVC5840E busy");
        log.record("mkvdisk", "mkvdisk -name v2", "ok", "");

        assert_eq!(log.len(), 3);
        assert_eq!(log.query("mkvdisk").len(), 2);
        let rm = log.query("rmvdisk");
        assert_eq!(rm.len(), 1);
        assert!(rm[0].failed());
        assert!(log.query("lshost").is_empty());
    }

    #[test]
    fn clones_share_entries() {
        let log = CommandLog::new();
        let handle = log.clone();
        handle.record("lssystem", "lssystem", "", "");
        assert_eq!(log.len(), 1);
        log.clear();
        assert!(handle.is_empty());
    }

    #[test]
    fn entries_are_in_order() {
        let log = CommandLog::new();
        for verb in ["a", "b", "c"] {
            log.record(verb, verb, "", "");
        }
        let verbs: Vec<_> = log.entries().into_iter().map(|e| e.verb).collect();
        assert_eq!(verbs, ["a", "b", "c"]);
    }
}
