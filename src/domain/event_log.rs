//! Append-only session event log
//!
//! Every user action and state transition lands here. The display reads a
//! bounded suffix; export always serializes the whole sequence, so entries are
//! never dropped while a session lives. Past `warn_after` entries a single
//! warning is emitted so very long sessions show up in the process log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// One recorded action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub time: DateTime<Utc>,
    pub message: String,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    warn_after: usize,
    warned: bool,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_warn_threshold(DEFAULT_WARN_AFTER)
    }
}

/// Entry count past which the log reports its growth
pub const DEFAULT_WARN_AFTER: usize = 50_000;

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warn_threshold(warn_after: usize) -> Self {
        Self { entries: Vec::with_capacity(64), warn_after, warned: false }
    }

    /// Append an entry stamped with the current time
    pub fn append(&mut self, message: &str, payload: Value) {
        self.append_at(Utc::now(), message, payload);
    }

    /// Append an entry with an explicit timestamp
    pub fn append_at(&mut self, time: DateTime<Utc>, message: &str, payload: Value) {
        debug!(message = %message, payload = %payload, "event_logged");
        self.entries.push(LogEntry { time, message: message.to_string(), payload });

        if !self.warned && self.entries.len() > self.warn_after {
            self.warned = true;
            warn!(entries = %self.entries.len(), threshold = %self.warn_after, "event_log_large");
        }
    }

    /// Last `n` entries in original order
    pub fn recent_suffix(&self, n: usize) -> &[LogEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Full sequence since session start
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Display lines in `time | message` form
    pub fn display_lines(&self, n: usize) -> Vec<String> {
        self.recent_suffix(n)
            .iter()
            .map(|e| format!("{} | {}", e.time.to_rfc3339(), e.message))
            .collect()
    }
}
