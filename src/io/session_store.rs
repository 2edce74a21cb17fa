//! File-backed session store
//!
//! One pretty-printed JSON file per stored session under `data_dir`, plus
//! daily JSONL files of client log lines under `log_dir`. Id allocation is
//! serialized so two documents received in the same second never share a file.

use anyhow::Context;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct SessionStore {
    data_dir: PathBuf,
    log_dir: PathBuf,
    /// Held across id allocation and file creation
    alloc: Mutex<()>,
}

impl SessionStore {
    pub fn new(data_dir: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), log_dir: log_dir.into(), alloc: Mutex::new(()) }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Store a session document received at `now` and return its assigned id.
    ///
    /// The document keeps its own `session_id` if it has one; `received_at`
    /// is always overwritten.
    pub fn save(&self, mut document: Map<String, Value>, now: DateTime<Utc>) -> anyhow::Result<String> {
        let _guard = self.alloc.lock();

        fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("Failed to create session directory {}", self.data_dir.display())
        })?;

        let base = format!("session_{}", now.format("%Y%m%dT%H%M%SZ"));
        let mut session_id = base.clone();
        let mut suffix = 1;
        while self.session_path(&session_id).exists() {
            suffix += 1;
            session_id = format!("{base}_{suffix}");
        }

        document.entry("session_id").or_insert_with(|| Value::String(session_id.clone()));
        document.insert("received_at".to_string(), Value::String(now.to_rfc3339()));

        let path = self.session_path(&session_id);
        let text = serde_json::to_string_pretty(&document)?;
        fs::write(&path, &text)
            .with_context(|| format!("Failed to write session file {}", path.display()))?;

        info!(session_id = %session_id, bytes = %text.len(), "session_saved");
        Ok(session_id)
    }

    /// Stored ids, newest first
    pub fn list(&self) -> anyhow::Result<Vec<String>> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        let entries = fs::read_dir(&self.data_dir).with_context(|| {
            format!("Failed to read session directory {}", self.data_dir.display())
        })?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// Stored document by id, `None` if unknown
    pub fn load(&self, session_id: &str) -> anyhow::Result<Option<Value>> {
        if !is_valid_id(session_id) {
            debug!(session_id = %session_id, "session_id_rejected");
            return Ok(None);
        }

        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(None);
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session file {}", path.display()))?;
        let value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse session file {}", path.display()))?;
        Ok(Some(value))
    }

    /// Append one client log line to `session_{YYYY-MM-DD}.log`
    pub fn append_log(&self, entry: &Value, now: DateTime<Utc>) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.log_dir)
            .with_context(|| format!("Failed to create log directory {}", self.log_dir.display()))?;

        let path = self.log_dir.join(format!("session_{}.log", now.format("%Y-%m-%d")));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        writeln!(file, "{}", entry)?;
        Ok(path)
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.data_dir.join(format!("{session_id}.json"))
    }
}

/// Ids are file stems; anything that could escape the data dir is refused
fn is_valid_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::tempdir;

    fn document(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_save_assigns_timestamp_id() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"), dir.path().join("logs"));
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();

        let id = store.save(document(json!({ "lights": [] })), now).unwrap();
        assert_eq!(id, "session_20240501T083000Z");

        let stored = store.load(&id).unwrap().unwrap();
        assert_eq!(stored["session_id"], "session_20240501T083000Z");
        assert_eq!(stored["received_at"], now.to_rfc3339());
    }

    #[test]
    fn test_save_keeps_document_session_id() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path(), dir.path().join("logs"));
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();

        let id = store.save(document(json!({ "session_id": "local-uuid" })), now).unwrap();
        let stored = store.load(&id).unwrap().unwrap();
        assert_eq!(stored["session_id"], "local-uuid");
    }

    #[test]
    fn test_save_keeps_received_key_order() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path(), dir.path().join("logs"));
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let received: Map<String, Value> =
            serde_json::from_str(r#"{"generator":"g","started_at":"t","room":{},"lights":[]}"#)
                .unwrap();

        let id = store.save(received, now).unwrap();

        let text = fs::read_to_string(dir.path().join(format!("{id}.json"))).unwrap();
        let keys = ["generator", "started_at", "room", "lights", "session_id", "received_at"];
        let positions: Vec<usize> =
            keys.iter().map(|k| text.find(&format!("\"{k}\"")).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    }

    #[test]
    fn test_same_second_gets_suffix() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path(), dir.path().join("logs"));
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();

        let first = store.save(document(json!({})), now).unwrap();
        let second = store.save(document(json!({})), now).unwrap();
        let third = store.save(document(json!({})), now).unwrap();
        assert_eq!(first, "session_20240501T083000Z");
        assert_eq!(second, "session_20240501T083000Z_2");
        assert_eq!(third, "session_20240501T083000Z_3");
    }

    #[test]
    fn test_list_newest_first() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"), dir.path().join("logs"));
        assert!(store.list().unwrap().is_empty());

        for hour in [9, 7, 11] {
            let now = Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap();
            store.save(document(json!({})), now).unwrap();
        }

        assert_eq!(
            store.list().unwrap(),
            vec!["session_20240501T110000Z", "session_20240501T090000Z", "session_20240501T070000Z"]
        );
    }

    #[test]
    fn test_load_unknown_or_invalid() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path(), dir.path().join("logs"));
        assert!(store.load("session_missing").unwrap().is_none());
        assert!(store.load("../etc/passwd").unwrap().is_none());
        assert!(store.load("").unwrap().is_none());
    }

    #[test]
    fn test_append_log_daily_file() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"), dir.path().join("logs"));
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 0).unwrap();

        store.append_log(&json!({ "level": "info", "message": "a" }), now).unwrap();
        let path = store.append_log(&json!({ "level": "warn", "message": "b" }), now).unwrap();

        assert!(path.ends_with("session_2024-05-01.log"));
        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["message"], "b");
    }
}
