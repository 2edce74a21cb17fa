//! Session export - one deterministic JSON document per session
//!
//! The document is rendered to text once; the same text is written to the
//! download file and POSTed to the session endpoint, so both are
//! byte-identical.

use crate::domain::event_log::LogEntry;
use crate::domain::geometry::{RoomBounds, RoomDimensions, WallSegment};
use crate::domain::session::{Session, Step};
use crate::domain::types::{Fixture, FloorReference, OutlinePoint};
use crate::infra::config::Config;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Producer stamp written into every document
pub const GENERATOR: &str =
    concat!("room-mapper ", env!("CARGO_PKG_VERSION"), "+", env!("GIT_HASH"));

/// Exported session document. Field order is the serialized order.
#[derive(Debug, Serialize)]
pub struct SessionPayload<'a> {
    pub generator: &'static str,
    pub session_id: &'a str,
    pub started_at: DateTime<Utc>,
    pub step: Step,
    pub floor: Option<&'a FloorReference>,
    pub room: RoomPayload<'a>,
    pub lights: &'a [Fixture],
    pub logs: &'a [LogEntry],
}

#[derive(Debug, Serialize)]
pub struct RoomPayload<'a> {
    pub floor_points: &'a [OutlinePoint],
    pub ceiling_height: f64,
    pub ceiling_confirmed: bool,
    pub bounds: Option<RoomBounds>,
    pub dimensions: Option<RoomDimensions>,
    pub walls: &'a [WallSegment],
}

impl SessionPayload<'_> {
    /// Pretty-printed JSON text
    pub fn to_json(&self) -> String {
        // Only plain data with string keys is serialized here
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Borrowing view of the whole session, ready to serialize
pub fn build_payload(session: &Session) -> SessionPayload<'_> {
    let derived = session.derived();
    SessionPayload {
        generator: GENERATOR,
        session_id: session.id(),
        started_at: session.started_at(),
        step: session.step(),
        floor: session.floor(),
        room: RoomPayload {
            floor_points: session.outline(),
            ceiling_height: session.ceiling().height,
            ceiling_confirmed: session.ceiling().confirmed,
            bounds: derived.bounds,
            dimensions: derived.dimensions,
            walls: &derived.walls,
        },
        lights: session.fixtures(),
        logs: session.log().entries(),
    }
}

/// Writes exported documents as timestamped files
#[derive(Debug, Clone)]
pub struct FileExporter {
    dir: PathBuf,
    prefix: String,
}

impl FileExporter {
    pub fn new(dir: impl Into<PathBuf>, prefix: &str) -> Self {
        let dir = dir.into();
        info!(dir = %dir.display(), prefix = %prefix, "exporter_initialized");
        Self { dir, prefix: prefix.to_string() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.export_dir(), config.export_file_prefix())
    }

    /// `{prefix}_{YYYYmmddTHHMMSSmmmZ}.json`
    pub fn file_name(&self, at: DateTime<Utc>) -> String {
        format!("{}_{}.json", self.prefix, at.format("%Y%m%dT%H%M%S%3fZ"))
    }

    /// Write `json` to a new file named after `at`. Returns the written path.
    pub fn write(&self, json: &str, at: DateTime<Utc>) -> anyhow::Result<PathBuf> {
        let path = self.dir.join(self.file_name(at));

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create export directory {}", parent.display())
                })?;
            }
        }

        fs::write(&path, json)
            .with_context(|| format!("Failed to write export file {}", path.display()))?;
        debug!(file = %path.display(), bytes = %json.len(), "export_written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Pose;
    use crate::services::capture::CaptureStateMachine;
    use chrono::TimeZone;
    use serde_json::Value;
    use tempfile::tempdir;

    fn completed_machine() -> CaptureStateMachine {
        let mut machine = CaptureStateMachine::with_settings(2.44, 10_000);
        machine.set_floor(Some(&Pose::at(0.0, 0.1, 0.0)));
        machine.advance();
        for (x, z) in [(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (0.0, 3.0)] {
            machine.record_tap(Some(&Pose::at(x, 0.1, z)));
        }
        machine.advance();
        machine.confirm_ceiling(2.5);
        machine.advance();
        machine.record_tap(Some(&Pose::at(2.0, 2.6, 1.5)));
        machine.advance();
        machine
    }

    #[test]
    fn test_payload_shape() {
        let machine = completed_machine();
        let value: Value = serde_json::from_str(&build_payload(machine.session()).to_json()).unwrap();

        assert_eq!(value["generator"], GENERATOR);
        assert_eq!(value["session_id"], machine.session().id());
        assert_eq!(value["step"], "review");
        assert_eq!(value["floor"]["y"], 0.1);
        assert_eq!(value["floor"]["locked"], true);
        assert_eq!(value["room"]["floor_points"].as_array().unwrap().len(), 4);
        assert_eq!(value["room"]["ceiling_height"], 2.5);
        assert_eq!(value["room"]["floor_points"][1], serde_json::json!({"x": 4.0, "y": 0.0, "z": 0.0}));
        assert_eq!(value["room"]["bounds"]["minX"], 0.0);
        assert_eq!(value["room"]["bounds"]["maxX"], 4.0);
        assert_eq!(value["room"]["bounds"]["floorY"], 0.0);
        assert_eq!(value["room"]["bounds"]["ceilingY"], 2.5);
        assert_eq!(value["room"]["dimensions"]["area"], 12.0);
        assert_eq!(value["room"]["walls"].as_array().unwrap().len(), 4);
        assert_eq!(value["lights"][0]["id"], "light_1");
        assert_eq!(value["lights"][0]["name"], "Light 1");
        assert_eq!(value["logs"].as_array().unwrap().len(), machine.session().log().len());
    }

    #[test]
    fn test_payload_key_order() {
        let machine = completed_machine();
        let json = build_payload(machine.session()).to_json();

        let keys =
            ["generator", "session_id", "started_at", "step", "floor", "room", "lights", "logs"];
        let positions: Vec<usize> =
            keys.iter().map(|k| json.find(&format!("\"{k}\"")).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_payload_is_deterministic() {
        let machine = completed_machine();
        let first = build_payload(machine.session()).to_json();
        let second = build_payload(machine.session()).to_json();
        assert_eq!(first, second);
    }

    #[test]
    fn test_file_name() {
        let exporter = FileExporter::new("out", "room_mapper_session");
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(exporter.file_name(at), "room_mapper_session_20240309T140507042Z.json");
    }

    #[test]
    fn test_write_creates_dirs_and_keeps_bytes() {
        let dir = tempdir().unwrap();
        let exporter = FileExporter::new(dir.path().join("nested/exports"), "session");
        let machine = completed_machine();
        let json = build_payload(machine.session()).to_json();

        let path = exporter.write(&json, Utc::now()).unwrap();

        assert!(path.starts_with(dir.path().join("nested/exports")));
        assert_eq!(fs::read_to_string(&path).unwrap(), json);
    }
}
