//! Push-on-change notifications for review and rendering consumers
//!
//! The state machine publishes one revision per successful mutation. Each
//! revision carries a read-only snapshot of everything a visualizer needs, so
//! consumers on other tasks never touch the session itself. Intermediate
//! revisions may be coalesced by the watch channel; the latest never is.

use crate::domain::geometry::{RoomBounds, RoomDimensions, WallSegment};
use crate::domain::session::{Session, Step};
use crate::domain::types::{Fixture, OutlinePoint};
use crate::io::submit::SubmissionStatus;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// What part of the session a mutation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    /// Initial value before any mutation
    Created,
    FloorLocked,
    OutlineChanged,
    CeilingConfirmed,
    FixturesChanged,
    StepChanged,
    Reset,
    SubmissionChanged,
    /// Local download attempted
    Exported,
}

impl SessionChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionChange::Created => "created",
            SessionChange::FloorLocked => "floor_locked",
            SessionChange::OutlineChanged => "outline_changed",
            SessionChange::CeilingConfirmed => "ceiling_confirmed",
            SessionChange::FixturesChanged => "fixtures_changed",
            SessionChange::StepChanged => "step_changed",
            SessionChange::Reset => "reset",
            SessionChange::SubmissionChanged => "submission_changed",
            SessionChange::Exported => "exported",
        }
    }

    /// Whether consumers must rebuild room meshes (outline, walls, bounds)
    pub fn affects_geometry(&self) -> bool {
        matches!(
            self,
            SessionChange::FloorLocked
                | SessionChange::OutlineChanged
                | SessionChange::CeilingConfirmed
                | SessionChange::Reset
        )
    }
}

/// Read-only view of the session for visualizers
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSnapshot {
    pub session_id: String,
    pub step: Step,
    pub floor_y: Option<f64>,
    pub ceiling_height: f64,
    pub ceiling_confirmed: bool,
    pub outline: Vec<OutlinePoint>,
    pub walls: Vec<WallSegment>,
    pub bounds: Option<RoomBounds>,
    pub dimensions: Option<RoomDimensions>,
    pub fixtures: Vec<Fixture>,
    pub submission: SubmissionStatus,
}

impl ReviewSnapshot {
    pub fn capture(session: &Session, submission: &SubmissionStatus) -> Self {
        let derived = session.derived();
        Self {
            session_id: session.id().to_string(),
            step: session.step(),
            floor_y: session.floor().filter(|f| f.locked).map(|f| f.y),
            ceiling_height: session.ceiling().height,
            ceiling_confirmed: session.ceiling().confirmed,
            outline: session.outline().to_vec(),
            walls: derived.walls.clone(),
            bounds: derived.bounds,
            dimensions: derived.dimensions,
            fixtures: session.fixtures().to_vec(),
            submission: submission.clone(),
        }
    }
}

/// Revision stamp plus the state it describes
#[derive(Debug, Clone)]
pub struct Revision {
    pub seq: u64,
    pub change: SessionChange,
    pub snapshot: Arc<ReviewSnapshot>,
}

/// Publisher half owned by the state machine
pub struct ChangeFeed {
    tx: watch::Sender<Revision>,
    seq: u64,
}

impl ChangeFeed {
    pub fn new(initial: ReviewSnapshot) -> Self {
        let (tx, _rx) = watch::channel(Revision {
            seq: 0,
            change: SessionChange::Created,
            snapshot: Arc::new(initial),
        });
        Self { tx, seq: 0 }
    }

    /// New subscriber; the current revision counts as already seen
    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        self.tx.subscribe()
    }

    /// Publish a revision. Never fails, with or without subscribers.
    pub fn publish(&mut self, change: SessionChange, snapshot: ReviewSnapshot) -> u64 {
        self.seq += 1;
        self.tx.send_replace(Revision { seq: self.seq, change, snapshot: Arc::new(snapshot) });
        self.seq
    }

    pub fn current(&self) -> Revision {
        self.tx.borrow().clone()
    }
}

/// Diagnostics consumer: logs a summary of every revision until the feed closes
pub async fn log_revisions(mut rx: watch::Receiver<Revision>) {
    while rx.changed().await.is_ok() {
        let revision = rx.borrow_and_update().clone();
        let snap = &revision.snapshot;
        info!(
            seq = %revision.seq,
            change = %revision.change.as_str(),
            geometry = %revision.change.affects_geometry(),
            step = %snap.step,
            outline_points = %snap.outline.len(),
            walls = %snap.walls.len(),
            lights = %snap.fixtures.len(),
            area_m2 = ?snap.dimensions.map(|d| d.area),
            submission = %snap.submission.as_str(),
            "review_updated"
        );
    }
}
