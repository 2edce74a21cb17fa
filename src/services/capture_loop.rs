//! Capture loop - the application shell around the state machine
//!
//! Consumes pose ticks and user actions from a channel and applies them one
//! at a time. Only the most recent pose is kept; taps use whatever the device
//! pointed at last. Submission runs on its own task and reports back through
//! a second channel selected in the same loop, so capture never waits on the
//! network.

use crate::domain::types::{FixtureId, Orientation, Pose, Vec3};
use crate::infra::config::Config;
use crate::io::export::{build_payload, FileExporter};
use crate::io::submit::{SessionSink, SubmitError, SubmitReceipt};
use crate::services::capture::CaptureStateMachine;
use crate::services::floor_stabilizer::FloorStabilizer;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One input to the capture loop
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CaptureAction {
    /// Hit-test result for this tick
    Pose {
        x: f64,
        y: f64,
        z: f64,
        #[serde(default)]
        orientation: Orientation,
    },
    /// No stable target this tick
    Lost,
    Tap,
    SetFloor,
    SkipFloor,
    ConfirmCeiling {
        #[serde(default)]
        value: Option<f64>,
        #[serde(default)]
        input: Option<String>,
    },
    Undo,
    Advance,
    Retreat,
    Reset,
    Rename {
        id: FixtureId,
        name: String,
    },
    Export,
    Submit,
    /// Pause replay (lets the floor stabilizer see time pass)
    Wait {
        ms: u64,
    },
}

impl CaptureAction {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureAction::Pose { .. } => "pose",
            CaptureAction::Lost => "lost",
            CaptureAction::Tap => "tap",
            CaptureAction::SetFloor => "set_floor",
            CaptureAction::SkipFloor => "skip_floor",
            CaptureAction::ConfirmCeiling { .. } => "confirm_ceiling",
            CaptureAction::Undo => "undo",
            CaptureAction::Advance => "advance",
            CaptureAction::Retreat => "retreat",
            CaptureAction::Reset => "reset",
            CaptureAction::Rename { .. } => "rename",
            CaptureAction::Export => "export",
            CaptureAction::Submit => "submit",
            CaptureAction::Wait { .. } => "wait",
        }
    }
}

/// Outcome of a background submission
#[derive(Debug)]
struct SubmissionDone {
    session_id: String,
    result: Result<SubmitReceipt, SubmitError>,
}

pub struct CaptureLoop {
    machine: CaptureStateMachine,
    latest_pose: Option<Pose>,
    stabilizer: Option<FloorStabilizer>,
    exporter: FileExporter,
    sink: Option<Arc<dyn SessionSink>>,
    in_flight: usize,
}

impl CaptureLoop {
    pub fn new(machine: CaptureStateMachine, exporter: FileExporter) -> Self {
        Self {
            machine,
            latest_pose: None,
            stabilizer: None,
            exporter,
            sink: None,
            in_flight: 0,
        }
    }

    /// Loop wired from config; the sink is attached separately
    pub fn from_config(config: &Config) -> Self {
        let machine = CaptureStateMachine::new(config);
        let mut capture = Self::new(machine, FileExporter::from_config(config));
        capture.stabilizer = FloorStabilizer::from_config(config);
        capture
    }

    pub fn with_sink(mut self, sink: Arc<dyn SessionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_stabilizer(mut self, stabilizer: FloorStabilizer) -> Self {
        self.stabilizer = Some(stabilizer);
        self
    }

    pub fn machine(&self) -> &CaptureStateMachine {
        &self.machine
    }

    /// Process actions until the channel closes, then wait for in-flight
    /// submissions and hand back the state machine.
    pub async fn run(mut self, mut actions: mpsc::Receiver<CaptureAction>) -> CaptureStateMachine {
        let (done_tx, mut done_rx) = mpsc::channel::<SubmissionDone>(8);
        info!(session_id = %self.machine.session().id(), "capture_loop_started");

        loop {
            tokio::select! {
                action = actions.recv() => {
                    match action {
                        Some(action) => self.handle(action, &done_tx).await,
                        None => break,
                    }
                }
                Some(done) = done_rx.recv() => self.finish_submission(done),
            }
        }

        while self.in_flight > 0 {
            match done_rx.recv().await {
                Some(done) => self.finish_submission(done),
                None => break,
            }
        }

        info!(
            session_id = %self.machine.session().id(),
            step = %self.machine.step(),
            log_entries = %self.machine.session().log().len(),
            "capture_loop_finished"
        );
        self.machine
    }

    async fn handle(&mut self, action: CaptureAction, done_tx: &mpsc::Sender<SubmissionDone>) {
        let name = action.name();
        let applied = match action {
            CaptureAction::Pose { x, y, z, orientation } => {
                let pose = Pose { position: Vec3::new(x, y, z), orientation };
                self.latest_pose = Some(pose);
                self.stabilize(Some(pose));
                true
            }
            CaptureAction::Lost => {
                self.latest_pose = None;
                self.stabilize(None);
                true
            }
            CaptureAction::Tap => self.machine.record_tap(self.latest_pose.as_ref()),
            CaptureAction::SetFloor => self.machine.set_floor(self.latest_pose.as_ref()),
            CaptureAction::SkipFloor => self.machine.skip_floor(),
            CaptureAction::ConfirmCeiling { value: Some(value), .. } => {
                self.machine.confirm_ceiling(value)
            }
            CaptureAction::ConfirmCeiling { value: None, input } => {
                self.machine.confirm_ceiling_input(input.as_deref().unwrap_or_default())
            }
            CaptureAction::Undo => self.machine.undo_last(),
            CaptureAction::Advance => self.machine.advance(),
            CaptureAction::Retreat => self.machine.retreat(),
            CaptureAction::Reset => {
                self.machine.reset();
                if let Some(stabilizer) = self.stabilizer.as_mut() {
                    stabilizer.reset();
                }
                true
            }
            CaptureAction::Rename { id, name: new_name } => {
                self.machine.rename_fixture(id, &new_name)
            }
            CaptureAction::Export => self.export(),
            CaptureAction::Submit => self.submit(done_tx),
            CaptureAction::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                true
            }
        };

        if !applied {
            debug!(action = %name, step = %self.machine.step(), "action_ignored");
        }
    }

    fn stabilize(&mut self, pose: Option<Pose>) {
        let Some(stabilizer) = self.stabilizer.as_mut() else {
            return;
        };
        if self.machine.session().floor_locked() {
            return;
        }

        let now = tokio::time::Instant::now().into_std();
        if let Some(settled) = stabilizer.observe(pose.as_ref(), now) {
            info!(floor_y = %settled.position.y, "floor_auto_locked");
            self.machine.set_floor(Some(&settled));
        }
    }

    /// Write the current document to a timestamped file
    fn export(&mut self) -> bool {
        let json = build_payload(self.machine.session()).to_json();
        match self.exporter.write(&json, Utc::now()) {
            Ok(path) => {
                info!(file = %path.display(), bytes = %json.len(), "session_exported");
                self.machine.record_download(&path);
                true
            }
            Err(e) => {
                self.machine.record_download_failed(&e);
                false
            }
        }
    }

    /// Snapshot the document and POST it in the background
    fn submit(&mut self, done_tx: &mpsc::Sender<SubmissionDone>) -> bool {
        let Some(sink) = self.sink.clone() else {
            warn!("submit_not_configured");
            return false;
        };

        let body = build_payload(self.machine.session()).to_json();
        let session_id = self.machine.session().id().to_string();
        self.machine.submission_started();
        self.in_flight += 1;

        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let result = sink.submit(body).await;
            if done_tx.send(SubmissionDone { session_id, result }).await.is_err() {
                warn!("submission_result_dropped");
            }
        });
        true
    }

    fn finish_submission(&mut self, done: SubmissionDone) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.machine.record_submission(&done.session_id, done.result);
    }
}
