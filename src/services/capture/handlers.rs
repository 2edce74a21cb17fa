//! Per-step operations for the capture state machine

use super::CaptureStateMachine;
use crate::domain::session::{Ceiling, Step};
use crate::domain::types::{Fixture, FixtureId, FloorReference, Pose};
use crate::io::submit::{SubmissionStatus, SubmitError, SubmitReceipt};
use crate::services::change_feed::SessionChange;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info, warn};

impl CaptureStateMachine {
    /// Apply a tap at `pose` to whatever the current step collects.
    ///
    /// Outline taps append a floor-plane vertex, fixture taps place a light.
    /// Floor, ceiling and review ignore taps; so does a missing pose.
    pub fn record_tap(&mut self, pose: Option<&Pose>) -> bool {
        let Some(pose) = pose else {
            debug!(step = %self.session.step, "tap_ignored_no_pose");
            return false;
        };

        match self.session.step {
            Step::Outline => self.add_outline_point(pose),
            Step::Fixtures => self.add_fixture(pose),
            step => {
                debug!(step = %step, "tap_ignored_step");
                false
            }
        }
    }

    fn add_outline_point(&mut self, pose: &Pose) -> bool {
        let Some(frame) = self.session.frame() else {
            warn!("outline_tap_without_floor");
            return false;
        };

        let point = frame.outline_point(pose);
        self.session.outline.push(point);
        self.session.recompute();

        let index = self.session.outline.len() - 1;
        debug!(index = %index, x = %point.x, z = %point.z, "outline_point_added");
        self.commit(
            "outline_point_added",
            json!({ "index": index, "position": point, "raw_y": pose.position.y }),
            SessionChange::OutlineChanged,
        );
        true
    }

    fn add_fixture(&mut self, pose: &Pose) -> bool {
        let Some(frame) = self.session.frame() else {
            warn!("fixture_tap_without_floor");
            return false;
        };

        let id = self.session.next_fixture_id();
        let fixture = Fixture { id, name: id.default_name(), position: frame.fixture_position(pose) };

        info!(
            id = %fixture.id,
            x = %fixture.position.x,
            height = %fixture.position.y,
            z = %fixture.position.z,
            "light_added"
        );
        let payload = json!({ "light": &fixture });
        self.session.fixtures.push(fixture);
        self.commit("light_added", payload, SessionChange::FixturesChanged);
        true
    }

    /// Lock the floor at the pose's height. Only valid in `Floor` before the
    /// floor is locked; any later call is a no-op (a reset is required).
    pub fn set_floor(&mut self, pose: Option<&Pose>) -> bool {
        let Some(pose) = pose else {
            debug!("set_floor_ignored_no_pose");
            return false;
        };
        self.lock_floor(pose.position.y, "floor_locked")
    }

    /// Treat the tracking origin as the floor (y = 0)
    pub fn skip_floor(&mut self) -> bool {
        self.lock_floor(0.0, "floor_skipped")
    }

    fn lock_floor(&mut self, y: f64, message: &str) -> bool {
        if self.session.step != Step::Floor {
            debug!(step = %self.session.step, "set_floor_ignored_step");
            return false;
        }
        if self.session.floor_locked() {
            debug!("set_floor_ignored_already_locked");
            return false;
        }

        self.session.floor = Some(FloorReference { y, locked: true });
        info!(floor_y = %y, "floor_locked");
        self.commit(message, json!({ "y": y }), SessionChange::FloorLocked);
        true
    }

    /// Confirm the ceiling height. Non-finite or non-positive values fall back
    /// to the last known-good height, which is then confirmed.
    pub fn confirm_ceiling(&mut self, value: f64) -> bool {
        if self.session.step != Step::Ceiling {
            debug!(step = %self.session.step, "confirm_ceiling_ignored_step");
            return false;
        }

        let previous = self.session.ceiling.height;
        let accepted = value.is_finite() && value > 0.0;
        let height = if accepted { value } else { previous };
        if !accepted {
            warn!(input = %value, fallback = %previous, "ceiling_input_rejected");
        }

        self.session.ceiling = Ceiling { height, confirmed: true };
        self.session.recompute();

        info!(height = %height, fallback = !accepted, "ceiling_confirmed");
        self.commit(
            "ceiling_confirmed",
            json!({ "height": height, "fallback": !accepted }),
            SessionChange::CeilingConfirmed,
        );
        true
    }

    /// Confirm the ceiling from raw user input; unparseable text falls back
    pub fn confirm_ceiling_input(&mut self, input: &str) -> bool {
        let value = input.trim().parse::<f64>().unwrap_or(f64::NAN);
        self.confirm_ceiling(value)
    }

    /// Pop the tail of the current step's collection. Never crosses steps.
    pub fn undo_last(&mut self) -> bool {
        match self.session.step {
            Step::Outline => {
                let Some(point) = self.session.outline.pop() else {
                    return false;
                };
                self.session.recompute();
                let index = self.session.outline.len();
                debug!(index = %index, "outline_point_removed");
                self.commit(
                    "outline_point_removed",
                    json!({ "index": index, "position": point }),
                    SessionChange::OutlineChanged,
                );
                true
            }
            Step::Fixtures => {
                let Some(fixture) = self.session.fixtures.pop() else {
                    return false;
                };
                info!(id = %fixture.id, "light_removed");
                self.commit("light_removed", json!({ "id": fixture.id }), SessionChange::FixturesChanged);
                true
            }
            step => {
                debug!(step = %step, "undo_ignored_step");
                false
            }
        }
    }

    /// Rename a fixture. Allowed in any step; id and order are untouched.
    pub fn rename_fixture(&mut self, id: FixtureId, name: &str) -> bool {
        let Some(index) = self.session.fixtures.iter().position(|f| f.id == id) else {
            debug!(id = %id, "rename_ignored_unknown_light");
            return false;
        };

        self.session.fixtures[index].name = name.to_string();
        debug!(id = %id, name = %name, "fixture_renamed");
        self.commit(
            "fixture_renamed",
            json!({ "index": index, "id": id, "name": name }),
            SessionChange::FixturesChanged,
        );
        true
    }

    /// Mark a submission as started for the status readout
    pub fn submission_started(&mut self) {
        self.submission = SubmissionStatus::InFlight;
        let payload = json!({ "session_id": self.session.id() });
        self.commit("session_submit_started", payload, SessionChange::SubmissionChanged);
    }

    /// Report a finished submission. Captured geometry is never touched.
    ///
    /// A result for a session that has since been reset is only traced; the
    /// current session's status and log stay as they are.
    pub fn record_submission(
        &mut self,
        local_session_id: &str,
        result: Result<SubmitReceipt, SubmitError>,
    ) {
        if local_session_id != self.session.id() {
            match result {
                Ok(receipt) => info!(
                    session_id = %local_session_id,
                    remote_id = %receipt.session_id,
                    current_session_id = %self.session.id(),
                    "stale_session_submitted"
                ),
                Err(e) => warn!(
                    session_id = %local_session_id,
                    error = %e,
                    current_session_id = %self.session.id(),
                    "stale_session_submit_failed"
                ),
            }
            return;
        }

        match result {
            Ok(receipt) => {
                info!(session_id = %local_session_id, remote_id = %receipt.session_id, "session_submitted");
                self.submission =
                    SubmissionStatus::Submitted { session_id: receipt.session_id.clone() };
                self.commit(
                    "session_submitted",
                    json!({ "session_id": local_session_id, "remote_session_id": receipt.session_id }),
                    SessionChange::SubmissionChanged,
                );
            }
            Err(e) => {
                warn!(session_id = %local_session_id, error = %e, "session_submit_failed");
                self.submission = SubmissionStatus::Failed { error: e.to_string() };
                self.commit(
                    "session_submit_failed",
                    json!({ "session_id": local_session_id, "error": e.to_string() }),
                    SessionChange::SubmissionChanged,
                );
            }
        }
    }

    /// Log a local download of the exported document
    pub fn record_download(&mut self, path: &Path) {
        let payload = json!({ "path": path.display().to_string() });
        self.commit("session_downloaded", payload, SessionChange::Exported);
    }

    /// Log a failed local download
    pub fn record_download_failed(&mut self, error: &anyhow::Error) {
        warn!(error = %error, "session_download_failed");
        let payload = json!({ "error": format!("{error:#}") });
        self.commit("session_download_failed", payload, SessionChange::Exported);
    }
}
