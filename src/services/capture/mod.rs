//! Capture state machine
//!
//! Owns the session and is the only thing allowed to mutate it. Steps run
//! strictly in order (`Floor -> Outline -> Ceiling -> Fixtures -> Review`);
//! advancing past an incomplete step is rejected, retreating never discards
//! data, and reset replaces the session wholesale.
//!
//! Every operation is synchronous and all-or-nothing. Calls that do not apply
//! to the current step (or arrive without a stable pose) are silent no-ops
//! returning `false`. Every successful mutation appends exactly one log entry
//! and publishes one revision on the change feed.

mod handlers;

use crate::domain::session::{Session, Step};
use crate::infra::config::{checked_ceiling_height, Config};
use crate::io::submit::SubmissionStatus;
use crate::services::change_feed::{ChangeFeed, Revision, ReviewSnapshot, SessionChange};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info};

pub struct CaptureStateMachine {
    /// Current session; replaced on reset
    pub(crate) session: Session,
    /// Push-on-change publisher
    pub(crate) feed: ChangeFeed,
    /// Last submission outcome, kept beside the session so it never touches geometry
    pub(crate) submission: SubmissionStatus,
    default_ceiling_height: f64,
    log_warn_after: usize,
}

impl CaptureStateMachine {
    pub fn new(config: &Config) -> Self {
        Self::with_settings(config.default_ceiling_height(), config.log_warn_entries())
    }

    pub fn with_settings(default_ceiling_height: f64, log_warn_after: usize) -> Self {
        let default_ceiling_height = checked_ceiling_height(default_ceiling_height);
        let session = Session::new(default_ceiling_height, log_warn_after);
        let submission = SubmissionStatus::Idle;
        let feed = ChangeFeed::new(ReviewSnapshot::capture(&session, &submission));
        let mut machine =
            Self { session, feed, submission, default_ceiling_height, log_warn_after };

        let payload = json!({ "session_id": machine.session.id() });
        machine.session.log.append("session_started", payload);
        info!(session_id = %machine.session.id(), "session_started");
        machine
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn step(&self) -> Step {
        self.session.step
    }

    pub fn submission(&self) -> &SubmissionStatus {
        &self.submission
    }

    /// Subscribe to revisions published after each mutation
    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        self.feed.subscribe()
    }

    /// Snapshot of what a visualizer would show right now
    pub fn snapshot(&self) -> ReviewSnapshot {
        ReviewSnapshot::capture(&self.session, &self.submission)
    }

    /// Whether the current step's completion predicate holds
    pub fn can_advance(&self) -> bool {
        self.session.step.next().is_some() && self.session.is_complete(self.session.step)
    }

    /// Move to the next step if the current one is complete
    pub fn advance(&mut self) -> bool {
        let from = self.session.step;
        let Some(to) = from.next() else {
            debug!(step = %from, "advance_ignored_terminal");
            return false;
        };
        if !self.session.is_complete(from) {
            debug!(step = %from, "advance_rejected_incomplete");
            return false;
        }

        self.session.step = to;
        info!(from = %from, to = %to, "step_advanced");
        self.commit("step_advanced", json!({ "from": from, "to": to }), SessionChange::StepChanged);
        true
    }

    /// Move to the previous step; captured data is kept
    pub fn retreat(&mut self) -> bool {
        let from = self.session.step;
        let Some(to) = from.prev() else {
            debug!(step = %from, "retreat_ignored_first");
            return false;
        };

        self.session.step = to;
        info!(from = %from, to = %to, "step_retreated");
        self.commit("step_retreated", json!({ "from": from, "to": to }), SessionChange::StepChanged);
        true
    }

    /// Discard everything and start a fresh session at `Floor`
    pub fn reset(&mut self) {
        self.reset_at(Utc::now());
    }

    /// Reset with an explicit start time for the new session
    pub fn reset_at(&mut self, started_at: DateTime<Utc>) {
        let previous = std::mem::replace(
            &mut self.session,
            Session::new_at(started_at, self.default_ceiling_height, self.log_warn_after),
        );
        self.submission = SubmissionStatus::Idle;

        info!(
            previous_session_id = %previous.id(),
            session_id = %self.session.id(),
            discarded_points = %previous.outline().len(),
            discarded_lights = %previous.fixtures().len(),
            "session_reset"
        );
        self.commit(
            "session_reset",
            json!({ "session_id": self.session.id(), "previous_session_id": previous.id() }),
            SessionChange::Reset,
        );
    }

    /// Append the log entry for a mutation and notify subscribers
    pub(crate) fn commit(&mut self, message: &str, payload: Value, change: SessionChange) {
        self.session.log.append(message, payload);
        let snapshot = ReviewSnapshot::capture(&self.session, &self.submission);
        self.feed.publish(change, snapshot);
    }
}
