//! Session aggregate: the room model captured so far

use crate::domain::coordinates::RoomFrame;
use crate::domain::event_log::EventLog;
use crate::domain::geometry::{DerivedGeometry, MIN_POLYGON_POINTS};
use crate::domain::types::{Fixture, FixtureId, FloorReference, OutlinePoint};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable)
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// Capture steps, in the only order they can be visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Floor,
    Outline,
    Ceiling,
    Fixtures,
    Review,
}

impl Step {
    pub const ALL: [Step; 5] = [Step::Floor, Step::Outline, Step::Ceiling, Step::Fixtures, Step::Review];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Floor => "floor",
            Step::Outline => "outline",
            Step::Ceiling => "ceiling",
            Step::Fixtures => "fixtures",
            Step::Review => "review",
        }
    }

    pub fn next(&self) -> Option<Step> {
        match self {
            Step::Floor => Some(Step::Outline),
            Step::Outline => Some(Step::Ceiling),
            Step::Ceiling => Some(Step::Fixtures),
            Step::Fixtures => Some(Step::Review),
            Step::Review => None,
        }
    }

    pub fn prev(&self) -> Option<Step> {
        match self {
            Step::Floor => None,
            Step::Outline => Some(Step::Floor),
            Step::Ceiling => Some(Step::Outline),
            Step::Fixtures => Some(Step::Ceiling),
            Step::Review => Some(Step::Fixtures),
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ceiling height in metres and whether the user has confirmed it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ceiling {
    pub height: f64,
    pub confirmed: bool,
}

/// Everything captured in one mapping session.
///
/// Only the capture state machine mutates a session; everyone else reads it
/// through the accessors. A reset replaces the whole value.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) id: String,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) step: Step,
    pub(crate) floor: Option<FloorReference>,
    pub(crate) outline: Vec<OutlinePoint>,
    pub(crate) ceiling: Ceiling,
    pub(crate) fixtures: Vec<Fixture>,
    pub(crate) log: EventLog,
    pub(crate) derived: DerivedGeometry,
}

impl Session {
    /// Create an empty session starting now
    ///
    /// # Example
    ///
    /// ```
    /// use room_mapper::domain::session::{Session, Step};
    ///
    /// let session = Session::new(2.44, 10_000);
    /// assert_eq!(session.step(), Step::Floor);
    /// assert!(session.floor().is_none());
    /// assert!(session.outline().is_empty());
    /// ```
    pub fn new(default_ceiling_height: f64, log_warn_after: usize) -> Self {
        Self::new_at(Utc::now(), default_ceiling_height, log_warn_after)
    }

    /// Create an empty session with an explicit start time
    pub fn new_at(
        started_at: DateTime<Utc>,
        default_ceiling_height: f64,
        log_warn_after: usize,
    ) -> Self {
        let ceiling = Ceiling { height: default_ceiling_height, confirmed: false };
        Self {
            id: new_uuid_v7(),
            started_at,
            step: Step::Floor,
            floor: None,
            outline: Vec::new(),
            ceiling,
            fixtures: Vec::new(),
            log: EventLog::with_warn_threshold(log_warn_after),
            derived: DerivedGeometry::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn floor(&self) -> Option<&FloorReference> {
        self.floor.as_ref()
    }

    pub fn floor_locked(&self) -> bool {
        self.floor.is_some_and(|f| f.locked)
    }

    /// Floor-relative frame, available once the floor is locked
    pub fn frame(&self) -> Option<RoomFrame> {
        self.floor.as_ref().and_then(RoomFrame::from_floor)
    }

    pub fn outline(&self) -> &[OutlinePoint] {
        &self.outline
    }

    pub fn ceiling(&self) -> Ceiling {
        self.ceiling
    }

    pub fn ceiling_height(&self) -> f64 {
        self.ceiling.height
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn fixture(&self, id: FixtureId) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.id == id)
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn derived(&self) -> &DerivedGeometry {
        &self.derived
    }

    /// Whether `step`'s completion predicate holds
    pub fn is_complete(&self, step: Step) -> bool {
        match step {
            Step::Floor => self.floor_locked(),
            Step::Outline => self.outline.len() >= MIN_POLYGON_POINTS,
            Step::Ceiling => self.ceiling.confirmed,
            Step::Fixtures => !self.fixtures.is_empty(),
            Step::Review => true,
        }
    }

    /// Token for the next fixture. Removal only happens at the tail, so
    /// `len + 1` never collides with a live id.
    pub(crate) fn next_fixture_id(&self) -> FixtureId {
        FixtureId(self.fixtures.len() as u32 + 1)
    }

    pub(crate) fn recompute(&mut self) {
        self.derived = DerivedGeometry::compute(&self.outline, self.ceiling.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Vec3;

    #[test]
    fn test_new_session() {
        let session = Session::new(2.44, 100);

        assert_eq!(session.id().len(), 36);
        assert_eq!(session.step(), Step::Floor);
        assert!(!session.floor_locked());
        assert!(session.frame().is_none());
        assert_eq!(session.ceiling(), Ceiling { height: 2.44, confirmed: false });
        assert!(session.fixtures().is_empty());
        assert!(session.log().is_empty());
        assert!(session.derived().bounds.is_none());
    }

    #[test]
    fn test_step_order() {
        let mut step = Step::Floor;
        let mut visited = vec![step];
        while let Some(next) = step.next() {
            assert_eq!(next.prev(), Some(step));
            step = next;
            visited.push(step);
        }
        assert_eq!(visited, Step::ALL.to_vec());
        assert_eq!(Step::Floor.prev(), None);
    }

    #[test]
    fn test_completion_predicates() {
        let mut session = Session::new(2.44, 100);
        assert!(!session.is_complete(Step::Floor));
        assert!(!session.is_complete(Step::Outline));
        assert!(!session.is_complete(Step::Ceiling));
        assert!(!session.is_complete(Step::Fixtures));
        assert!(session.is_complete(Step::Review));

        session.floor = Some(FloorReference { y: 0.1, locked: true });
        session.outline =
            vec![OutlinePoint::new(0.0, 0.0), OutlinePoint::new(1.0, 0.0), OutlinePoint::new(1.0, 1.0)];
        session.ceiling.confirmed = true;
        session.fixtures.push(Fixture {
            id: FixtureId(1),
            name: "Light 1".to_string(),
            position: Vec3::new(0.0, 2.0, 0.0),
        });

        for step in Step::ALL {
            assert!(session.is_complete(step), "{step} should be complete");
        }
    }

    #[test]
    fn test_step_serializes_snake_case() {
        assert_eq!(serde_json::to_value(Step::Fixtures).unwrap(), "fixtures");
        assert_eq!(Step::Ceiling.to_string(), "ceiling");
    }
}
