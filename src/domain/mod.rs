//! Domain models - the room model and its derived geometry
//!
//! This module contains the canonical data types used throughout the system:
//! - `Session` - the root aggregate owned by the capture state machine
//! - `Step` - the ordered capture steps
//! - `RoomFrame` - raw device space to floor-relative room frame
//! - `EventLog` - append-only record of user actions
//! - `geometry` - bounds, wall segments and room dimensions

pub mod coordinates;
pub mod event_log;
pub mod geometry;
pub mod session;
pub mod types;

// Re-export commonly used types at module level
pub use coordinates::RoomFrame;
pub use event_log::{EventLog, LogEntry};
pub use geometry::{DerivedGeometry, PlanBounds, RoomBounds, RoomDimensions, WallSegment};
pub use session::{Session, Step};
pub use types::{Fixture, FixtureId, FloorReference, OutlinePoint, Pose, Vec3};
