//! Raw device space -> session-relative room frame
//!
//! Device space is y-up with an arbitrary origin. The room frame puts the
//! locked floor at y = 0. Outline points drop height entirely so an uneven
//! detected floor cannot warp the polygon; fixtures keep height re-expressed
//! above the floor.

use crate::domain::types::{FloorReference, OutlinePoint, Pose, Vec3};

/// Floor-relative frame anchored at a locked floor height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomFrame {
    floor_y: f64,
}

impl RoomFrame {
    pub fn new(floor_y: f64) -> Self {
        Self { floor_y }
    }

    /// Frame for a floor reference, only once it is locked
    pub fn from_floor(floor: &FloorReference) -> Option<Self> {
        floor.locked.then(|| Self::new(floor.y))
    }

    pub fn floor_y(&self) -> f64 {
        self.floor_y
    }

    /// Planar (x, z) of the pose; raw height is discarded
    pub fn outline_point(&self, pose: &Pose) -> OutlinePoint {
        OutlinePoint::new(pose.position.x, pose.position.z)
    }

    /// Position with height measured from the floor
    pub fn fixture_position(&self, pose: &Pose) -> Vec3 {
        Vec3::new(pose.position.x, pose.position.y - self.floor_y, pose.position.z)
    }

    /// Height of a raw pose above the floor, for live readouts
    pub fn height_above_floor(&self, pose: &Pose) -> f64 {
        pose.position.y - self.floor_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_height_is_floor_relative() {
        let frame = RoomFrame::new(1.2);
        let pos = frame.fixture_position(&Pose::at(0.5, 1.8, -1.0));
        assert!((pos.y - 0.6).abs() < 1e-9);
        assert_eq!(pos.x, 0.5);
        assert_eq!(pos.z, -1.0);
    }

    #[test]
    fn test_outline_point_drops_height() {
        let frame = RoomFrame::new(-0.3);
        let a = frame.outline_point(&Pose::at(2.0, -0.31, 1.0));
        let b = frame.outline_point(&Pose::at(2.0, -0.27, 1.0));
        assert_eq!(a, b);
        assert_eq!(a, OutlinePoint::new(2.0, 1.0));
    }

    #[test]
    fn test_frame_requires_locked_floor() {
        assert!(RoomFrame::from_floor(&FloorReference { y: 0.4, locked: false }).is_none());
        let frame = RoomFrame::from_floor(&FloorReference { y: 0.4, locked: true }).unwrap();
        assert_eq!(frame.floor_y(), 0.4);
        assert!((frame.height_above_floor(&Pose::at(0.0, 2.9, 0.0)) - 2.5).abs() < 1e-9);
    }
}
