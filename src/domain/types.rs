//! Shared spatial types for the room mapper

use serde::{Deserialize, Serialize};

/// Position in metres, y-up
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Device orientation as a unit quaternion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Orientation {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }
}

/// A hit-test sample: where the device is currently pointing
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    #[serde(default)]
    pub orientation: Orientation,
}

impl Pose {
    /// Pose at a position with identity orientation
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self { position: Vec3::new(x, y, z), orientation: Orientation::default() }
    }
}

/// Floor-plane vertex of the room outline. Height is implicitly the floor,
/// serialized as `{x, y: 0, z}`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OutlinePoint {
    pub x: f64,
    pub z: f64,
}

impl OutlinePoint {
    #[inline]
    pub const fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }
}

/// Locked floor height. All recorded heights are relative to `y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FloorReference {
    pub y: f64,
    pub locked: bool,
}

/// Sequential fixture token, rendered as `light_N`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct FixtureId(pub u32);

impl FixtureId {
    /// Default display name for a freshly placed fixture
    pub fn default_name(&self) -> String {
        format!("Light {}", self.0)
    }
}

impl std::fmt::Display for FixtureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "light_{}", self.0)
    }
}

impl std::str::FromStr for FixtureId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("light_").unwrap_or(s).parse::<u32>().map(FixtureId)
    }
}

impl Serialize for OutlinePoint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut point = serializer.serialize_struct("OutlinePoint", 3)?;
        point.serialize_field("x", &self.x)?;
        point.serialize_field("y", &0.0)?;
        point.serialize_field("z", &self.z)?;
        point.end()
    }
}

impl Serialize for FixtureId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FixtureId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A named point in floor-relative space (a light to be mapped)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fixture {
    pub id: FixtureId,
    pub name: String,
    pub position: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_id_display_and_parse() {
        let id = FixtureId(3);
        assert_eq!(id.to_string(), "light_3");
        assert_eq!(id.default_name(), "Light 3");
        assert_eq!("light_3".parse::<FixtureId>().unwrap(), id);
        assert_eq!("3".parse::<FixtureId>().unwrap(), id);
        assert!("lamp".parse::<FixtureId>().is_err());
    }

    #[test]
    fn test_outline_point_serializes_floor_height() {
        let json = serde_json::to_string(&OutlinePoint::new(1.5, -2.0)).unwrap();
        assert_eq!(json, r#"{"x":1.5,"y":0.0,"z":-2.0}"#);

        let back: OutlinePoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OutlinePoint::new(1.5, -2.0));
    }

    #[test]
    fn test_pose_deserialize_without_orientation() {
        let pose: Pose =
            serde_json::from_str(r#"{"position":{"x":1.0,"y":0.5,"z":-2.0}}"#).unwrap();
        assert_eq!(pose.position, Vec3::new(1.0, 0.5, -2.0));
        assert_eq!(pose.orientation, Orientation::default());
    }
}
