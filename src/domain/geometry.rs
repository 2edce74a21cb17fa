//! Derived room geometry: bounds, wall panels and dimensions
//!
//! All inputs are already floor-relative, so the floor elevation is always 0.
//! Anything that needs a closed polygon returns `None` (or an empty list)
//! below three outline points; that is a normal state, not an error.

use crate::domain::types::{OutlinePoint, Vec3};
use serde::Serialize;

/// Minimum number of outline points for a usable polygon
pub const MIN_POLYGON_POINTS: usize = 3;

/// Axis-aligned extent of the outline on the floor plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl PlanBounds {
    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn depth(&self) -> f64 {
        self.max_z - self.min_z
    }
}

/// Plan bounds plus floor and ceiling elevations
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBounds {
    #[serde(flatten)]
    pub plan: PlanBounds,
    pub floor_y: f64,
    pub ceiling_y: f64,
}

impl RoomBounds {
    pub fn new(plan: PlanBounds, ceiling_height: f64) -> Self {
        Self { plan, floor_y: 0.0, ceiling_y: ceiling_height }
    }
}

/// One rectangular wall panel spanning an outline edge from floor to ceiling
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WallSegment {
    pub start: OutlinePoint,
    pub end: OutlinePoint,
    pub midpoint: Vec3,
    pub length: f64,
    /// Edge direction on the floor plane, `atan2(dz, dx)` in radians
    pub angle: f64,
    pub height: f64,
}

/// Summary measurements for review and export
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoomDimensions {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    pub area: f64,
    pub perimeter: f64,
}

/// Extrema of all recorded (x, z) pairs, or `None` below three points
pub fn compute_bounds(outline: &[OutlinePoint]) -> Option<PlanBounds> {
    if outline.len() < MIN_POLYGON_POINTS {
        return None;
    }

    let mut bounds = PlanBounds {
        min_x: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        min_z: f64::INFINITY,
        max_z: f64::NEG_INFINITY,
    };
    for p in outline {
        bounds.min_x = bounds.min_x.min(p.x);
        bounds.max_x = bounds.max_x.max(p.x);
        bounds.min_z = bounds.min_z.min(p.z);
        bounds.max_z = bounds.max_z.max(p.z);
    }
    Some(bounds)
}

/// Wall panel per edge, in outline order, including the closing edge last -> first.
///
/// Zero-length edges (repeated points) produce zero-length walls; renderers may skip them.
pub fn compute_wall_segments(outline: &[OutlinePoint], ceiling_height: f64) -> Vec<WallSegment> {
    if outline.len() < MIN_POLYGON_POINTS {
        return Vec::new();
    }

    closed_edges(outline)
        .map(|(start, end)| {
            let dx = end.x - start.x;
            let dz = end.z - start.z;
            WallSegment {
                start,
                end,
                midpoint: Vec3::new(
                    (start.x + end.x) / 2.0,
                    ceiling_height / 2.0,
                    (start.z + end.z) / 2.0,
                ),
                length: dx.hypot(dz),
                angle: dz.atan2(dx),
                height: ceiling_height,
            }
        })
        .collect()
}

/// Width, depth, height, floor area (shoelace) and perimeter
pub fn compute_dimensions(outline: &[OutlinePoint], ceiling_height: f64) -> Option<RoomDimensions> {
    let bounds = compute_bounds(outline)?;

    let twice_area: f64 = closed_edges(outline).map(|(a, b)| a.x * b.z - b.x * a.z).sum();
    let perimeter: f64 = closed_edges(outline).map(|(a, b)| (b.x - a.x).hypot(b.z - a.z)).sum();

    Some(RoomDimensions {
        width: bounds.width(),
        depth: bounds.depth(),
        height: ceiling_height,
        area: twice_area.abs() / 2.0,
        perimeter,
    })
}

fn closed_edges(outline: &[OutlinePoint]) -> impl Iterator<Item = (OutlinePoint, OutlinePoint)> + '_ {
    outline.iter().enumerate().map(move |(i, &p)| (p, outline[(i + 1) % outline.len()]))
}

/// Cached derivation, recomputed eagerly after every mutation that affects it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedGeometry {
    pub bounds: Option<RoomBounds>,
    pub walls: Vec<WallSegment>,
    pub dimensions: Option<RoomDimensions>,
}

impl DerivedGeometry {
    pub fn compute(outline: &[OutlinePoint], ceiling_height: f64) -> Self {
        Self {
            bounds: compute_bounds(outline).map(|plan| RoomBounds::new(plan, ceiling_height)),
            walls: compute_wall_segments(outline, ceiling_height),
            dimensions: compute_dimensions(outline, ceiling_height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn pts(raw: &[(f64, f64)]) -> Vec<OutlinePoint> {
        raw.iter().map(|&(x, z)| OutlinePoint::new(x, z)).collect()
    }

    fn rectangle() -> Vec<OutlinePoint> {
        pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (0.0, 3.0)])
    }

    #[test]
    fn test_bounds_triangle() {
        let bounds = compute_bounds(&pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 3.0)])).unwrap();
        assert_eq!(bounds, PlanBounds { min_x: 0.0, max_x: 4.0, min_z: 0.0, max_z: 3.0 });
        assert_eq!(bounds.width(), 4.0);
        assert_eq!(bounds.depth(), 3.0);
    }

    #[test]
    fn test_bounds_unavailable_below_three_points() {
        assert!(compute_bounds(&[]).is_none());
        assert!(compute_bounds(&pts(&[(0.0, 0.0)])).is_none());
        assert!(compute_bounds(&pts(&[(0.0, 0.0), (1.0, 1.0)])).is_none());
    }

    #[test]
    fn test_bounds_negative_coordinates() {
        let bounds = compute_bounds(&pts(&[(-1.5, 2.0), (0.5, -3.0), (2.0, 0.0)])).unwrap();
        assert_eq!(bounds.min_x, -1.5);
        assert_eq!(bounds.max_x, 2.0);
        assert_eq!(bounds.min_z, -3.0);
        assert_eq!(bounds.max_z, 2.0);
    }

    #[test]
    fn test_room_bounds_elevations() {
        let plan = compute_bounds(&rectangle()).unwrap();
        let room = RoomBounds::new(plan, 2.5);
        assert_eq!(room.floor_y, 0.0);
        assert_eq!(room.ceiling_y, 2.5);

        let json = serde_json::to_value(room).unwrap();
        assert_eq!(json["min_x"], 0.0);
        assert_eq!(json["max_z"], 3.0);
        assert_eq!(json["ceiling_y"], 2.5);
    }

    #[test]
    fn test_rectangle_walls_close_the_polygon() {
        let outline = rectangle();
        let walls = compute_wall_segments(&outline, 2.5);

        assert_eq!(walls.len(), 4);
        let lengths: Vec<f64> = walls.iter().map(|w| w.length).collect();
        for (got, want) in lengths.iter().zip([4.0, 3.0, 4.0, 3.0]) {
            assert!((got - want).abs() < EPS, "got {got}, want {want}");
        }

        // last wall runs from point 4 back to point 1
        assert_eq!(walls[3].start, outline[3]);
        assert_eq!(walls[3].end, outline[0]);

        for wall in &walls {
            assert!((wall.midpoint.y - 1.25).abs() < EPS);
            assert_eq!(wall.height, 2.5);
        }
    }

    #[test]
    fn test_wall_midpoints_and_angles() {
        let walls = compute_wall_segments(&rectangle(), 2.5);

        assert_eq!(walls[0].midpoint, Vec3::new(2.0, 1.25, 0.0));
        assert!((walls[0].angle - 0.0).abs() < EPS);
        assert!((walls[1].angle - std::f64::consts::FRAC_PI_2).abs() < EPS);
        assert!((walls[2].angle.abs() - std::f64::consts::PI).abs() < EPS);
        assert!((walls[3].angle + std::f64::consts::FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn test_zero_length_edge_is_kept() {
        let outline = pts(&[(0.0, 0.0), (0.0, 0.0), (2.0, 0.0), (2.0, 2.0)]);
        let walls = compute_wall_segments(&outline, 2.4);
        assert_eq!(walls.len(), 4);
        assert_eq!(walls[0].length, 0.0);
    }

    #[test]
    fn test_walls_empty_below_three_points() {
        assert!(compute_wall_segments(&pts(&[(0.0, 0.0), (1.0, 0.0)]), 2.4).is_empty());
    }

    #[test]
    fn test_dimensions_rectangle() {
        let dims = compute_dimensions(&rectangle(), 2.5).unwrap();
        assert_eq!(dims.width, 4.0);
        assert_eq!(dims.depth, 3.0);
        assert_eq!(dims.height, 2.5);
        assert!((dims.area - 12.0).abs() < EPS);
        assert!((dims.perimeter - 14.0).abs() < EPS);
    }

    #[test]
    fn test_area_ignores_winding() {
        let mut clockwise = rectangle();
        clockwise.reverse();
        let dims = compute_dimensions(&clockwise, 2.5).unwrap();
        assert!((dims.area - 12.0).abs() < EPS);
    }

    #[test]
    fn test_derived_geometry_compute() {
        let derived = DerivedGeometry::compute(&rectangle(), 2.5);
        assert!(derived.bounds.is_some());
        assert_eq!(derived.walls.len(), 4);
        assert!(derived.dimensions.is_some());

        let empty = DerivedGeometry::compute(&[], 2.5);
        assert_eq!(empty, DerivedGeometry::default());
    }
}
