//! Plane geometry for the airport-relative frame
//!
//! Positions are in nautical miles with x pointing east and y pointing north.
//! Headings are degrees clockwise from north in `[0, 360)`.

use serde::{Deserialize, Serialize};

/// Feet per nautical mile
pub const FEET_PER_NM: f64 = 6076.115;

/// A point in the airport-relative plane (nautical miles)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Straight-line distance in nautical miles
    pub fn distance_to(&self, other: Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Bearing from this point to `other`, degrees true
    pub fn bearing_to(&self, other: Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        normalize_heading(dx.atan2(dy).to_degrees())
    }

    /// Point reached by travelling `distance_nm` along `heading`
    pub fn project(&self, heading: f64, distance_nm: f64) -> Position {
        let rad = heading.to_radians();
        Position {
            x: self.x + rad.sin() * distance_nm,
            y: self.y + rad.cos() * distance_nm,
        }
    }
}

/// Turn direction for heading changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// +1 for right (clockwise), -1 for left
    pub fn sign(self) -> f64 {
        match self {
            TurnDirection::Left => -1.0,
            TurnDirection::Right => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TurnDirection::Left => "left",
            TurnDirection::Right => "right",
        }
    }
}

/// Normalize any angle into `[0, 360)`
pub fn normalize_heading(heading: f64) -> f64 {
    let h = heading.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if h >= 360.0 {
        0.0
    } else {
        h
    }
}

/// Signed shortest difference `to - from` in `(-180, 180]`
pub fn heading_difference(from: f64, to: f64) -> f64 {
    let diff = (to - from).rem_euclid(360.0);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

/// Absolute angular deviation between two headings in `[0, 180]`
pub fn heading_deviation(a: f64, b: f64) -> f64 {
    heading_difference(a, b).abs()
}

/// Direction of the shorter arc from `from` to `to`; exactly 180 degrees resolves right
pub fn shortest_turn(from: f64, to: f64) -> TurnDirection {
    if heading_difference(from, to) >= 0.0 {
        TurnDirection::Right
    } else {
        TurnDirection::Left
    }
}

/// Degrees still to turn from `from` to `to` when turning in `direction`, in `[0, 360)`
pub fn turn_remaining(from: f64, to: f64, direction: TurnDirection) -> f64 {
    match direction {
        TurnDirection::Right => (to - from).rem_euclid(360.0),
        TurnDirection::Left => (from - to).rem_euclid(360.0),
    }
}

/// Reciprocal of a heading
pub fn reciprocal(heading: f64) -> f64 {
    normalize_heading(heading + 180.0)
}

/// A course line through a reference point, e.g. a localizer through a runway threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CourseLine {
    pub origin: Position,
    pub course: f64,
}

impl CourseLine {
    pub fn new(origin: Position, course: f64) -> Self {
        Self {
            origin,
            course: normalize_heading(course),
        }
    }

    /// Distance remaining along the course until `origin` is reached.
    /// Positive before the origin, negative once past it.
    pub fn along_track_to_origin(&self, pos: Position) -> f64 {
        let rad = self.course.to_radians();
        (self.origin.x - pos.x) * rad.sin() + (self.origin.y - pos.y) * rad.cos()
    }

    /// Signed cross-track distance, positive to the right of the course
    pub fn cross_track(&self, pos: Position) -> f64 {
        let rad = self.course.to_radians();
        (pos.x - self.origin.x) * rad.cos() - (pos.y - self.origin.y) * rad.sin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn bearing_uses_compass_convention() {
        let origin = Position::new(0.0, 0.0);
        assert!((origin.bearing_to(Position::new(0.0, 5.0)) - 0.0).abs() < EPS);
        assert!((origin.bearing_to(Position::new(5.0, 0.0)) - 90.0).abs() < EPS);
        assert!((origin.bearing_to(Position::new(0.0, -5.0)) - 180.0).abs() < EPS);
        assert!((origin.bearing_to(Position::new(-5.0, 0.0)) - 270.0).abs() < EPS);
    }

    #[test]
    fn project_then_measure() {
        let start = Position::new(1.0, 2.0);
        let end = start.project(135.0, 4.0);
        assert!((start.distance_to(end) - 4.0).abs() < 1e-9);
        assert!((start.bearing_to(end) - 135.0).abs() < 1e-9);
    }

    #[test]
    fn shortest_turn_picks_smaller_arc() {
        assert_eq!(shortest_turn(350.0, 10.0), TurnDirection::Right);
        assert_eq!(shortest_turn(10.0, 350.0), TurnDirection::Left);
        assert_eq!(shortest_turn(90.0, 100.0), TurnDirection::Right);
        assert_eq!(shortest_turn(90.0, 80.0), TurnDirection::Left);
    }

    #[test]
    fn half_circle_turn_resolves_right() {
        assert_eq!(shortest_turn(0.0, 180.0), TurnDirection::Right);
        assert_eq!(shortest_turn(180.0, 0.0), TurnDirection::Right);
        assert_eq!(shortest_turn(45.0, 225.0), TurnDirection::Right);
        assert_eq!(shortest_turn(300.0, 120.0), TurnDirection::Right);
    }

    #[test]
    fn shortest_turn_never_exceeds_half_circle() {
        for from in (0..360).step_by(7) {
            for to in (0..360).step_by(11) {
                if from == to {
                    continue;
                }
                let (from, to) = (from as f64, to as f64);
                let dir = shortest_turn(from, to);
                assert!(turn_remaining(from, to, dir) <= 180.0, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn heading_difference_wraps() {
        assert!((heading_difference(350.0, 10.0) - 20.0).abs() < EPS);
        assert!((heading_difference(10.0, 350.0) + 20.0).abs() < EPS);
        assert!((heading_difference(0.0, 180.0) - 180.0).abs() < EPS);
        assert!((heading_deviation(275.0, 265.0) - 10.0).abs() < EPS);
    }

    #[test]
    fn normalize_heading_wraps_into_range() {
        assert_eq!(normalize_heading(360.0), 0.0);
        assert_eq!(normalize_heading(-90.0), 270.0);
        assert_eq!(normalize_heading(725.0), 5.0);
        assert_eq!(reciprocal(270.0), 90.0);
    }

    #[test]
    fn course_line_tracks_runway_27() {
        // threshold at origin, landing westbound
        let loc = CourseLine::new(Position::new(0.0, 0.0), 270.0);

        let on_final = Position::new(8.0, 0.0);
        assert!((loc.along_track_to_origin(on_final) - 8.0).abs() < EPS);
        assert!(loc.cross_track(on_final).abs() < EPS);

        // north of the centreline is right of a westbound course
        let north = Position::new(8.0, 0.5);
        assert!((loc.cross_track(north) - 0.5).abs() < EPS);

        let past = Position::new(-0.3, 0.0);
        assert!(loc.along_track_to_origin(past) < 0.0);
    }
}
