//! Geometry and static navigation data

pub mod airport;
pub mod geometry;

pub use airport::{Airport, IlsCategory, NavDataError, Navaid, NavaidKind, Runway, Waypoint};
pub use geometry::{CourseLine, Position, TurnDirection};
