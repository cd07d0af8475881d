//! Aircraft entity and its navigation mode

use serde::{Deserialize, Serialize};

use crate::navdata::{Position, TurnDirection, Waypoint};

use super::registry::AircraftId;

/// Altitude target with its rate selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalTarget {
    pub altitude: f64,
    pub expedite: bool,
}

/// Speed target with its rate selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedTarget {
    pub speed: f64,
    pub expedite: bool,
}

/// Leg of the racetrack currently being flown
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldPhase {
    /// Proceeding direct to the fix for the first time; `closing` latches
    /// once the fix has been within 90 degrees of the nose
    Entry { closing: bool },
    /// Turning onto the outbound (reciprocal) course after passing the fix
    OutboundTurn,
    /// Timed outbound leg
    OutboundLeg { remaining_secs: f64 },
    /// Turning back onto the inbound course
    InboundTurn,
    /// Flying the inbound course to the fix
    Inbound,
}

/// Holding pattern geometry and progress
#[derive(Debug, Clone, PartialEq)]
pub struct HoldSpec {
    pub fix: Waypoint,
    pub inbound_course: f64,
    pub turn: TurnDirection,
    pub phase: HoldPhase,
}

/// Active lateral mode. Exactly one is active per aircraft.
#[derive(Debug, Clone, PartialEq)]
pub enum LateralMode {
    HeadingHold { heading: f64 },
    /// `closing` latches once the fix has been within 90 degrees of the nose
    DirectTo {
        fix: Waypoint,
        passed: bool,
        closing: bool,
    },
    Holding(HoldSpec),
    Localizer { runway: String },
    Glideslope { runway: String },
    MissedApproach { heading: f64 },
    /// On the runway between touchdown and vacating
    Rollout { runway: String },
    Landed { runway: String },
    Exited,
}

/// Flat mode tag for snapshots and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    HeadingHold,
    DirectTo,
    Holding,
    Localizer,
    Glideslope,
    MissedApproach,
    Rollout,
    Landed,
    Exited,
}

impl LateralMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            LateralMode::HeadingHold { .. } => ModeKind::HeadingHold,
            LateralMode::DirectTo { .. } => ModeKind::DirectTo,
            LateralMode::Holding(_) => ModeKind::Holding,
            LateralMode::Localizer { .. } => ModeKind::Localizer,
            LateralMode::Glideslope { .. } => ModeKind::Glideslope,
            LateralMode::MissedApproach { .. } => ModeKind::MissedApproach,
            LateralMode::Rollout { .. } => ModeKind::Rollout,
            LateralMode::Landed { .. } => ModeKind::Landed,
            LateralMode::Exited => ModeKind::Exited,
        }
    }
}

/// Initial state handed over by the spawn producer
#[derive(Debug, Clone, PartialEq)]
pub struct AircraftSpawn {
    pub callsign: String,
    pub position: Position,
    pub heading: f64,
    pub altitude: f64,
    pub speed: f64,
}

/// Mutable simulation state for one flight
#[derive(Debug, Clone)]
pub struct Aircraft {
    pub id: AircraftId,
    pub callsign: String,

    // Kinematic state
    pub position: Position,
    /// Feet
    pub altitude: f64,
    /// Degrees true, [0, 360)
    pub heading: f64,
    /// Knots
    pub speed: f64,
    /// Realized vertical rate over the last tick, ft/min
    pub vertical_rate_fpm: f64,
    /// Realized turn rate over the last tick, deg/s, positive = right
    pub turn_rate_dps: f64,

    // Navigation state
    pub mode: LateralMode,
    pub target_heading: f64,
    pub vertical: VerticalTarget,
    pub speed_target: SpeedTarget,
    pub turn_override: Option<TurnDirection>,

    /// Set while in an active separation conflict
    pub violation: bool,
}

impl Aircraft {
    pub fn new(id: AircraftId, spawn: AircraftSpawn) -> Self {
        let heading = crate::navdata::geometry::normalize_heading(spawn.heading);
        Self {
            id,
            callsign: spawn.callsign,
            position: spawn.position,
            altitude: spawn.altitude,
            heading,
            speed: spawn.speed,
            vertical_rate_fpm: 0.0,
            turn_rate_dps: 0.0,
            mode: LateralMode::HeadingHold { heading },
            target_heading: heading,
            vertical: VerticalTarget {
                altitude: spawn.altitude,
                expedite: false,
            },
            speed_target: SpeedTarget {
                speed: spawn.speed,
                expedite: false,
            },
            turn_override: None,
            violation: false,
        }
    }

    pub fn mode_kind(&self) -> ModeKind {
        self.mode.kind()
    }

    /// Cleared for and flying an ILS approach
    pub fn on_approach(&self) -> bool {
        matches!(
            self.mode,
            LateralMode::Localizer { .. } | LateralMode::Glideslope { .. }
        )
    }

    pub fn on_ground(&self) -> bool {
        matches!(self.mode, LateralMode::Rollout { .. })
    }

    /// Localizer, glideslope or rollout; exempt from boundary exits
    pub fn in_landing_sequence(&self) -> bool {
        self.on_approach() || self.on_ground()
    }

    /// Runway this aircraft is established on (glideslope) or rolling out on
    pub fn landing_runway(&self) -> Option<&str> {
        match &self.mode {
            LateralMode::Glideslope { runway } | LateralMode::Rollout { runway } => {
                Some(runway.as_str())
            }
            _ => None,
        }
    }

    /// Runway of the current ILS clearance, if any
    pub fn cleared_runway(&self) -> Option<&str> {
        match &self.mode {
            LateralMode::Localizer { runway } | LateralMode::Glideslope { runway } => {
                Some(runway.as_str())
            }
            _ => None,
        }
    }

    /// Landed or exited; removed at the end of the tick
    pub fn is_terminal(&self) -> bool {
        matches!(self.mode, LateralMode::Landed { .. } | LateralMode::Exited)
    }
}
