//! Controller command interpretation
//!
//! Text such as `BA123 C 270;L C 3;X S 220` is parsed into a [`Directive`]
//! and validated against the registry and airport data. Nothing here mutates
//! aircraft state: admitted directives are queued by the session and applied
//! at the next tick boundary.

pub mod interpreter;
pub mod parser;

pub use interpreter::{ApproachLimits, CommandInterpreter};
pub use parser::{parse_commands, split_callsign, RawCommand};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::navdata::{Runway, TurnDirection, Waypoint};
use crate::sim::registry::AircraftId;

/// One validated instruction within a directive
#[derive(Debug, Clone, PartialEq)]
pub enum SubCommand {
    Heading {
        heading: f64,
        turn: Option<TurnDirection>,
    },
    Altitude {
        altitude: f64,
        expedite: bool,
    },
    DirectTo {
        fix: Waypoint,
        turn: Option<TurnDirection>,
    },
    Hold {
        fix: Waypoint,
        turn: TurnDirection,
    },
    Speed {
        speed: f64,
        expedite: bool,
    },
    Land {
        runway: Runway,
    },
    Abort,
}

impl fmt::Display for SubCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubCommand::Heading { heading, turn } => {
                write!(f, "heading {:03.0}", heading)?;
                if let Some(turn) = turn {
                    write!(f, " turn {}", turn.as_str())?;
                }
                Ok(())
            }
            SubCommand::Altitude { altitude, expedite } => {
                write!(f, "altitude {:.0}", altitude)?;
                if *expedite {
                    write!(f, " expedite")?;
                }
                Ok(())
            }
            SubCommand::DirectTo { fix, turn } => {
                write!(f, "direct {}", fix.name)?;
                if let Some(turn) = turn {
                    write!(f, " turn {}", turn.as_str())?;
                }
                Ok(())
            }
            SubCommand::Hold { fix, turn } => {
                write!(f, "hold at {} {} turns", fix.name, turn.as_str())
            }
            SubCommand::Speed { speed, expedite } => {
                write!(f, "speed {:.0}", speed)?;
                if *expedite {
                    write!(f, " expedite")?;
                }
                Ok(())
            }
            SubCommand::Land { runway } => write!(f, "cleared ILS runway {}", runway.id),
            SubCommand::Abort => write!(f, "abort approach"),
        }
    }
}

/// A validated bundle of sub-commands for one aircraft, applied atomically
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub aircraft_id: AircraftId,
    pub callsign: String,
    pub commands: Vec<SubCommand>,
}

impl Directive {
    /// Read-back acknowledgement for the controller
    pub fn ack(&self) -> DirectiveAck {
        DirectiveAck {
            callsign: self.callsign.clone(),
            readback: self.commands.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Acknowledgement returned for an admitted directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveAck {
    pub callsign: String,
    pub readback: Vec<String>,
}

impl fmt::Display for DirectiveAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.callsign, self.readback.join(", "))
    }
}

/// Why a landing clearance was refused
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LandingRejection {
    #[error("runway {0} has no ILS")]
    NoIls(String),

    #[error("too far: {distance_nm:.1} nm from threshold (max {max_nm} nm)")]
    TooFar { distance_nm: f64, max_nm: f64 },

    #[error("too high: {height_ft:.0} ft above threshold (max {max_ft} ft)")]
    TooHigh { height_ft: f64, max_ft: f64 },

    #[error("too fast: {speed_kt:.0} kt (max {max_kt} kt)")]
    TooFast { speed_kt: f64, max_kt: f64 },

    #[error("bad intercept angle: {deviation_deg:.0} deg off runway heading (max {max_deg} deg)")]
    BadInterceptAngle { deviation_deg: f64, max_deg: f64 },
}

/// Rejection reasons surfaced to the controller. None of them touch aircraft state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown aircraft {0}")]
    UnknownAircraft(String),

    #[error("Unknown waypoint {0}")]
    UnknownWaypoint(String),

    #[error("Unknown runway {0}")]
    UnknownRunway(String),

    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("{what} {value} outside allowed range {min}-{max}")]
    OutOfEnvelope {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Unable to clear for approach: {0}")]
    LandingPreconditionFailed(LandingRejection),

    #[error("{0} is not on an approach")]
    NotOnApproach(String),

    #[error("Bad ordering: {0}")]
    BadOrdering(String),

    #[error("{0} is on the runway")]
    OnGround(String),

    #[error("Session is over")]
    SessionOver,
}

impl CommandError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::UnknownAircraft(_) => "unknown_aircraft",
            CommandError::UnknownWaypoint(_) => "unknown_waypoint",
            CommandError::UnknownRunway(_) => "unknown_runway",
            CommandError::InvalidSyntax(_) => "invalid_syntax",
            CommandError::OutOfEnvelope { .. } => "out_of_envelope",
            CommandError::LandingPreconditionFailed(_) => "landing_precondition_failed",
            CommandError::NotOnApproach(_) => "not_on_approach",
            CommandError::BadOrdering(_) => "bad_ordering",
            CommandError::OnGround(_) => "on_ground",
            CommandError::SessionOver => "session_over",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navdata::Position;

    #[test]
    fn readback_formats_each_command() {
        let directive = Directive {
            aircraft_id: AircraftId(1),
            callsign: "BA1".to_string(),
            commands: vec![
                SubCommand::Heading {
                    heading: 90.0,
                    turn: Some(TurnDirection::Left),
                },
                SubCommand::Altitude {
                    altitude: 3000.0,
                    expedite: true,
                },
                SubCommand::Hold {
                    fix: Waypoint {
                        name: "OCK".to_string(),
                        position: Position::new(2.0, -9.0),
                    },
                    turn: TurnDirection::Right,
                },
            ],
        };

        let ack = directive.ack();
        assert_eq!(
            ack.to_string(),
            "BA1: heading 090 turn left, altitude 3000 expedite, hold at OCK right turns"
        );
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            CommandError::UnknownAircraft("X".into()).code(),
            "unknown_aircraft"
        );
        assert_eq!(
            CommandError::LandingPreconditionFailed(LandingRejection::NoIls("27R".into())).code(),
            "landing_precondition_failed"
        );
    }
}
