//! Resolution and admission checks for parsed commands

use tracing::debug;

use crate::navdata::geometry::heading_deviation;
use crate::navdata::{Airport, Runway, TurnDirection};
use crate::sim::aircraft::Aircraft;
use crate::sim::physics::PerformanceEnvelope;
use crate::sim::registry::AircraftRegistry;

use super::parser::{parse_commands, split_callsign, RawCommand};
use super::{CommandError, Directive, LandingRejection, SubCommand};

/// Limits an aircraft must be inside to accept an ILS clearance
#[derive(Debug, Clone, Copy)]
pub struct ApproachLimits {
    /// Straight-line distance to the threshold (nm)
    pub max_distance_nm: f64,
    /// Height above the threshold (ft)
    pub max_height_ft: f64,
    pub max_speed_kt: f64,
    /// Intercept angle allowed inside `close_range_nm`
    pub close_intercept_deg: f64,
    /// Intercept angle allowed beyond `close_range_nm`
    pub far_intercept_deg: f64,
    pub close_range_nm: f64,
}

impl ApproachLimits {
    pub const fn standard() -> Self {
        Self {
            max_distance_nm: 15.0,
            max_height_ft: 5000.0,
            max_speed_kt: 240.0,
            close_intercept_deg: 20.0,
            far_intercept_deg: 30.0,
            close_range_nm: 5.0,
        }
    }

    /// First failing precondition, in a fixed order
    pub fn check(&self, aircraft: &Aircraft, runway: &Runway) -> Result<(), LandingRejection> {
        if !runway.has_ils() {
            return Err(LandingRejection::NoIls(runway.id.clone()));
        }

        let distance_nm = aircraft.position.distance_to(runway.threshold);
        if distance_nm > self.max_distance_nm {
            return Err(LandingRejection::TooFar {
                distance_nm,
                max_nm: self.max_distance_nm,
            });
        }

        let height_ft = aircraft.altitude - runway.threshold_elevation();
        if height_ft > self.max_height_ft {
            return Err(LandingRejection::TooHigh {
                height_ft,
                max_ft: self.max_height_ft,
            });
        }

        if aircraft.speed > self.max_speed_kt {
            return Err(LandingRejection::TooFast {
                speed_kt: aircraft.speed,
                max_kt: self.max_speed_kt,
            });
        }

        let max_deg = if distance_nm <= self.close_range_nm {
            self.close_intercept_deg
        } else {
            self.far_intercept_deg
        };
        let deviation_deg = heading_deviation(aircraft.heading, runway.heading);
        if deviation_deg > max_deg {
            return Err(LandingRejection::BadInterceptAngle {
                deviation_deg,
                max_deg,
            });
        }

        Ok(())
    }
}

impl Default for ApproachLimits {
    fn default() -> Self {
        Self::standard()
    }
}

/// Turns controller text into a validated [`Directive`]
pub struct CommandInterpreter<'a> {
    airport: &'a Airport,
    envelope: &'a PerformanceEnvelope,
    limits: ApproachLimits,
}

impl<'a> CommandInterpreter<'a> {
    pub fn new(airport: &'a Airport, envelope: &'a PerformanceEnvelope) -> Self {
        Self {
            airport,
            envelope,
            limits: ApproachLimits::standard(),
        }
    }

    /// Parse and validate `text` against the current aircraft state.
    ///
    /// The whole directive is rejected on the first failing sub-command.
    pub fn interpret(
        &self,
        text: &str,
        registry: &AircraftRegistry,
    ) -> Result<Directive, CommandError> {
        let (callsign, tokens) = split_callsign(text)?;
        let aircraft = registry
            .find(&callsign)
            .ok_or_else(|| CommandError::UnknownAircraft(callsign.clone()))?;

        let raw = parse_commands(&tokens)?;

        if aircraft.on_ground() {
            return Err(CommandError::OnGround(aircraft.callsign.clone()));
        }

        let commands = raw
            .into_iter()
            .map(|cmd| self.resolve(cmd, aircraft))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            callsign = %aircraft.callsign,
            count = commands.len(),
            "Directive admitted"
        );

        Ok(Directive {
            aircraft_id: aircraft.id,
            callsign: aircraft.callsign.clone(),
            commands,
        })
    }

    fn resolve(&self, raw: RawCommand, aircraft: &Aircraft) -> Result<SubCommand, CommandError> {
        match raw {
            RawCommand::Heading { heading, turn } => Ok(SubCommand::Heading { heading, turn }),
            RawCommand::Altitude {
                thousands,
                expedite,
            } => {
                let altitude = f64::from(thousands) * 1000.0;
                if !self.envelope.altitude_in_range(altitude) {
                    return Err(CommandError::OutOfEnvelope {
                        what: "altitude",
                        value: altitude,
                        min: self.envelope.min_altitude,
                        max: self.envelope.max_altitude,
                    });
                }
                Ok(SubCommand::Altitude { altitude, expedite })
            }
            RawCommand::Speed { knots, expedite } => {
                let speed = f64::from(knots);
                if !self.envelope.speed_in_range(speed) {
                    return Err(CommandError::OutOfEnvelope {
                        what: "speed",
                        value: speed,
                        min: self.envelope.min_speed,
                        max: self.envelope.max_speed,
                    });
                }
                Ok(SubCommand::Speed { speed, expedite })
            }
            RawCommand::Waypoint { name, turn } => {
                let fix = self
                    .airport
                    .find_fix(&name)
                    .ok_or(CommandError::UnknownWaypoint(name))?;
                Ok(SubCommand::DirectTo { fix, turn })
            }
            RawCommand::Hold { fix, turn } => {
                let fix = self
                    .airport
                    .find_fix(&fix)
                    .ok_or(CommandError::UnknownWaypoint(fix))?;
                Ok(SubCommand::Hold {
                    fix,
                    turn: turn.unwrap_or(TurnDirection::Right),
                })
            }
            RawCommand::Land { runway } => {
                let runway = self
                    .airport
                    .runway(&runway)
                    .ok_or(CommandError::UnknownRunway(runway))?;
                self.limits
                    .check(aircraft, runway)
                    .map_err(CommandError::LandingPreconditionFailed)?;
                Ok(SubCommand::Land {
                    runway: runway.clone(),
                })
            }
            RawCommand::Abort => {
                if !aircraft.on_approach() {
                    return Err(CommandError::NotOnApproach(aircraft.callsign.clone()));
                }
                Ok(SubCommand::Abort)
            }
        }
    }
}
