//! Per-aircraft navigation state machine
//!
//! Applies admitted directives at the tick boundary and, once per tick,
//! turns the active lateral mode into heading/altitude/speed targets for the
//! kinematics step. Geometric triggers (localizer capture, fix passage, hold
//! legs, threshold crossing, boundary exit) are evaluated here.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::command::SubCommand;
use crate::navdata::geometry::{heading_deviation, normalize_heading, reciprocal, FEET_PER_NM};
use crate::navdata::{Airport, CourseLine, Position, Runway, Waypoint};

use super::aircraft::{Aircraft, HoldPhase, HoldSpec, LateralMode, SpeedTarget, VerticalTarget};
use super::physics::PerformanceEnvelope;

/// Headings closer than this count as reached
const HEADING_REACHED_DEG: f64 = 1e-6;
/// Leg timers at or below this count as expired
const TIMER_EPSILON: f64 = 1e-9;

/// Tuning for the automatic modes
#[derive(Debug, Clone, Copy)]
pub struct NavigationParams {
    /// Localizer intercept correction per nm of cross-track error
    pub localizer_gain_deg_per_nm: f64,
    /// Largest correction applied off the localizer course
    pub max_intercept_correction_deg: f64,
    /// Cross-track error inside which the localizer counts as captured
    pub established_cross_track_nm: f64,
    /// Heading tolerance for localizer capture
    pub established_heading_deg: f64,
    /// Along-track distance inside which final approach speed is enforced
    pub final_speed_range_nm: f64,
    pub final_speed_kt: f64,
    /// Maximum height above the threshold when crossing it
    pub touchdown_height_ft: f64,
    /// Maximum cross-track error when crossing the threshold
    pub touchdown_cross_track_nm: f64,
    /// Distance at which a fix counts as passed
    pub fix_passage_nm: f64,
    /// A fix behind the aircraft within this range counts as passed
    pub fix_behind_nm: f64,
    pub hold_leg_secs: f64,
    pub missed_approach_altitude_ft: f64,
    pub missed_approach_speed_kt: f64,
    /// Radius from the airport reference point beyond which aircraft leave
    pub boundary_nm: f64,
}

impl NavigationParams {
    pub const fn standard() -> Self {
        Self {
            localizer_gain_deg_per_nm: 30.0,
            max_intercept_correction_deg: 30.0,
            established_cross_track_nm: 0.15,
            established_heading_deg: 10.0,
            final_speed_range_nm: 5.0,
            final_speed_kt: 140.0,
            touchdown_height_ft: 100.0,
            touchdown_cross_track_nm: 0.2,
            fix_passage_nm: 0.5,
            fix_behind_nm: 2.0,
            hold_leg_secs: 60.0,
            missed_approach_altitude_ft: 3000.0,
            missed_approach_speed_kt: 180.0,
            boundary_nm: 40.0,
        }
    }

    pub fn with_boundary(mut self, boundary_nm: f64) -> Self {
        self.boundary_nm = boundary_nm;
        self
    }
}

impl Default for NavigationParams {
    fn default() -> Self {
        Self::standard()
    }
}

/// Why an approach was abandoned at the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoAroundReason {
    TooHigh,
    OffCentreline,
    NotEstablished,
    RunwayOccupied,
}

impl GoAroundReason {
    pub fn as_str(self) -> &'static str {
        match self {
            GoAroundReason::TooHigh => "too high",
            GoAroundReason::OffCentreline => "off centreline",
            GoAroundReason::NotEstablished => "not established",
            GoAroundReason::RunwayOccupied => "runway occupied",
        }
    }
}

/// Mode transitions worth reporting
#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    Established { runway: String },
    Touchdown { runway: String },
    GoAround { runway: String, reason: GoAroundReason },
    Landed { runway: String },
    Exited,
}

/// Stateless mode logic; all state lives on the aircraft
pub struct NavigationSystem;

impl NavigationSystem {
    /// Apply a directive's sub-commands in order
    pub fn apply(aircraft: &mut Aircraft, commands: &[SubCommand], params: &NavigationParams) {
        for command in commands {
            Self::apply_one(aircraft, command, params);
        }
    }

    fn apply_one(aircraft: &mut Aircraft, command: &SubCommand, params: &NavigationParams) {
        match command {
            SubCommand::Heading { heading, turn } => {
                let heading = normalize_heading(*heading);
                aircraft.mode = LateralMode::HeadingHold { heading };
                aircraft.target_heading = heading;
                aircraft.turn_override = *turn;
            }
            SubCommand::Altitude { altitude, expedite } => {
                aircraft.vertical = VerticalTarget {
                    altitude: *altitude,
                    expedite: *expedite,
                };
            }
            SubCommand::Speed { speed, expedite } => {
                aircraft.speed_target = SpeedTarget {
                    speed: *speed,
                    expedite: *expedite,
                };
            }
            SubCommand::DirectTo { fix, turn } => {
                aircraft.target_heading = aircraft.position.bearing_to(fix.position);
                aircraft.mode = LateralMode::DirectTo {
                    fix: fix.clone(),
                    passed: false,
                    closing: false,
                };
                aircraft.turn_override = *turn;
            }
            SubCommand::Hold { fix, turn } => {
                let inbound_course =
                    if aircraft.position.distance_to(fix.position) <= params.fix_passage_nm {
                        aircraft.heading
                    } else {
                        aircraft.position.bearing_to(fix.position)
                    };
                aircraft.target_heading = inbound_course;
                aircraft.turn_override = None;
                aircraft.mode = LateralMode::Holding(HoldSpec {
                    fix: fix.clone(),
                    inbound_course,
                    turn: *turn,
                    phase: HoldPhase::Entry { closing: false },
                });
            }
            SubCommand::Land { runway } => {
                aircraft.turn_override = None;
                aircraft.mode = LateralMode::Localizer {
                    runway: runway.id.clone(),
                };
            }
            SubCommand::Abort => {
                // Validated against the mode at submission; an earlier subcommand
                // or tick may have taken the aircraft off the approach since
                if aircraft.on_approach() {
                    Self::begin_missed_approach(aircraft, params);
                } else {
                    debug!(callsign = %aircraft.callsign, "Abort dropped, not on approach");
                }
            }
        }
    }

    /// Fly the present heading, climb to at least the missed approach altitude
    /// and accelerate to at least the missed approach speed, at normal rates
    pub fn begin_missed_approach(aircraft: &mut Aircraft, params: &NavigationParams) {
        let heading = aircraft.heading;
        aircraft.mode = LateralMode::MissedApproach { heading };
        aircraft.target_heading = heading;
        aircraft.turn_override = None;
        aircraft.vertical = VerticalTarget {
            altitude: aircraft.altitude.max(params.missed_approach_altitude_ft),
            expedite: false,
        };
        aircraft.speed_target = SpeedTarget {
            speed: aircraft.speed.max(params.missed_approach_speed_kt),
            expedite: false,
        };
    }

    /// Compute this tick's targets and evaluate geometric transitions.
    ///
    /// `occupied` holds the runways with an aircraft rolling out; touchdowns
    /// during this call are added to it.
    pub fn update(
        aircraft: &mut Aircraft,
        airport: &Airport,
        envelope: &PerformanceEnvelope,
        params: &NavigationParams,
        occupied: &mut HashSet<String>,
        dt: f64,
    ) -> Option<NavEvent> {
        if aircraft.is_terminal() {
            return None;
        }

        if !aircraft.in_landing_sequence()
            && aircraft.position.distance_to(airport.reference_point()) > params.boundary_nm
        {
            info!(callsign = %aircraft.callsign, "Aircraft left the airspace");
            aircraft.mode = LateralMode::Exited;
            return Some(NavEvent::Exited);
        }

        // Work on a copy so the mode can be replaced while reading it
        match aircraft.mode.clone() {
            LateralMode::HeadingHold { heading } | LateralMode::MissedApproach { heading } => {
                aircraft.target_heading = heading;
                None
            }
            LateralMode::DirectTo {
                fix,
                passed,
                closing,
            } => {
                Self::update_direct_to(aircraft, fix, passed, closing, params);
                None
            }
            LateralMode::Holding(hold) => {
                Self::update_hold(aircraft, hold, params, dt);
                None
            }
            LateralMode::Localizer { runway } => match airport.runway(&runway) {
                Some(rwy) => Self::update_localizer(aircraft, rwy, params),
                None => Self::lost_runway(aircraft, &runway),
            },
            LateralMode::Glideslope { runway } => match airport.runway(&runway) {
                Some(rwy) => Self::update_glideslope(aircraft, rwy, params, occupied),
                None => Self::lost_runway(aircraft, &runway),
            },
            LateralMode::Rollout { runway } => {
                Self::update_rollout(aircraft, airport.runway(&runway), &runway, envelope)
            }
            LateralMode::Landed { .. } | LateralMode::Exited => None,
        }
    }

    fn lost_runway(aircraft: &mut Aircraft, runway: &str) -> Option<NavEvent> {
        let heading = aircraft.heading;
        debug!(callsign = %aircraft.callsign, runway, "Cleared runway not found");
        aircraft.mode = LateralMode::HeadingHold { heading };
        aircraft.target_heading = heading;
        None
    }

    /// Passed when close, or when a fix the aircraft was closing on is now
    /// behind and still near
    fn fix_passed(
        aircraft: &Aircraft,
        fix: Position,
        closing: bool,
        params: &NavigationParams,
    ) -> bool {
        let distance = aircraft.position.distance_to(fix);
        if distance <= params.fix_passage_nm {
            return true;
        }
        closing && distance <= params.fix_behind_nm && !Self::heading_toward(aircraft, fix)
    }

    /// Fix within 90 degrees of the nose
    fn heading_toward(aircraft: &Aircraft, fix: Position) -> bool {
        heading_deviation(aircraft.heading, aircraft.position.bearing_to(fix)) <= 90.0
    }

    fn update_direct_to(
        aircraft: &mut Aircraft,
        fix: Waypoint,
        passed: bool,
        closing: bool,
        params: &NavigationParams,
    ) {
        if passed {
            return;
        }
        if Self::fix_passed(aircraft, fix.position, closing, params) {
            debug!(callsign = %aircraft.callsign, fix = %fix.name, "Fix passed");
            aircraft.target_heading = aircraft.heading;
            aircraft.turn_override = None;
            aircraft.mode = LateralMode::DirectTo {
                fix,
                passed: true,
                closing: true,
            };
        } else {
            aircraft.target_heading = aircraft.position.bearing_to(fix.position);
            let closing = closing || Self::heading_toward(aircraft, fix.position);
            aircraft.mode = LateralMode::DirectTo {
                fix,
                passed: false,
                closing,
            };
        }
    }

    fn update_hold(
        aircraft: &mut Aircraft,
        mut hold: HoldSpec,
        params: &NavigationParams,
        dt: f64,
    ) {
        let outbound = reciprocal(hold.inbound_course);

        match hold.phase {
            HoldPhase::Entry { closing } => {
                if Self::fix_passed(aircraft, hold.fix.position, closing, params) {
                    Self::start_outbound_turn(aircraft, &mut hold, outbound);
                } else {
                    aircraft.target_heading = aircraft.position.bearing_to(hold.fix.position);
                    hold.phase = HoldPhase::Entry {
                        closing: closing || Self::heading_toward(aircraft, hold.fix.position),
                    };
                }
            }
            HoldPhase::OutboundTurn => {
                if heading_deviation(aircraft.heading, outbound) <= HEADING_REACHED_DEG {
                    aircraft.turn_override = None;
                    aircraft.target_heading = outbound;
                    hold.phase = HoldPhase::OutboundLeg {
                        remaining_secs: params.hold_leg_secs,
                    };
                } else {
                    aircraft.target_heading = outbound;
                    aircraft.turn_override = Some(hold.turn);
                }
            }
            HoldPhase::OutboundLeg { remaining_secs } => {
                let remaining_secs = remaining_secs - dt;
                aircraft.target_heading = outbound;
                if remaining_secs <= TIMER_EPSILON {
                    aircraft.target_heading = hold.inbound_course;
                    aircraft.turn_override = Some(hold.turn);
                    hold.phase = HoldPhase::InboundTurn;
                } else {
                    hold.phase = HoldPhase::OutboundLeg { remaining_secs };
                }
            }
            HoldPhase::InboundTurn => {
                if heading_deviation(aircraft.heading, hold.inbound_course) <= HEADING_REACHED_DEG
                {
                    aircraft.turn_override = None;
                    aircraft.target_heading = aircraft.position.bearing_to(hold.fix.position);
                    hold.phase = HoldPhase::Inbound;
                } else {
                    aircraft.target_heading = hold.inbound_course;
                    aircraft.turn_override = Some(hold.turn);
                }
            }
            HoldPhase::Inbound => {
                let inbound_track = CourseLine::new(hold.fix.position, hold.inbound_course);
                if Self::fix_passed(aircraft, hold.fix.position, true, params)
                    || inbound_track.along_track_to_origin(aircraft.position) <= 0.0
                {
                    Self::start_outbound_turn(aircraft, &mut hold, outbound);
                } else {
                    aircraft.target_heading = aircraft.position.bearing_to(hold.fix.position);
                }
            }
        }

        aircraft.mode = LateralMode::Holding(hold);
    }

    fn start_outbound_turn(aircraft: &mut Aircraft, hold: &mut HoldSpec, outbound: f64) {
        aircraft.target_heading = outbound;
        aircraft.turn_override = Some(hold.turn);
        hold.phase = HoldPhase::OutboundTurn;
    }

    /// Heading that converges on the course line, positive cross-track being right of it
    fn intercept_heading(
        course: &CourseLine,
        position: Position,
        params: &NavigationParams,
    ) -> f64 {
        let correction = (course.cross_track(position) * params.localizer_gain_deg_per_nm).clamp(
            -params.max_intercept_correction_deg,
            params.max_intercept_correction_deg,
        );
        normalize_heading(course.course - correction)
    }

    fn update_localizer(
        aircraft: &mut Aircraft,
        runway: &Runway,
        params: &NavigationParams,
    ) -> Option<NavEvent> {
        let localizer = runway.localizer();
        if localizer.along_track_to_origin(aircraft.position) <= 0.0 {
            return Some(Self::go_around(
                aircraft,
                runway,
                GoAroundReason::NotEstablished,
                params,
            ));
        }

        aircraft.target_heading = Self::intercept_heading(&localizer, aircraft.position, params);

        let cross_track = localizer.cross_track(aircraft.position);
        if cross_track.abs() <= params.established_cross_track_nm
            && heading_deviation(aircraft.heading, runway.heading) <= params.established_heading_deg
        {
            info!(callsign = %aircraft.callsign, runway = %runway.id, "Established on localizer");
            aircraft.mode = LateralMode::Glideslope {
                runway: runway.id.clone(),
            };
            return Some(NavEvent::Established {
                runway: runway.id.clone(),
            });
        }
        None
    }

    fn update_glideslope(
        aircraft: &mut Aircraft,
        runway: &Runway,
        params: &NavigationParams,
        occupied: &mut HashSet<String>,
    ) -> Option<NavEvent> {
        let localizer = runway.localizer();
        let along = localizer.along_track_to_origin(aircraft.position);
        let cross_track = localizer.cross_track(aircraft.position);
        let elevation = runway.threshold_elevation();

        if along <= 0.0 {
            let reason = if aircraft.altitude > elevation + params.touchdown_height_ft {
                Some(GoAroundReason::TooHigh)
            } else if cross_track.abs() > params.touchdown_cross_track_nm {
                Some(GoAroundReason::OffCentreline)
            } else if occupied.contains(&runway.id) {
                Some(GoAroundReason::RunwayOccupied)
            } else {
                None
            };

            return Some(match reason {
                Some(reason) => Self::go_around(aircraft, runway, reason, params),
                None => Self::touch_down(aircraft, runway, occupied),
            });
        }

        aircraft.target_heading = Self::intercept_heading(&localizer, aircraft.position, params);

        let profile = elevation + along * runway.glide_angle_deg.to_radians().tan() * FEET_PER_NM;
        aircraft.vertical = VerticalTarget {
            altitude: profile.min(aircraft.altitude),
            expedite: false,
        };

        if along <= params.final_speed_range_nm {
            aircraft.speed_target = SpeedTarget {
                speed: params.final_speed_kt,
                expedite: false,
            };
        }
        None
    }

    fn touch_down(
        aircraft: &mut Aircraft,
        runway: &Runway,
        occupied: &mut HashSet<String>,
    ) -> NavEvent {
        info!(callsign = %aircraft.callsign, runway = %runway.id, "Touchdown");
        let elevation = runway.threshold_elevation();
        aircraft.altitude = elevation;
        aircraft.vertical = VerticalTarget {
            altitude: elevation,
            expedite: false,
        };
        aircraft.speed_target = SpeedTarget {
            speed: 0.0,
            expedite: false,
        };
        aircraft.target_heading = runway.heading;
        aircraft.turn_override = None;
        aircraft.mode = LateralMode::Rollout {
            runway: runway.id.clone(),
        };
        occupied.insert(runway.id.clone());
        NavEvent::Touchdown {
            runway: runway.id.clone(),
        }
    }

    fn go_around(
        aircraft: &mut Aircraft,
        runway: &Runway,
        reason: GoAroundReason,
        params: &NavigationParams,
    ) -> NavEvent {
        info!(
            callsign = %aircraft.callsign,
            runway = %runway.id,
            reason = reason.as_str(),
            "Going around"
        );
        Self::begin_missed_approach(aircraft, params);
        NavEvent::GoAround {
            runway: runway.id.clone(),
            reason,
        }
    }

    fn update_rollout(
        aircraft: &mut Aircraft,
        runway: Option<&Runway>,
        runway_id: &str,
        envelope: &PerformanceEnvelope,
    ) -> Option<NavEvent> {
        if let Some(runway) = runway {
            aircraft.target_heading = runway.heading;
            aircraft.altitude = runway.threshold_elevation();
        }
        if aircraft.speed <= envelope.vacate_speed {
            info!(callsign = %aircraft.callsign, runway = runway_id, "Vacated runway");
            aircraft.mode = LateralMode::Landed {
                runway: runway_id.to_string(),
            };
            return Some(NavEvent::Landed {
                runway: runway_id.to_string(),
            });
        }
        None
    }
}

/// Runways with an aircraft currently rolling out
pub fn occupied_runways<'a>(aircraft: impl Iterator<Item = &'a Aircraft>) -> HashSet<String> {
    aircraft
        .filter_map(|a| match &a.mode {
            LateralMode::Rollout { runway } => Some(runway.clone()),
            _ => None,
        })
        .collect()
}
