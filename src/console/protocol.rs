//! Output message definitions
//! These are the types the simulation publishes to the presentation layer

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::DirectiveAck;
use crate::sim::aircraft::ModeKind;
use crate::sim::navigation::GoAroundReason;
use crate::sim::registry::AircraftId;
use crate::sim::scoring::ScoreSnapshot;

/// Controller input read from the console
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsoleInput {
    /// Directive text, callsign first
    Command { text: String },
    /// Toggle fast-forward
    FastForward,
    /// End the session
    Quit,
}

impl ConsoleInput {
    /// Classify one console line; blank lines yield nothing
    pub fn parse(line: &str) -> Option<Self> {
        let text = line.trim();
        if text.is_empty() {
            return None;
        }
        if text.eq_ignore_ascii_case("FF") {
            return Some(ConsoleInput::FastForward);
        }
        if text.eq_ignore_ascii_case("QUIT") {
            return Some(ConsoleInput::Quit);
        }
        Some(ConsoleInput::Command {
            text: text.to_string(),
        })
    }
}

/// Messages published by the simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimMsg {
    /// Session started
    Welcome {
        session_id: Uuid,
        airport: String,
        seed: u64,
    },

    /// World state, sent once per rendered frame
    Snapshot {
        tick: u64,
        elapsed_secs: f64,
        fast_forward: bool,
        aircraft: Vec<AircraftSnapshot>,
        score: ScoreSnapshot,
        /// Events since the previous snapshot
        events: Vec<SimEvent>,
    },

    /// Fast-forward switched on or off
    FastForward { enabled: bool },

    /// Session has ended
    SessionEnd {
        session_id: Uuid,
        reason: EndReason,
        duration_secs: f64,
        score: ScoreSnapshot,
    },
}

/// Reply to a submitted directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandReply {
    Accepted { ack: DirectiveAck },
    Rejected { code: String, message: String },
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndReason {
    Collision { first: String, second: String },
    Shutdown,
}

/// Aircraft state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftSnapshot {
    pub id: AircraftId,
    pub callsign: String,
    /// Nautical miles east of the airport
    pub x: f64,
    /// Nautical miles north of the airport
    pub y: f64,
    pub altitude: f64,
    pub heading: f64,
    pub speed: f64,
    pub vertical_rate_fpm: f64,
    pub turn_rate_dps: f64,
    pub mode: ModeKind,
    pub target_heading: f64,
    pub target_altitude: f64,
    pub target_speed: f64,
    /// Cleared or landing runway
    pub runway: Option<String>,
    /// In an active separation conflict
    pub violation: bool,
}

/// Simulation events (arrivals, landings, conflicts, etc.)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SimEvent {
    /// New arrival entered the airspace
    Spawned { callsign: String, altitude: f64 },

    /// Directive applied at the tick boundary
    DirectiveApplied { callsign: String },

    /// Captured the localizer, descending on the glideslope
    Established { callsign: String, runway: String },

    Touchdown { callsign: String, runway: String },

    /// Vacated the runway after rollout
    Landed { callsign: String, runway: String },

    /// Abandoned approach at the threshold
    GoAround {
        callsign: String,
        runway: String,
        reason: GoAroundReason,
    },

    /// Left the airspace without a landing clearance
    Exited { callsign: String },

    /// A pair lost separation
    SeparationLost { first: String, second: String },

    /// No pair is in conflict any more
    SeparationRestored,

    Collision { first: String, second: String },
}
