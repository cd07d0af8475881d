//! Approach control simulation
//!
//! A single-airport approach-control simulator: arrivals appear at the edge
//! of the airspace, a controller types directives (heading, altitude, speed,
//! direct-to, hold, ILS clearance, abort) and each aircraft is flown by a
//! per-aircraft navigation state machine on a fixed-step tick loop.

pub mod app;
pub mod command;
pub mod config;
pub mod console;
pub mod navdata;
pub mod sim;
pub mod util;
