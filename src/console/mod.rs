//! Controller console and output message types

pub mod handler;
pub mod protocol;

pub use handler::{run_console, ConsoleError};
pub use protocol::{AircraftSnapshot, CommandReply, ConsoleInput, EndReason, SimEvent, SimMsg};
