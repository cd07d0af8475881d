//! Simulation core: aircraft state, navigation, kinematics and the tick loop

pub mod aircraft;
pub mod navigation;
pub mod physics;
pub mod registry;
pub mod scoring;
pub mod separation;
pub mod session;
pub mod snapshot;
pub mod traffic;

pub use aircraft::{Aircraft, AircraftSpawn, LateralMode, ModeKind};
pub use navigation::{NavEvent, NavigationParams, NavigationSystem};
pub use physics::{KinematicsSystem, PerformanceEnvelope};
pub use registry::{AircraftId, AircraftRegistry};
pub use scoring::{ScoreSnapshot, Scoreboard};
pub use separation::{SeparationDetector, SeparationMinima};
pub use session::{SessionHandle, SessionSettings, SessionState, SimSession};
pub use traffic::{TrafficConfig, TrafficGenerator};
