//! Snapshot building for the presentation layer

use crate::console::protocol::{AircraftSnapshot, SimEvent, SimMsg};

use super::aircraft::{Aircraft, LateralMode};
use super::registry::AircraftRegistry;
use super::scoring::Scoreboard;

/// Builds per-frame snapshots, collecting events between them
pub struct SnapshotBuilder {
    /// Frames since last snapshot
    frames_since_snapshot: u32,
    /// Snapshot interval in frames
    snapshot_interval: u32,
    /// Events waiting for the next snapshot
    pending_events: Vec<SimEvent>,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            frames_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
            pending_events: Vec::new(),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.frames_since_snapshot += 1;
        if self.frames_since_snapshot >= self.snapshot_interval {
            self.frames_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    pub fn push_events(&mut self, events: impl IntoIterator<Item = SimEvent>) {
        self.pending_events.extend(events);
    }

    /// Build a snapshot message, draining pending events
    pub fn build(
        &mut self,
        tick: u64,
        elapsed_secs: f64,
        fast_forward: bool,
        registry: &AircraftRegistry,
        score: &Scoreboard,
    ) -> SimMsg {
        SimMsg::Snapshot {
            tick,
            elapsed_secs,
            fast_forward,
            aircraft: registry.iter().map(aircraft_snapshot).collect(),
            score: score.snapshot(),
            events: std::mem::take(&mut self.pending_events),
        }
    }
}

pub fn aircraft_snapshot(aircraft: &Aircraft) -> AircraftSnapshot {
    let runway = match &aircraft.mode {
        LateralMode::Localizer { runway }
        | LateralMode::Glideslope { runway }
        | LateralMode::Rollout { runway }
        | LateralMode::Landed { runway } => Some(runway.clone()),
        _ => None,
    };

    AircraftSnapshot {
        id: aircraft.id,
        callsign: aircraft.callsign.clone(),
        x: aircraft.position.x,
        y: aircraft.position.y,
        altitude: aircraft.altitude,
        heading: aircraft.heading,
        speed: aircraft.speed,
        vertical_rate_fpm: aircraft.vertical_rate_fpm,
        turn_rate_dps: aircraft.turn_rate_dps,
        mode: aircraft.mode_kind(),
        target_heading: aircraft.target_heading,
        target_altitude: aircraft.vertical.altitude,
        target_speed: aircraft.speed_target.speed,
        runway,
        violation: aircraft.violation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navdata::Position;
    use crate::sim::aircraft::{AircraftSpawn, ModeKind};

    #[test]
    fn interval_counts_frames() {
        let mut builder = SnapshotBuilder::new(2);
        assert!(!builder.should_send());
        assert!(builder.should_send());
        assert!(!builder.should_send());

        let mut every_frame = SnapshotBuilder::new(1);
        assert!(every_frame.should_send());
        assert!(every_frame.should_send());
    }

    #[test]
    fn build_drains_events() {
        let mut registry = AircraftRegistry::new();
        let id = registry
            .insert(AircraftSpawn {
                callsign: "BA1".to_string(),
                position: Position::new(5.0, 0.38),
                heading: 270.0,
                altitude: 1500.0,
                speed: 160.0,
            })
            .unwrap();
        registry.get_mut(id).unwrap().mode = LateralMode::Glideslope {
            runway: "27R".to_string(),
        };

        let mut builder = SnapshotBuilder::new(1);
        builder.push_events([SimEvent::Exited {
            callsign: "XX1".to_string(),
        }]);

        let msg = builder.build(10, 0.5, false, &registry, &Scoreboard::new());
        match msg {
            SimMsg::Snapshot {
                tick,
                aircraft,
                events,
                ..
            } => {
                assert_eq!(tick, 10);
                assert_eq!(events.len(), 1);
                assert_eq!(aircraft[0].mode, ModeKind::Glideslope);
                assert_eq!(aircraft[0].runway.as_deref(), Some("27R"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match builder.build(11, 0.55, false, &registry, &Scoreboard::new()) {
            SimMsg::Snapshot { events, .. } => assert!(events.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
    }
}
