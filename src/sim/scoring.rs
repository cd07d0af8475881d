//! Session score counters

use serde::{Deserialize, Serialize};

use super::navigation::NavEvent;
use super::separation::SeparationReport;

/// Running totals for a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scoreboard {
    pub landings: u32,
    /// Seconds during which at least one pair was in conflict
    pub violation_secs: f64,
    pub improper_exits: u32,
    /// Automatic go-arounds at the threshold
    pub missed_approaches: u32,
    pub collision: bool,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_nav_event(&mut self, event: &NavEvent) {
        match event {
            NavEvent::Landed { .. } => self.landings += 1,
            NavEvent::Exited => self.improper_exits += 1,
            NavEvent::GoAround { .. } => self.missed_approaches += 1,
            NavEvent::Established { .. } | NavEvent::Touchdown { .. } => {}
        }
    }

    /// Violation time accrues once per tick with any conflict, not per pair
    pub fn record_separation(&mut self, report: &SeparationReport, dt: f64) {
        if report.any_violation() {
            self.violation_secs += dt;
        }
        if report.collision.is_some() {
            self.collision = true;
        }
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            landings: self.landings,
            violation_secs: self.violation_secs,
            improper_exits: self.improper_exits,
            missed_approaches: self.missed_approaches,
            collision: self.collision,
        }
    }
}

/// Serializable view of the score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub landings: u32,
    pub violation_secs: f64,
    pub improper_exits: u32,
    pub missed_approaches: u32,
    pub collision: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::navigation::GoAroundReason;
    use crate::sim::registry::AircraftId;
    use crate::sim::separation::Conflict;

    fn conflict(a: u32, b: u32) -> Conflict {
        Conflict {
            first: AircraftId(a),
            second: AircraftId(b),
            horizontal_nm: 1.0,
            vertical_ft: 0.0,
        }
    }

    #[test]
    fn nav_events_update_counters() {
        let mut score = Scoreboard::new();
        score.record_nav_event(&NavEvent::Landed {
            runway: "27R".into(),
        });
        score.record_nav_event(&NavEvent::Exited);
        score.record_nav_event(&NavEvent::GoAround {
            runway: "27R".into(),
            reason: GoAroundReason::TooHigh,
        });
        score.record_nav_event(&NavEvent::Touchdown {
            runway: "27R".into(),
        });
        assert_eq!(score.landings, 1);
        assert_eq!(score.improper_exits, 1);
        assert_eq!(score.missed_approaches, 1);
    }

    #[test]
    fn violation_time_counts_ticks_not_pairs() {
        let mut score = Scoreboard::new();
        let report = SeparationReport {
            conflicts: vec![conflict(1, 2), conflict(1, 3), conflict(2, 3)],
            collision: None,
        };
        for _ in 0..20 {
            score.record_separation(&report, 0.05);
        }
        score.record_separation(&SeparationReport::default(), 0.05);
        assert!((score.violation_secs - 1.0).abs() < 1e-9);
        assert!(!score.collision);
    }

    #[test]
    fn snapshot_serializes_field_names() {
        let mut score = Scoreboard::new();
        score.landings = 2;
        let json = serde_json::to_string(&score.snapshot()).unwrap();
        assert!(json.contains("\"landings\":2"));
        assert!(json.contains("\"improper_exits\":0"));
    }
}
