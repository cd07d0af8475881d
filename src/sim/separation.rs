//! Pairwise separation and collision detection

use serde::{Deserialize, Serialize};

use super::aircraft::Aircraft;
use super::registry::{AircraftId, AircraftRegistry};

/// Separation and collision thresholds
#[derive(Debug, Clone, Copy)]
pub struct SeparationMinima {
    pub horizontal_nm: f64,
    pub vertical_ft: f64,
    pub collision_horizontal_nm: f64,
    pub collision_vertical_ft: f64,
}

impl SeparationMinima {
    pub const fn standard() -> Self {
        Self {
            horizontal_nm: 3.0,
            vertical_ft: 1000.0,
            collision_horizontal_nm: 0.1,
            collision_vertical_ft: 100.0,
        }
    }
}

impl Default for SeparationMinima {
    fn default() -> Self {
        Self::standard()
    }
}

/// A pair of aircraft inside the separation minima
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub first: AircraftId,
    pub second: AircraftId,
    pub horizontal_nm: f64,
    pub vertical_ft: f64,
}

/// Result of one detection pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeparationReport {
    pub conflicts: Vec<Conflict>,
    pub collision: Option<(AircraftId, AircraftId)>,
}

impl SeparationReport {
    pub fn any_violation(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn involves(&self, id: AircraftId) -> bool {
        self.conflicts
            .iter()
            .any(|c| c.first == id || c.second == id)
    }
}

pub struct SeparationDetector;

impl SeparationDetector {
    /// Both established or rolling out on the same runway
    fn in_same_landing_stream(a: &Aircraft, b: &Aircraft) -> bool {
        match (a.landing_runway(), b.landing_runway()) {
            (Some(ra), Some(rb)) => ra == rb,
            _ => false,
        }
    }

    /// Check every unordered pair once
    pub fn detect(registry: &AircraftRegistry, minima: &SeparationMinima) -> SeparationReport {
        let active: Vec<&Aircraft> = registry.iter().filter(|a| !a.is_terminal()).collect();
        let mut report = SeparationReport::default();

        for (i, a) in active.iter().enumerate() {
            for b in &active[i + 1..] {
                let horizontal_nm = a.position.distance_to(b.position);
                let vertical_ft = (a.altitude - b.altitude).abs();

                if report.collision.is_none()
                    && horizontal_nm < minima.collision_horizontal_nm
                    && vertical_ft < minima.collision_vertical_ft
                {
                    report.collision = Some((a.id, b.id));
                }

                if horizontal_nm < minima.horizontal_nm
                    && vertical_ft < minima.vertical_ft
                    && !Self::in_same_landing_stream(a, b)
                {
                    report.conflicts.push(Conflict {
                        first: a.id,
                        second: b.id,
                        horizontal_nm,
                        vertical_ft,
                    });
                }
            }
        }

        report
    }

    /// Set or clear each aircraft's violation flag from a report
    pub fn flag(registry: &mut AircraftRegistry, report: &SeparationReport) {
        for aircraft in registry.iter_mut() {
            aircraft.violation = report.involves(aircraft.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navdata::Position;
    use crate::sim::aircraft::{AircraftSpawn, LateralMode};

    fn spawn(callsign: &str, x: f64, altitude: f64) -> AircraftSpawn {
        AircraftSpawn {
            callsign: callsign.to_string(),
            position: Position::new(x, 10.0),
            heading: 90.0,
            altitude,
            speed: 250.0,
        }
    }

    fn pair(distance: f64, vertical: f64) -> AircraftRegistry {
        let mut registry = AircraftRegistry::new();
        registry.insert(spawn("A1", 0.0, 5000.0)).unwrap();
        registry
            .insert(spawn("B2", distance, 5000.0 + vertical))
            .unwrap();
        registry
    }

    fn detect(registry: &AircraftRegistry) -> SeparationReport {
        SeparationDetector::detect(registry, &SeparationMinima::standard())
    }

    #[test]
    fn violation_needs_both_minima_broken() {
        assert!(detect(&pair(2.9, 900.0)).any_violation());
        assert!(!detect(&pair(3.1, 900.0)).any_violation());
        assert!(!detect(&pair(2.9, 1100.0)).any_violation());
    }

    #[test]
    fn minima_are_strict() {
        assert!(!detect(&pair(3.0, 0.0)).any_violation());
        assert!(!detect(&pair(1.0, 1000.0)).any_violation());
    }

    #[test]
    fn same_runway_final_is_exempt() {
        let mut registry = pair(2.0, 500.0);
        for aircraft in registry.iter_mut() {
            aircraft.mode = LateralMode::Glideslope {
                runway: "27R".to_string(),
            };
        }
        assert!(!detect(&registry).any_violation());

        // different runways are not
        let id = registry.id_of("B2").unwrap();
        registry.get_mut(id).unwrap().mode = LateralMode::Glideslope {
            runway: "27L".to_string(),
        };
        assert!(detect(&registry).any_violation());

        // localizer only is not
        registry.get_mut(id).unwrap().mode = LateralMode::Localizer {
            runway: "27R".to_string(),
        };
        assert!(detect(&registry).any_violation());
    }

    #[test]
    fn collision_is_reported_even_on_final() {
        let mut registry = pair(0.05, 50.0);
        for aircraft in registry.iter_mut() {
            aircraft.mode = LateralMode::Glideslope {
                runway: "27R".to_string(),
            };
        }
        let report = detect(&registry);
        assert!(report.collision.is_some());
        assert!(!report.any_violation());
    }

    #[test]
    fn flags_follow_the_report() {
        let mut registry = pair(2.0, 0.0);
        registry.insert(spawn("C3", 20.0, 5000.0)).unwrap();

        let report = detect(&registry);
        SeparationDetector::flag(&mut registry, &report);
        assert!(registry.find("A1").unwrap().violation);
        assert!(registry.find("B2").unwrap().violation);
        assert!(!registry.find("C3").unwrap().violation);

        let id = registry.id_of("B2").unwrap();
        registry.get_mut(id).unwrap().altitude = 9000.0;
        let report = detect(&registry);
        SeparationDetector::flag(&mut registry, &report);
        assert!(registry.iter().all(|a| !a.violation));
    }
}
