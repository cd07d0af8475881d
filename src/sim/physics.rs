//! Aircraft kinematics and the performance envelope

use crate::navdata::geometry::{normalize_heading, shortest_turn, turn_remaining};
use crate::navdata::TurnDirection;

use super::aircraft::Aircraft;

/// Remaining turn this close to a full circle means the target is already reached
const HEADING_EPSILON: f64 = 1e-6;

/// Performance constants shared by every aircraft
#[derive(Debug, Clone, Copy)]
pub struct PerformanceEnvelope {
    /// Degrees per second
    pub turn_rate: f64,
    /// Feet per second
    pub climb_rate: f64,
    /// Feet per second
    pub descent_rate: f64,
    /// Knots per second, both directions
    pub acceleration: f64,
    /// Rate multiplier for expedited altitude/speed changes
    pub expedite_factor: f64,
    /// Assignable speed range (knots)
    pub min_speed: f64,
    pub max_speed: f64,
    /// Assignable altitude range (feet)
    pub min_altitude: f64,
    pub max_altitude: f64,
    /// Knots per second on the runway
    pub rollout_deceleration: f64,
    /// Speed at which a landing aircraft leaves the runway
    pub vacate_speed: f64,
}

impl PerformanceEnvelope {
    pub const fn standard() -> Self {
        Self {
            turn_rate: 3.0,
            climb_rate: 25.0,
            descent_rate: 25.0,
            acceleration: 2.0,
            expedite_factor: 2.0,
            min_speed: 120.0,
            max_speed: 340.0,
            min_altitude: 1000.0,
            max_altitude: 20000.0,
            rollout_deceleration: 5.0,
            vacate_speed: 30.0,
        }
    }

    pub fn speed_in_range(&self, knots: f64) -> bool {
        (self.min_speed..=self.max_speed).contains(&knots)
    }

    pub fn altitude_in_range(&self, feet: f64) -> bool {
        (self.min_altitude..=self.max_altitude).contains(&feet)
    }

    fn rate(&self, base: f64, expedite: bool) -> f64 {
        if expedite {
            base * self.expedite_factor
        } else {
            base
        }
    }
}

impl Default for PerformanceEnvelope {
    fn default() -> Self {
        Self::standard()
    }
}

/// Integrator advancing aircraft state toward its targets
pub struct KinematicsSystem;

impl KinematicsSystem {
    /// Advance one aircraft by `dt` seconds
    pub fn step(aircraft: &mut Aircraft, envelope: &PerformanceEnvelope, dt: f64) {
        let on_ground = aircraft.on_ground();

        // Heading
        let previous_heading = aircraft.heading;
        let (heading, turn_override) = Self::turn_toward(
            aircraft.heading,
            aircraft.target_heading,
            aircraft.turn_override,
            envelope.turn_rate * dt,
        );
        aircraft.heading = heading;
        aircraft.turn_override = turn_override;
        aircraft.turn_rate_dps =
            crate::navdata::geometry::heading_difference(previous_heading, heading) / dt;

        // Altitude
        let previous_altitude = aircraft.altitude;
        if !on_ground {
            let target = aircraft.vertical.altitude;
            let rate = if target >= aircraft.altitude {
                envelope.rate(envelope.climb_rate, aircraft.vertical.expedite)
            } else {
                envelope.rate(envelope.descent_rate, aircraft.vertical.expedite)
            };
            aircraft.altitude = Self::step_toward(aircraft.altitude, target, rate * dt);
            if aircraft.altitude == target {
                aircraft.vertical.expedite = false;
            }
        }
        aircraft.vertical_rate_fpm = (aircraft.altitude - previous_altitude) / dt * 60.0;

        // Speed
        let speed_rate = if on_ground {
            envelope.rollout_deceleration
        } else {
            envelope.rate(envelope.acceleration, aircraft.speed_target.expedite)
        };
        aircraft.speed = Self::step_toward(
            aircraft.speed,
            aircraft.speed_target.speed,
            speed_rate * dt,
        )
        .max(0.0);
        if aircraft.speed == aircraft.speed_target.speed {
            aircraft.speed_target.expedite = false;
        }

        // Position, along the updated heading
        let distance_nm = aircraft.speed / 3600.0 * dt;
        aircraft.position = aircraft.position.project(aircraft.heading, distance_nm);
    }

    /// Turn from `heading` toward `target` by at most `max_turn` degrees.
    ///
    /// A forced direction is kept until the target is reached; without one the
    /// shorter arc is used. Stops exactly on the target. Returns the new
    /// heading and the remaining turn override.
    pub fn turn_toward(
        heading: f64,
        target: f64,
        turn_override: Option<TurnDirection>,
        max_turn: f64,
    ) -> (f64, Option<TurnDirection>) {
        let direction = turn_override.unwrap_or_else(|| shortest_turn(heading, target));
        let remaining = turn_remaining(heading, target, direction);

        if remaining <= max_turn || remaining >= 360.0 - HEADING_EPSILON {
            (normalize_heading(target), None)
        } else {
            (
                normalize_heading(heading + direction.sign() * max_turn),
                turn_override,
            )
        }
    }

    /// Move `value` toward `target` by at most `max_step`, never overshooting
    pub fn step_toward(value: f64, target: f64, max_step: f64) -> f64 {
        let diff = target - value;
        if diff.abs() <= max_step {
            target
        } else {
            value + max_step.copysign(diff)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navdata::Position;
    use crate::sim::aircraft::AircraftSpawn;
    use crate::sim::registry::AircraftId;

    const DT: f64 = 0.05;

    fn aircraft(heading: f64, altitude: f64, speed: f64) -> Aircraft {
        Aircraft::new(
            AircraftId(1),
            AircraftSpawn {
                callsign: "TEST1".to_string(),
                position: Position::new(0.0, 0.0),
                heading,
                altitude,
                speed,
            },
        )
    }

    #[test]
    fn turn_stops_exactly_on_target() {
        let env = PerformanceEnvelope::standard();
        let mut ac = aircraft(90.0, 5000.0, 250.0);
        ac.target_heading = 100.0;

        let mut ticks = 0;
        while ac.heading != 100.0 {
            let before = ac.heading;
            KinematicsSystem::step(&mut ac, &env, DT);
            assert!(ac.heading > before && ac.heading <= 100.0);
            ticks += 1;
            assert!(ticks < 1000);
        }
        // 10 degrees at 3 deg/s = 3.33 s
        assert_eq!(ticks, 67);

        KinematicsSystem::step(&mut ac, &env, DT);
        assert_eq!(ac.heading, 100.0);
        assert_eq!(ac.turn_rate_dps, 0.0);
    }

    #[test]
    fn forced_turn_takes_the_long_way() {
        let env = PerformanceEnvelope::standard();
        let mut ac = aircraft(90.0, 5000.0, 250.0);
        ac.target_heading = 100.0;
        ac.turn_override = Some(TurnDirection::Left);

        KinematicsSystem::step(&mut ac, &env, DT);
        assert!((ac.heading - 89.85).abs() < 1e-9);
        assert!(ac.turn_rate_dps < 0.0);
        assert_eq!(ac.turn_override, Some(TurnDirection::Left));

        // 350 degrees left at 3 deg/s
        for _ in 0..((350.0 / 3.0 / DT) as usize + 2) {
            KinematicsSystem::step(&mut ac, &env, DT);
        }
        assert_eq!(ac.heading, 100.0);
        assert_eq!(ac.turn_override, None);
    }

    #[test]
    fn turn_toward_wraps_through_north() {
        let (h, o) = KinematicsSystem::turn_toward(359.9, 10.0, None, 0.15);
        assert!((h - 0.05).abs() < 1e-9);
        assert_eq!(o, None);
    }

    #[test]
    fn expedited_climb_is_faster() {
        let env = PerformanceEnvelope::standard();

        let mut normal = aircraft(0.0, 3000.0, 250.0);
        normal.vertical.altitude = 8000.0;
        KinematicsSystem::step(&mut normal, &env, DT);

        let mut expedited = aircraft(0.0, 3000.0, 250.0);
        expedited.vertical.altitude = 8000.0;
        expedited.vertical.expedite = true;
        KinematicsSystem::step(&mut expedited, &env, DT);

        assert!((normal.vertical_rate_fpm - 1500.0).abs() < 1e-6);
        assert!(expedited.vertical_rate_fpm > normal.vertical_rate_fpm);
        assert!((expedited.vertical_rate_fpm - 3000.0).abs() < 1e-6);
    }

    #[test]
    fn altitude_reaches_target_and_clears_expedite() {
        let env = PerformanceEnvelope::standard();
        let mut ac = aircraft(0.0, 5000.0, 250.0);
        ac.vertical.altitude = 4999.0;
        ac.vertical.expedite = true;
        KinematicsSystem::step(&mut ac, &env, DT);
        assert_eq!(ac.altitude, 4999.0);
        assert!(!ac.vertical.expedite);
    }

    #[test]
    fn speed_changes_at_bounded_rate() {
        let env = PerformanceEnvelope::standard();
        let mut ac = aircraft(0.0, 5000.0, 250.0);
        ac.speed_target.speed = 200.0;
        for _ in 0..20 {
            KinematicsSystem::step(&mut ac, &env, DT);
        }
        // one second at 2 kt/s
        assert!((ac.speed - 248.0).abs() < 1e-9);

        ac.speed_target.expedite = true;
        for _ in 0..20 {
            KinematicsSystem::step(&mut ac, &env, DT);
        }
        assert!((ac.speed - 244.0).abs() < 1e-9);
    }

    #[test]
    fn position_advances_along_heading() {
        let env = PerformanceEnvelope::standard();
        let mut ac = aircraft(90.0, 5000.0, 360.0);
        // 360 kt = 0.1 nm/s
        for _ in 0..200 {
            KinematicsSystem::step(&mut ac, &env, DT);
        }
        assert!((ac.position.x - 1.0).abs() < 1e-9);
        assert!(ac.position.y.abs() < 1e-9);
    }

    #[test]
    fn step_toward_never_overshoots() {
        assert_eq!(KinematicsSystem::step_toward(0.0, 1.0, 5.0), 1.0);
        assert_eq!(KinematicsSystem::step_toward(10.0, 0.0, 2.5), 7.5);
        assert_eq!(KinematicsSystem::step_toward(3.0, 3.0, 1.0), 3.0);
    }
}
