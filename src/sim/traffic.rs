//! Seeded arrival generator

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::navdata::geometry::normalize_heading;
use crate::navdata::Position;

use super::aircraft::AircraftSpawn;
use super::registry::AircraftRegistry;

const AIRLINES: [&str; 10] = [
    "BAW", "DLH", "AFR", "KLM", "EZY", "RYR", "UAE", "AAL", "SAS", "IBE",
];

/// Random callsign attempts before falling back to a serial one
const CALLSIGN_ATTEMPTS: usize = 32;

#[derive(Debug, Clone)]
pub struct TrafficConfig {
    /// Arrivals per simulated minute; zero disables spawning
    pub rate_per_min: f64,
    pub boundary_nm: f64,
    /// Spawns appear this far inside the boundary
    pub entry_margin_nm: f64,
    pub min_altitude_ft: u32,
    pub max_altitude_ft: u32,
    pub altitude_step_ft: u32,
    pub speed_kt: f64,
    /// Maximum deviation of the entry heading from a direct track to the airport
    pub heading_spread_deg: f64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            rate_per_min: 2.0,
            boundary_nm: 40.0,
            entry_margin_nm: 1.0,
            min_altitude_ft: 6000,
            max_altitude_ft: 12000,
            altitude_step_ft: 1000,
            speed_kt: 250.0,
            heading_spread_deg: 15.0,
        }
    }
}

/// Produces arrivals on simulated time, reproducible for a given seed
pub struct TrafficGenerator {
    rng: ChaCha8Rng,
    config: TrafficConfig,
    /// Seconds until the next arrival
    next_spawn_in: f64,
    last_altitude: Option<u32>,
    serial: u32,
}

impl TrafficGenerator {
    pub fn new(seed: u64, config: TrafficConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
            next_spawn_in: 0.0,
            last_altitude: None,
            serial: 0,
        }
    }

    /// Advance the spawn timer by `dt`; returns an arrival when one is due
    pub fn tick(&mut self, dt: f64, registry: &AircraftRegistry) -> Option<AircraftSpawn> {
        if self.config.rate_per_min <= 0.0 {
            return None;
        }

        let due = self.next_spawn_in <= 1e-9;
        self.next_spawn_in -= dt;
        if !due {
            return None;
        }
        self.next_spawn_in += 60.0 / self.config.rate_per_min;
        Some(self.generate(registry))
    }

    /// Create one arrival at a random point of the boundary
    pub fn generate(&mut self, registry: &AircraftRegistry) -> AircraftSpawn {
        let bearing_from_airport = self.rng.gen_range(0.0..360.0);
        let radius = (self.config.boundary_nm - self.config.entry_margin_nm).max(0.0);
        let position = Position::default().project(bearing_from_airport, radius);

        let spread = self.config.heading_spread_deg;
        let jitter = if spread > 0.0 {
            self.rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
        let heading = normalize_heading(bearing_from_airport + 180.0 + jitter);

        let altitude = self.pick_altitude();
        let callsign = self.pick_callsign(registry);

        debug!(
            callsign = %callsign,
            x = position.x,
            y = position.y,
            heading,
            altitude,
            "Arrival generated"
        );

        AircraftSpawn {
            callsign,
            position,
            heading,
            altitude: f64::from(altitude),
            speed: self.config.speed_kt,
        }
    }

    /// A level on the step grid that differs from the previous arrival's
    fn pick_altitude(&mut self) -> u32 {
        let step = self.config.altitude_step_ft.max(1);
        let lowest = self.config.min_altitude_ft / step;
        let highest = (self.config.max_altitude_ft / step).max(lowest);

        let altitude = loop {
            let candidate = self.rng.gen_range(lowest..=highest) * step;
            if lowest == highest || Some(candidate) != self.last_altitude {
                break candidate;
            }
        };
        self.last_altitude = Some(altitude);
        altitude
    }

    fn pick_callsign(&mut self, registry: &AircraftRegistry) -> String {
        for _ in 0..CALLSIGN_ATTEMPTS {
            let airline = AIRLINES[self.rng.gen_range(0..AIRLINES.len())];
            let number: u32 = self.rng.gen_range(1..1000);
            let callsign = format!("{}{}", airline, number);
            if !registry.contains_callsign(&callsign) {
                return callsign;
            }
        }

        loop {
            self.serial += 1;
            let callsign = format!("ZZZ{}", self.serial);
            if !registry.contains_callsign(&callsign) {
                return callsign;
            }
        }
    }
}
