//! Application state shared by the console and the shutdown path

use std::sync::Arc;

use uuid::Uuid;

use crate::config::Config;
use crate::navdata::Airport;
use crate::sim::navigation::NavigationParams;
use crate::sim::session::{SessionHandle, SessionSettings, SimSession};
use crate::sim::traffic::TrafficConfig;
use crate::util::time::unix_millis;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub airport: Arc<Airport>,
    pub session: SessionHandle,
    /// Traffic seed actually in use
    pub seed: u64,
}

impl AppState {
    /// Build the state and the session it controls; the caller spawns the session
    pub fn new(config: Config, airport: Airport) -> (Self, SimSession) {
        let config = Arc::new(config);
        let airport = Arc::new(airport);

        let seed = config.seed.unwrap_or_else(unix_millis);
        let settings = session_settings(&config, seed);

        let (session, handle) = SimSession::new(Uuid::new_v4(), airport.clone(), settings);

        let state = Self {
            config,
            airport,
            session: handle,
            seed,
        };
        (state, session)
    }
}

/// Session tunables derived from configuration
pub fn session_settings(config: &Config, seed: u64) -> SessionSettings {
    SessionSettings {
        seed,
        fast_forward_ticks: config.fast_forward_ticks,
        traffic: TrafficConfig {
            rate_per_min: config.spawn_rate_per_min,
            boundary_nm: config.boundary_nm,
            ..TrafficConfig::default()
        },
        navigation: NavigationParams::standard().with_boundary(config.boundary_nm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_seed_and_boundary_reach_the_session() {
        let config = Config::from_lookup(|key| match key {
            "SIM_SEED" => Some("99".to_string()),
            "BOUNDARY_NM" => Some("25".to_string()),
            _ => None,
        })
        .unwrap();

        let settings = session_settings(&config, 99);
        assert_eq!(settings.seed, 99);
        assert_eq!(settings.traffic.boundary_nm, 25.0);
        assert_eq!(settings.navigation.boundary_nm, 25.0);
        assert_eq!(settings.fast_forward_ticks, 10);
    }

    #[tokio::test]
    async fn state_owns_a_fresh_session() {
        let config = Config::from_lookup(|key| match key {
            "SIM_SEED" => Some("7".to_string()),
            _ => None,
        })
        .unwrap();
        let airport = Airport::embedded_default().unwrap();
        let (state, session) = AppState::new(config, airport);

        assert_eq!(state.seed, 7);
        assert_eq!(state.config.seed, Some(7));
        assert_eq!(state.airport.icao, session.state().airport().icao);
        assert_eq!(session.state().id, state.session.id);
        assert!(session.state().registry.is_empty());
    }
}
