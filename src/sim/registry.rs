//! Registry of active aircraft
//!
//! Owned by the session for the duration of a tick. Entities are addressed by
//! a stable [`AircraftId`]; callsigns are indexed case-insensitively.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::aircraft::{Aircraft, AircraftSpawn};

/// Stable handle for an aircraft; never reused within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AircraftId(pub u32);

impl fmt::Display for AircraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Active aircraft, iterated in id (spawn) order
#[derive(Debug, Default)]
pub struct AircraftRegistry {
    aircraft: BTreeMap<AircraftId, Aircraft>,
    by_callsign: HashMap<String, AircraftId>,
    next_id: u32,
}

impl AircraftRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(callsign: &str) -> String {
        callsign.to_ascii_uppercase()
    }

    /// Insert a newly spawned aircraft
    pub fn insert(&mut self, spawn: AircraftSpawn) -> Result<AircraftId, RegistryError> {
        let key = Self::key(&spawn.callsign);
        if key.is_empty() {
            return Err(RegistryError::EmptyCallsign);
        }
        if self.by_callsign.contains_key(&key) {
            return Err(RegistryError::DuplicateCallsign(spawn.callsign));
        }

        self.next_id += 1;
        let id = AircraftId(self.next_id);
        let mut aircraft = Aircraft::new(id, spawn);
        aircraft.callsign = key.clone();

        self.by_callsign.insert(key, id);
        self.aircraft.insert(id, aircraft);
        Ok(id)
    }

    pub fn remove(&mut self, id: AircraftId) -> Option<Aircraft> {
        let aircraft = self.aircraft.remove(&id)?;
        self.by_callsign.remove(&Self::key(&aircraft.callsign));
        Some(aircraft)
    }

    pub fn get(&self, id: AircraftId) -> Option<&Aircraft> {
        self.aircraft.get(&id)
    }

    pub fn get_mut(&mut self, id: AircraftId) -> Option<&mut Aircraft> {
        self.aircraft.get_mut(&id)
    }

    pub fn id_of(&self, callsign: &str) -> Option<AircraftId> {
        self.by_callsign.get(&Self::key(callsign)).copied()
    }

    pub fn find(&self, callsign: &str) -> Option<&Aircraft> {
        self.id_of(callsign).and_then(|id| self.aircraft.get(&id))
    }

    pub fn contains_callsign(&self, callsign: &str) -> bool {
        self.by_callsign.contains_key(&Self::key(callsign))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Aircraft> {
        self.aircraft.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Aircraft> {
        self.aircraft.values_mut()
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Callsign {0} is already in use")]
    DuplicateCallsign(String),

    #[error("Callsign must not be empty")]
    EmptyCallsign,
}
