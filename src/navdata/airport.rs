//! Static airport data: runways, waypoints and navaids
//!
//! Loaded once at startup and shared read-only (`Arc<Airport>`) with the
//! simulation. Nothing in the core ever mutates it.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::geometry::{CourseLine, Position};

/// Embedded default dataset
const DEFAULT_AIRPORT_JSON: &str = include_str!("../../data/egll.json");

fn default_glide_angle() -> f64 {
    3.0
}

/// ILS category published for a runway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IlsCategory {
    Cat1,
    Cat2,
    Cat3,
}

/// Runway end usable for arrivals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runway {
    pub id: String,
    pub threshold: Position,
    /// Landing direction, degrees true
    pub heading: f64,
    /// Threshold elevation; filled from the airport elevation when absent
    #[serde(default)]
    pub elevation_ft: Option<f64>,
    #[serde(default)]
    pub length_nm: f64,
    #[serde(default)]
    pub ils: Option<IlsCategory>,
    #[serde(default = "default_glide_angle")]
    pub glide_angle_deg: f64,
}

impl Runway {
    pub fn has_ils(&self) -> bool {
        self.ils.is_some()
    }

    /// Extended centreline through the threshold, in the landing direction
    pub fn localizer(&self) -> CourseLine {
        CourseLine::new(self.threshold, self.heading)
    }

    pub fn threshold_elevation(&self) -> f64 {
        self.elevation_ft.unwrap_or(0.0)
    }
}

/// Named RNAV fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavaidKind {
    Vor,
    Ndb,
}

/// Radio navaid; its ident doubles as a fix name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Navaid {
    pub ident: String,
    pub name: String,
    pub kind: NavaidKind,
    /// MHz for VORs, kHz for NDBs
    pub frequency: f64,
    pub position: Position,
}

/// Airport geometry and navigation data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airport {
    pub icao: String,
    pub name: String,
    pub elevation_ft: f64,
    pub runways: Vec<Runway>,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub navaids: Vec<Navaid>,
}

impl Airport {
    /// Parse airport data from JSON
    pub fn from_json(json: &str) -> Result<Self, NavDataError> {
        let mut airport: Airport = serde_json::from_str(json)?;
        airport.finish()?;
        Ok(airport)
    }

    /// Load airport data from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NavDataError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| NavDataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Built-in London Heathrow dataset
    pub fn embedded_default() -> Result<Self, NavDataError> {
        Self::from_json(DEFAULT_AIRPORT_JSON)
    }

    /// Airport reference point; the frame origin
    pub fn reference_point(&self) -> Position {
        Position::default()
    }

    /// Look up a runway by id (case-insensitive)
    pub fn runway(&self, id: &str) -> Option<&Runway> {
        self.runways.iter().find(|r| r.id.eq_ignore_ascii_case(id))
    }

    /// Resolve a fix name: RNAV waypoints first, then navaid idents
    pub fn find_fix(&self, name: &str) -> Option<Waypoint> {
        if let Some(wp) = self
            .waypoints
            .iter()
            .find(|w| w.name.eq_ignore_ascii_case(name))
        {
            return Some(wp.clone());
        }

        self.navaids
            .iter()
            .find(|n| n.ident.eq_ignore_ascii_case(name))
            .map(|n| Waypoint {
                name: n.ident.clone(),
                position: n.position,
            })
    }

    fn finish(&mut self) -> Result<(), NavDataError> {
        if self.runways.is_empty() {
            return Err(NavDataError::Invalid("airport has no runways".to_string()));
        }

        for runway in &mut self.runways {
            if !(0.0..=360.0).contains(&runway.heading) {
                return Err(NavDataError::Invalid(format!(
                    "runway {} heading {} out of range",
                    runway.id, runway.heading
                )));
            }
            runway.heading = super::geometry::normalize_heading(runway.heading);
            if runway.elevation_ft.is_none() {
                runway.elevation_ft = Some(self.elevation_ft);
            }
        }

        Ok(())
    }
}

/// Errors while loading static airport data
#[derive(Debug, thiserror::Error)]
pub enum NavDataError {
    #[error("Failed to read airport file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed airport data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid airport data: {0}")]
    Invalid(String),
}
