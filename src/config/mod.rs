//! Configuration module - environment variable parsing

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::util::time::DEFAULT_FAST_FORWARD_TICKS;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Airport data file; the embedded dataset is used when unset
    pub airport_file: Option<PathBuf>,

    /// Traffic generator seed; random when unset
    pub seed: Option<u64>,
    /// Arrivals per simulated minute (0 disables traffic)
    pub spawn_rate_per_min: f64,

    /// Ticks per frame while fast-forward is on
    pub fast_forward_ticks: u32,
    /// Radius of the simulated airspace (nm)
    pub boundary_nm: f64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let spawn_rate_per_min: f64 = parse_or(&lookup, "SPAWN_RATE_PER_MIN", 2.0)?;
        if !spawn_rate_per_min.is_finite() || spawn_rate_per_min < 0.0 {
            return Err(ConfigError::Invalid("SPAWN_RATE_PER_MIN"));
        }

        let fast_forward_ticks: u32 =
            parse_or(&lookup, "FAST_FORWARD_TICKS", DEFAULT_FAST_FORWARD_TICKS)?;
        if fast_forward_ticks == 0 {
            return Err(ConfigError::Invalid("FAST_FORWARD_TICKS"));
        }

        let boundary_nm: f64 = parse_or(&lookup, "BOUNDARY_NM", 40.0)?;
        if !boundary_nm.is_finite() || boundary_nm <= 0.0 {
            return Err(ConfigError::Invalid("BOUNDARY_NM"));
        }

        Ok(Self {
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            airport_file: lookup("AIRPORT_FILE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            seed: parse_opt(&lookup, "SIM_SEED")?,
            spawn_rate_per_min,
            fast_forward_ticks,
            boundary_nm,
        })
    }
}

fn parse_opt<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key)),
        _ => Ok(None),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
