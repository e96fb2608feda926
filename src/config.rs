use std::{collections::HashSet, fs, path::Path, str::FromStr, time::Duration};

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no uart declared with id '{0}'")]
    UnknownUart(String),

    #[error("{kind} id '{id}' declared more than once")]
    DuplicateId { kind: &'static str, id: String },

    #[error("invalid update interval '{0}', expected e.g. 500ms, 60s, 5min or 1h")]
    InvalidInterval(String),

    #[error("failed to read config file: {0}")]
    IOError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),
}

const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_BAUD_RATE: u32 = 4800;

/// Configuration of one climate entity
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GreeClimateConfig {
    #[serde(default = "default_id")]
    pub id: String,

    #[serde(default = "default_name")]
    pub name: String,

    /// Id of a previously declared UART
    pub uart_id: String,

    #[serde(default)]
    pub swing_on_command: Option<u8>,

    #[serde(default)]
    pub swing_off_command: Option<u8>,

    #[serde(
        default = "default_update_interval",
        deserialize_with = "deserialize_interval"
    )]
    pub update_interval: Duration,
}

impl GreeClimateConfig {
    pub fn new(uart_id: impl Into<String>) -> Self {
        Self {
            id: default_id(),
            name: default_name(),
            uart_id: uart_id.into(),
            swing_on_command: None,
            swing_off_command: None,
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }
}

/// A serial bus declared by the host
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UartConfig {
    pub id: String,
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Everything the host binary needs: the buses, then the climates that use them
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    pub uart: Vec<UartConfig>,
    pub climate: Vec<GreeClimateConfig>,
}

impl HostConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let src = fs::read_to_string(path)?;
        Self::from_str(&src)
    }
}

impl FromStr for HostConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = serde_json::from_str(s)?;
        check_unique("uart", config.uart.iter().map(|u| u.id.as_str()))?;
        check_unique("climate", config.climate.iter().map(|c| c.id.as_str()))?;
        Ok(config)
    }
}

fn check_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ConfigError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

fn default_id() -> String {
    "gree_climate".into()
}

fn default_name() -> String {
    "Gree Climate".into()
}

fn default_update_interval() -> Duration {
    DEFAULT_UPDATE_INTERVAL
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

/// Parses intervals written as `<number><unit>` with unit one of `ms`, `s`, `min`, `h`.
pub fn parse_interval(s: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidInterval(s.to_string());

    let trimmed = s.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (value, unit) = trimmed.split_at(split);
    let value: u64 = value.parse().map_err(|_| invalid())?;

    let millis = match unit.trim() {
        "ms" => Some(value),
        "s" => value.checked_mul(1_000),
        "min" => value.checked_mul(60_000),
        "h" => value.checked_mul(3_600_000),
        _ => None,
    };
    millis.map(Duration::from_millis).ok_or_else(invalid)
}

fn deserialize_interval<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_interval(&s).map_err(serde::de::Error::custom)
}
