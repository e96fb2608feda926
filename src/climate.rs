use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClimateMode {
    Off,
    Auto,
    Cool,
    Heat,
    Dry,
    FanOnly,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FanMode {
    Auto,
    Low,
    Medium,
    High,
}

// Louver oscillation. A call that leaves it out carries `None`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SwingMode {
    Off,
    On,
}

/// A single request to change the unit's settings. Fields left as `None` are not to be changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClimateCall {
    pub mode: Option<ClimateMode>,
    pub target_temperature: Option<f32>,
    pub fan_mode: Option<FanMode>,
    pub swing_mode: Option<SwingMode>,
}

impl ClimateCall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: ClimateMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_target_temperature(mut self, temperature: f32) -> Self {
        self.target_temperature = Some(temperature);
        self
    }

    pub fn with_fan_mode(mut self, fan_mode: FanMode) -> Self {
        self.fan_mode = Some(fan_mode);
        self
    }

    pub fn with_swing_mode(mut self, swing_mode: SwingMode) -> Self {
        self.swing_mode = Some(swing_mode);
        self
    }
}

/// What the entity reports to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateState {
    pub mode: ClimateMode,
    pub target_temperature: Option<f32>,
    pub fan_mode: Option<FanMode>,
    pub swing_mode: SwingMode,
}

impl Default for ClimateState {
    fn default() -> Self {
        Self {
            mode: ClimateMode::Off,
            target_temperature: None,
            fan_mode: None,
            swing_mode: SwingMode::Off,
        }
    }
}

/// Capabilities advertised for the entity
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateTraits {
    pub supported_modes: Vec<ClimateMode>,
    pub supported_fan_modes: Vec<FanMode>,
    pub supported_swing_modes: Vec<SwingMode>,
    pub min_temperature: f32,
    pub max_temperature: f32,
    pub temperature_step: f32,
}

impl ClimateTraits {
    pub fn supports_mode(&self, mode: ClimateMode) -> bool {
        self.supported_modes.contains(&mode)
    }

    pub fn supports_fan_mode(&self, fan_mode: FanMode) -> bool {
        self.supported_fan_modes.contains(&fan_mode)
    }

    pub fn temperature_in_range(&self, temperature: f32) -> bool {
        (self.min_temperature..=self.max_temperature).contains(&temperature)
    }

    /// Snaps a temperature to the nearest step counted from `min_temperature`.
    pub fn round_to_step(&self, temperature: f32) -> f32 {
        if self.temperature_step <= 0.0 {
            return temperature;
        }
        let steps = ((temperature - self.min_temperature) / self.temperature_step).round();
        self.min_temperature + steps * self.temperature_step
    }
}

/// Lifecycle hooks called by the host's main loop
pub trait Component {
    /// Called once, after configuration and before the first `update` or `control`.
    fn setup(&mut self) {}

    fn dump_config(&self);
}

/// Periodic refresh. The host's scheduler decides when `update` runs.
pub trait PollingComponent {
    fn update_interval(&self) -> Duration;

    fn update(&mut self);
}

/// Climate control entry point
pub trait Climate {
    type Error;

    fn traits(&self) -> ClimateTraits;

    fn state(&self) -> &ClimateState;

    fn control(&mut self, call: &ClimateCall) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_call_from_json() {
        let call: ClimateCall =
            serde_json::from_str(r#"{"mode": "fan_only", "swing_mode": "on"}"#).unwrap();
        assert_eq!(
            call,
            ClimateCall::new()
                .with_mode(ClimateMode::FanOnly)
                .with_swing_mode(SwingMode::On)
        );

        let empty: ClimateCall = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.swing_mode, None);

        assert!(serde_json::from_str::<ClimateCall>(r#"{"swing": "on"}"#).is_err());
    }

    #[test]
    fn test_names() {
        assert_eq!(ClimateMode::FanOnly.to_string(), "fan_only");
        assert_eq!(FanMode::from_str("medium").unwrap(), FanMode::Medium);
        assert_eq!(SwingMode::On.to_string(), "on");
    }

    #[test]
    fn test_round_to_step() {
        let mut traits = ClimateTraits {
            supported_modes: vec![ClimateMode::Cool],
            supported_fan_modes: vec![],
            supported_swing_modes: vec![],
            min_temperature: 16.0,
            max_temperature: 30.0,
            temperature_step: 1.0,
        };
        assert_eq!(traits.round_to_step(22.37), 22.0);
        assert_eq!(traits.round_to_step(22.5), 23.0);
        assert_eq!(traits.round_to_step(30.2), 30.0);

        traits.temperature_step = 0.5;
        assert_eq!(traits.round_to_step(22.3), 22.5);
        assert_eq!(traits.round_to_step(22.2), 22.0);
    }
}
