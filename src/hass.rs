use serde_json::json;

use crate::{
    climate::{Climate, ClimateTraits},
    gree::GreeClimate,
    uart::Uart,
};

// ClimateEntityFeature flags
pub const SUPPORT_TARGET_TEMPERATURE: u32 = 1;
pub const SUPPORT_FAN_MODE: u32 = 8;
pub const SUPPORT_SWING_MODE: u32 = 32;

/// Discovery payload shared by every climate entity
pub fn core_hass_config(name: &str, traits: &ClimateTraits) -> serde_json::Value {
    let mut supported_features = SUPPORT_TARGET_TEMPERATURE;
    if !traits.supported_fan_modes.is_empty() {
        supported_features |= SUPPORT_FAN_MODE;
    }

    json!({
        "name": name,
        "modes": traits.supported_modes.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
        "fan_modes": traits.supported_fan_modes.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
        "min_temp": traits.min_temperature,
        "max_temp": traits.max_temperature,
        "temp_step": traits.temperature_step,
        "supported_features": supported_features,
    })
}

impl<U: Uart> GreeClimate<U> {
    /// Home Assistant discovery payload, with swing always advertised
    pub fn hass_config(&self) -> serde_json::Value {
        let traits = self.traits();
        let mut hass = core_hass_config(self.name(), &traits);

        let features = hass["supported_features"].as_u64().unwrap_or_default();
        hass["supported_features"] = (features | SUPPORT_SWING_MODE as u64).into();
        hass["swing_modes"] = traits
            .supported_swing_modes
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .into();
        hass
    }
}
