pub mod climate;
pub mod config;
pub mod diagnostics;
pub mod gree;
pub mod hass;
pub mod uart;

pub use climate::{
    Climate, ClimateCall, ClimateMode, ClimateState, ClimateTraits, Component, FanMode,
    PollingComponent, SwingMode,
};
pub use config::{ConfigError, GreeClimateConfig, HostConfig, UartConfig};
pub use diagnostics::{Diagnostics, LogDiagnostics};
pub use gree::GreeClimate;
pub use uart::{IoUart, Uart, UartHandle, UartRegistry};
