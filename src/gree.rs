use std::{fmt, rc::Rc, time::Duration};

use log::Level;
use strum::IntoEnumIterator;

use crate::{
    climate::{
        Climate, ClimateCall, ClimateMode, ClimateState, ClimateTraits, Component, FanMode,
        PollingComponent, SwingMode,
    },
    config::{ConfigError, GreeClimateConfig},
    diagnostics::Diagnostics,
    uart::{Uart, UartHandle, UartRegistry},
};

const MIN_TEMPERATURE: f32 = 16.0;
const MAX_TEMPERATURE: f32 = 30.0;
const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);

type StateCallback = Box<dyn FnMut(&ClimateState)>;

/// Gree unit on a UART. Mode, temperature and fan are tracked in the entity state,
/// swing is sent to the unit as a single configured byte.
pub struct GreeClimate<U: Uart> {
    name: String,
    uart: Option<UartHandle<U>>,
    swing_on_command: Option<u8>,
    swing_off_command: Option<u8>,
    update_interval: Duration,
    state: ClimateState,
    state_callbacks: Vec<StateCallback>,
    diagnostics: Rc<dyn Diagnostics>,
}

impl<U: Uart> GreeClimate<U> {
    pub fn new(name: impl Into<String>, diagnostics: Rc<dyn Diagnostics>) -> Self {
        Self {
            name: name.into(),
            uart: None,
            swing_on_command: None,
            swing_off_command: None,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            state: ClimateState::default(),
            state_callbacks: Vec::new(),
            diagnostics,
        }
    }

    /// Builds a component from its configuration, resolving `uart_id` against the declared UARTs.
    /// Swing commands missing from the configuration stay unset.
    pub fn from_config(
        config: &GreeClimateConfig,
        registry: &UartRegistry<U>,
        diagnostics: Rc<dyn Diagnostics>,
    ) -> Result<Self, ConfigError> {
        let mut climate = Self::new(config.name.clone(), diagnostics);
        climate.set_uart(registry.resolve(&config.uart_id)?);
        climate.set_update_interval(config.update_interval);

        if let Some(command) = config.swing_on_command {
            climate.set_swing_on_command(command);
        }
        if let Some(command) = config.swing_off_command {
            climate.set_swing_off_command(command);
        }

        Ok(climate)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_uart(&mut self, uart: UartHandle<U>) {
        self.uart = Some(uart);
    }

    pub fn set_swing_on_command(&mut self, command: u8) {
        self.swing_on_command = Some(command);
    }

    pub fn set_swing_off_command(&mut self, command: u8) {
        self.swing_off_command = Some(command);
    }

    pub fn swing_on_command(&self) -> Option<u8> {
        self.swing_on_command
    }

    pub fn swing_off_command(&self) -> Option<u8> {
        self.swing_off_command
    }

    pub fn set_update_interval(&mut self, interval: Duration) {
        self.update_interval = interval;
    }

    pub fn add_on_state_callback(&mut self, callback: impl FnMut(&ClimateState) + 'static) {
        self.state_callbacks.push(Box::new(callback));
    }

    pub fn publish_state(&mut self) {
        for callback in self.state_callbacks.iter_mut() {
            callback(&self.state);
        }
    }

    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.diagnostics.log(level, args);
    }

    fn apply_mode_and_temperature(&mut self, call: &ClimateCall) {
        let traits = self.traits();

        if let Some(mode) = call.mode {
            if traits.supports_mode(mode) {
                self.state.mode = mode;
            } else {
                self.log(
                    Level::Warn,
                    format_args!("'{}': mode {} not supported", self.name, mode),
                );
            }
        }

        if let Some(requested) = call.target_temperature {
            let temperature = traits.round_to_step(requested);
            if traits.temperature_in_range(temperature) {
                if temperature != requested {
                    self.log(
                        Level::Debug,
                        format_args!(
                            "'{}': target temperature {} rounded to {}",
                            self.name, requested, temperature
                        ),
                    );
                }
                self.state.target_temperature = Some(temperature);
            } else {
                self.log(
                    Level::Warn,
                    format_args!(
                        "'{}': target temperature {} outside {}..{}",
                        self.name, requested, traits.min_temperature, traits.max_temperature
                    ),
                );
            }
        }
    }

    fn apply_fan_mode(&mut self, call: &ClimateCall) {
        if let Some(fan_mode) = call.fan_mode {
            if self.traits().supports_fan_mode(fan_mode) {
                self.state.fan_mode = Some(fan_mode);
            } else {
                self.log(
                    Level::Warn,
                    format_args!("'{}': fan mode {} not supported", self.name, fan_mode),
                );
            }
        }
    }

    fn send_swing(&mut self, call: &ClimateCall) -> Result<(), U::Error> {
        let (swing, uart) = match (call.swing_mode, &self.uart) {
            (Some(swing), Some(uart)) => (swing, uart.clone()),
            _ => return Ok(()),
        };

        let command = match swing {
            SwingMode::Off => self.swing_off_command,
            SwingMode::On => self.swing_on_command,
        };

        match command {
            Some(byte) => {
                self.log(
                    Level::Debug,
                    format_args!(
                        "'{}': sending swing {} command 0x{:02X}",
                        self.name,
                        swing,
                        byte
                    ),
                );
                uart.borrow_mut().write_byte(byte)?;
                self.state.swing_mode = swing;
            }
            None => self.log(
                Level::Debug,
                format_args!(
                    "'{}': no swing {} command configured",
                    self.name,
                    swing
                ),
            ),
        }

        Ok(())
    }
}

fn format_command(command: Option<u8>) -> String {
    match command {
        Some(byte) => format!("0x{:02X}", byte),
        None => "unset".into(),
    }
}

impl<U: Uart> Component for GreeClimate<U> {
    fn setup(&mut self) {
        if self.uart.is_none() {
            self.log(
                Level::Warn,
                format_args!("'{}': no UART set, swing requests will be ignored", self.name),
            );
        }
        self.publish_state();
    }

    fn dump_config(&self) {
        self.log(Level::Info, format_args!("Gree Climate '{}'", self.name));
        self.log(
            Level::Info,
            format_args!("  Swing ON command: {}", format_command(self.swing_on_command)),
        );
        self.log(
            Level::Info,
            format_args!("  Swing OFF command: {}", format_command(self.swing_off_command)),
        );
    }
}

impl<U: Uart> PollingComponent for GreeClimate<U> {
    fn update_interval(&self) -> Duration {
        self.update_interval
    }

    // Nothing is read back from the unit, the refresh republishes what was last applied
    fn update(&mut self) {
        self.publish_state();
    }
}

impl<U: Uart> Climate for GreeClimate<U> {
    type Error = U::Error;

    fn traits(&self) -> ClimateTraits {
        ClimateTraits {
            supported_modes: ClimateMode::iter().collect(),
            supported_fan_modes: FanMode::iter().collect(),
            supported_swing_modes: SwingMode::iter().collect(),
            min_temperature: MIN_TEMPERATURE,
            max_temperature: MAX_TEMPERATURE,
            temperature_step: 1.0,
        }
    }

    fn state(&self) -> &ClimateState {
        &self.state
    }

    /// Applies mode/temperature, then fan, then writes at most one swing byte.
    /// A failed write is returned as the channel's own error.
    fn control(&mut self, call: &ClimateCall) -> Result<(), Self::Error> {
        self.apply_mode_and_temperature(call);
        self.apply_fan_mode(call);
        let sent = self.send_swing(call);
        self.publish_state();
        sent
    }
}
