use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Brew,
    Pump,
    Steam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relay {
    Boiler,
    Valve,
    Pump,
}

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor bus fault: {0}")]
    Bus(String),
    #[error("conversion not ready")]
    NotReady,
    #[error("non-finite reading: {0}")]
    NonFinite(f64),
}

/// Two-phase temperature sensor. `start_conversion` is fire-and-forget;
/// `read_celsius` is only valid once the sensor's fixed conversion latency
/// has elapsed.
pub trait TemperatureSensor {
    fn start_conversion(&mut self);
    fn read_celsius(&mut self) -> Result<f64, SensorError>;
}

/// Debounced digital inputs for the three front-panel buttons.
/// `true` means the button is held.
pub trait ButtonInputs {
    fn read(&mut self, button: Button) -> bool;
}

/// Digital outputs driving the three relays.
pub trait RelayOutputs {
    fn set(&mut self, relay: Relay, on: bool);
}
