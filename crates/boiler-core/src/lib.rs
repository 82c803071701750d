pub mod buttons;
pub mod config;
pub mod hal;
#[cfg(feature = "simulation")]
pub mod hal_sim;
pub mod machine;
pub mod modulator;
pub mod pid;
pub mod safety;
pub mod sampler;
pub mod scheduler;
pub mod state;
pub mod telemetry;
pub mod timebase;

pub use config::{ConfigError, ConfigUpdate, MachineConfig};
pub use hal::{Button, ButtonInputs, Relay, RelayOutputs, SensorError, TemperatureSensor};
#[cfg(feature = "simulation")]
pub use hal_sim::SimulatedRig;
pub use machine::Machine;
pub use modulator::HeaterAction;
pub use pid::{PidController, PidGains};
pub use scheduler::Scheduler;
pub use state::{ActuatorSnapshot, ButtonSnapshot, MachineState};
pub use telemetry::{StatusPublisher, StatusReport};
pub use timebase::TimeBase;
