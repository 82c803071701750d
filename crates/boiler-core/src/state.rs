use crate::config::MachineConfig;
use serde::Serialize;

/// Debounced state of the three front-panel buttons at one poll instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ButtonSnapshot {
    pub brew: bool,
    pub pump: bool,
    pub steam: bool,
}

/// Last commanded state of each physical relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActuatorSnapshot {
    pub boiler: bool,
    pub valve: bool,
    pub pump: bool,
}

/// The shared machine record. Constructed once at startup, alive for the
/// process lifetime, updated in place by the periodic tasks.
///
/// Fields are partitioned by single-writer ownership: the temperature pair
/// belongs to the sampler, the power pair to the control tick, the button
/// snapshots to the button monitor, the actuator snapshot to whichever task
/// last commanded a relay. Any task may read any field; none of this is
/// locked because all tasks run on one cooperative scheduler.
#[derive(Debug, Clone)]
pub struct MachineState {
    pub temperature: f64,
    pub temperature_sample_time_ms: u64,

    pub brew_setpoint: f64,
    pub steam_setpoint: f64,

    pub steaming: bool,
    pub steaming_started_at_ms: u64,
    pub brewing: bool,
    pub pumping: bool,

    /// Latest controller output, as milliseconds of heater-on time per
    /// 1000 ms cycle. Always in `0..=1000`.
    pub power_ms: u16,
    pub power_sample_time_ms: u64,

    /// Master controller enable. Cleared by the auto-off guard when armed.
    pub enabled: bool,
    pub last_cmd_time_ms: u64,

    pub buttons: ButtonSnapshot,
    pub prev_buttons: ButtonSnapshot,

    pub actuators: ActuatorSnapshot,

    pub shot_timer_enabled: bool,
    pub shot_timer_duration_s: u32,

    pub auto_off_enabled: bool,
    pub auto_off_secs: u64,
}

impl MachineState {
    pub fn new(config: &MachineConfig) -> Self {
        Self {
            temperature: 0.0,
            temperature_sample_time_ms: 0,
            brew_setpoint: config.brew_setpoint,
            steam_setpoint: config.steam_setpoint,
            steaming: false,
            steaming_started_at_ms: 0,
            brewing: false,
            pumping: false,
            power_ms: 0,
            power_sample_time_ms: 0,
            enabled: config.enabled,
            last_cmd_time_ms: 0,
            buttons: ButtonSnapshot::default(),
            prev_buttons: ButtonSnapshot::default(),
            actuators: ActuatorSnapshot::default(),
            shot_timer_enabled: config.shot_timer_enabled,
            shot_timer_duration_s: config.shot_timer_duration,
            auto_off_enabled: config.auto_off_enabled,
            auto_off_secs: config.auto_off_secs,
        }
    }

    /// Age of the latest temperature sample. A machine that has never
    /// sampled reports the maximum age so staleness guards fail safe.
    pub fn temperature_age_ms(&self, now_ms: u64) -> u64 {
        if self.temperature_sample_time_ms == 0 {
            return u64::MAX;
        }
        now_ms.saturating_sub(self.temperature_sample_time_ms)
    }

    /// Age of the latest controller output, same never-sampled rule.
    pub fn power_age_ms(&self, now_ms: u64) -> u64 {
        if self.power_sample_time_ms == 0 {
            return u64::MAX;
        }
        now_ms.saturating_sub(self.power_sample_time_ms)
    }

    /// The active setpoint for the current mode.
    pub fn target(&self) -> f64 {
        if self.steaming {
            self.steam_setpoint
        } else {
            self.brew_setpoint
        }
    }

    pub fn record_temperature(&mut self, value: f64, now_ms: u64) {
        self.temperature = value;
        self.temperature_sample_time_ms = now_ms;
    }

    /// Refresh the idle-time clock. Called on every button edge and every
    /// accepted remote command.
    pub fn touch(&mut self, now_ms: u64) {
        self.last_cmd_time_ms = now_ms;
    }

    pub fn idle_time_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_cmd_time_ms)
    }
}
