use crate::hal::Relay;
use crate::machine::Machine;
use crate::state::MachineState;

/// The fixed actuation window over which `power_ms` is applied.
pub const CYCLE_MS: u64 = 1000;

/// A controller output older than this forces the heater off: the control
/// tick has stopped re-arming the modulator.
pub const POWER_STALE_MS: u64 = 10_000;

/// What the heater does for one actuation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaterAction {
    /// On for the whole cycle.
    On,
    /// Off for the whole cycle.
    Off,
    /// On immediately, off again after `off_after_ms`.
    Pulse { off_after_ms: u64 },
}

/// Decide the heater action for the cycle starting at `now_ms`.
///
/// In steam mode the modulator degrades to a plain thermostat against the
/// steam setpoint and `power_ms` is ignored. Otherwise `power_ms` drives
/// the cycle, except that a stale controller output or a temperature
/// already above target forces a full-off cycle.
///
/// The pulse length is `CYCLE_MS - power_ms`, reproduced faithfully from
/// the reference firmware.
pub fn plan_cycle(state: &MachineState, now_ms: u64) -> HeaterAction {
    if state.steaming {
        return if state.temperature < state.steam_setpoint {
            HeaterAction::On
        } else {
            HeaterAction::Off
        };
    }

    let mut millis = u64::from(state.power_ms);
    if state.power_age_ms(now_ms) > POWER_STALE_MS {
        millis = 0;
    }
    if state.temperature > state.target() {
        millis = 0;
    }

    match millis {
        0 => HeaterAction::Off,
        m if m >= CYCLE_MS => HeaterAction::On,
        m => HeaterAction::Pulse {
            off_after_ms: CYCLE_MS - m,
        },
    }
}

/// Apply the cycle plan to the boiler relay. Returns the delay after which
/// the caller must schedule [`heater_off`], if the plan was a pulse.
pub fn apply_cycle(machine: &mut Machine, now_ms: u64) -> Option<u64> {
    match plan_cycle(&machine.state, now_ms) {
        HeaterAction::On => {
            machine.set_relay(Relay::Boiler, true);
            None
        }
        HeaterAction::Off => {
            machine.set_relay(Relay::Boiler, false);
            None
        }
        HeaterAction::Pulse { off_after_ms } => {
            machine.set_relay(Relay::Boiler, true);
            Some(off_after_ms)
        }
    }
}

/// Mid-cycle off callback for a pulsed cycle.
pub fn heater_off(machine: &mut Machine) {
    machine.set_relay(Relay::Boiler, false);
}
