use crate::config::{ConfigUpdate, MachineConfig};
use crate::hal::{ButtonInputs, Relay, RelayOutputs, TemperatureSensor};
use crate::pid::{PidController, PidGains};
use crate::state::MachineState;
use tracing::info;

/// The machine aggregate: the shared state record, the controller and the
/// three hardware seams. Everything the periodic tasks touch hangs off this
/// one value; it is built once at startup and handed to the scheduler as
/// the task context.
pub struct Machine {
    pub state: MachineState,
    pub pid: PidController,
    pub sensor: Box<dyn TemperatureSensor>,
    pub inputs: Box<dyn ButtonInputs>,
    pub relays: Box<dyn RelayOutputs>,
}

impl Machine {
    pub fn new(
        config: &MachineConfig,
        sensor: Box<dyn TemperatureSensor>,
        inputs: Box<dyn ButtonInputs>,
        relays: Box<dyn RelayOutputs>,
    ) -> Self {
        let mut machine = Self {
            state: MachineState::new(config),
            pid: PidController::new(config.gains()),
            sensor,
            inputs,
            relays,
        };
        // All relays start de-energized.
        machine.set_relay(Relay::Boiler, false);
        machine.set_relay(Relay::Valve, false);
        machine.set_relay(Relay::Pump, false);
        machine
    }

    /// Command a relay and mirror the commanded state for telemetry.
    pub fn set_relay(&mut self, relay: Relay, on: bool) {
        self.relays.set(relay, on);
        match relay {
            Relay::Boiler => self.state.actuators.boiler = on,
            Relay::Valve => self.state.actuators.valve = on,
            Relay::Pump => self.state.actuators.pump = on,
        }
    }

    /// Apply a partial remote update onto the live state. Present fields
    /// are applied; PID coefficient changes retune the controller in place.
    pub fn apply_update(&mut self, update: &ConfigUpdate, now_ms: u64) {
        if let Some(v) = update.brew_setpoint {
            self.state.brew_setpoint = v;
            info!(brew_setpoint = v, "remote setpoint change");
        }
        if let Some(v) = update.steam_setpoint {
            self.state.steam_setpoint = v;
            info!(steam_setpoint = v, "remote steam setpoint change");
        }
        if update.pid_p.is_some() || update.pid_i.is_some() || update.pid_d.is_some() {
            let current = self.pid.gains();
            let gains = PidGains {
                k_param: update.pid_p.unwrap_or(current.k_param),
                i_param: update.pid_i.unwrap_or(current.i_param),
                d_param: update.pid_d.unwrap_or(current.d_param),
                cycle_time: current.cycle_time,
            };
            self.pid.set_gains(gains);
            info!(
                k_param = gains.k_param,
                i_param = gains.i_param,
                d_param = gains.d_param,
                "remote PID retune"
            );
        }
        if let Some(v) = update.shot_timer_enabled {
            self.state.shot_timer_enabled = v;
        }
        if let Some(v) = update.shot_timer_duration {
            self.state.shot_timer_duration_s = v;
        }
        self.state.touch(now_ms);
    }

    /// Fold the live settings back into a persistable record, keeping
    /// fields the core does not own (bind address) from the template.
    pub fn export_config(&self, template: &MachineConfig) -> MachineConfig {
        let gains = self.pid.gains();
        MachineConfig {
            brew_setpoint: self.state.brew_setpoint,
            steam_setpoint: self.state.steam_setpoint,
            cycle_time: gains.cycle_time,
            enabled: self.state.enabled,
            k_param: gains.k_param,
            i_param: gains.i_param,
            d_param: gains.d_param,
            shot_timer_enabled: self.state.shot_timer_enabled,
            shot_timer_duration: self.state.shot_timer_duration_s,
            auto_off_enabled: self.state.auto_off_enabled,
            auto_off_secs: self.state.auto_off_secs,
            bind_addr: template.bind_addr.clone(),
        }
    }
}

#[cfg(all(test, feature = "simulation"))]
mod tests {
    use super::*;
    use crate::hal_sim::SimulatedRig;

    fn machine() -> (Machine, SimulatedRig) {
        let rig = SimulatedRig::new(25.0);
        let machine = Machine::new(
            &MachineConfig::default(),
            rig.sensor(),
            rig.buttons(),
            rig.relays(),
        );
        (machine, rig)
    }

    #[test]
    fn startup_commands_all_relays_off() {
        let (machine, rig) = machine();
        assert!(!machine.state.actuators.boiler);
        assert!(!machine.state.actuators.valve);
        assert!(!machine.state.actuators.pump);
        assert!(!rig.heater_on());
    }

    #[test]
    fn partial_update_applies_and_retunes() {
        let (mut machine, _rig) = machine();
        let update: ConfigUpdate =
            serde_json::from_str(r#"{"brew_setpoint": 94.0, "pid_i": 0.0}"#).unwrap();
        machine.apply_update(&update, 42_000);

        assert_eq!(machine.state.brew_setpoint, 94.0);
        let gains = machine.pid.gains();
        assert_eq!(gains.i_param, 0.0);
        assert_eq!(gains.k_param, 70.0);
        assert_eq!(machine.state.last_cmd_time_ms, 42_000);
    }

    #[test]
    fn export_round_trips_through_config() {
        let (mut machine, _rig) = machine();
        let update: ConfigUpdate = serde_json::from_str(
            r#"{"steam_setpoint": 118.0, "shot_timer_enabled": false, "shot_timer_duration": 28}"#,
        )
        .unwrap();
        machine.apply_update(&update, 1_000);

        let exported = machine.export_config(&MachineConfig::default());
        assert_eq!(exported.steam_setpoint, 118.0);
        assert!(!exported.shot_timer_enabled);
        assert_eq!(exported.shot_timer_duration, 28);
        assert_eq!(exported.bind_addr, MachineConfig::default().bind_addr);
    }
}
