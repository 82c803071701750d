use crate::machine::Machine;
use crate::state::{ActuatorSnapshot, ButtonSnapshot};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PidBlock {
    pub k_param: f64,
    pub i_param: f64,
    pub d_param: f64,
    pub cycle_time: f64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataBlock {
    pub temperature: f64,
    /// Age of the temperature sample in seconds; staleness is reported
    /// through this field rather than as an error. Absent until the first
    /// successful sample (infinity has no JSON number representation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_age_s: Option<f64>,
    pub power_ms: u16,
    pub idle_time_s: u64,
    pub auto_off_enabled: bool,
    pub auto_off_secs: u64,
    pub shot_timer_enabled: bool,
    pub shot_timer_duration_s: u32,
    pub steaming: bool,
}

/// One status-cycle snapshot of the whole machine, published best-effort
/// once per second.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub ts_ms: u64,
    pub pid: PidBlock,
    pub data: DataBlock,
    pub buttons: ButtonSnapshot,
    pub relays: ActuatorSnapshot,
}

/// Fire-and-forget sink for status reports. Returning `false` means the
/// report was dropped for this cycle; the publisher is retried next cycle.
pub trait StatusPublisher {
    fn publish(&mut self, report: &StatusReport) -> bool;
}

pub fn status_report(machine: &Machine, now_ms: u64) -> StatusReport {
    let state = &machine.state;
    let gains = machine.pid.gains();
    let temperature_age_s = if state.temperature_sample_time_ms == 0 {
        None
    } else {
        Some(state.temperature_age_ms(now_ms) as f64 / 1000.0)
    };

    StatusReport {
        ts_ms: now_ms,
        pid: PidBlock {
            k_param: gains.k_param,
            i_param: gains.i_param,
            d_param: gains.d_param,
            cycle_time: gains.cycle_time,
            enabled: state.enabled,
        },
        data: DataBlock {
            temperature: state.temperature,
            temperature_age_s,
            power_ms: state.power_ms,
            idle_time_s: state.idle_time_ms(now_ms) / 1000,
            auto_off_enabled: state.auto_off_enabled,
            auto_off_secs: state.auto_off_secs,
            shot_timer_enabled: state.shot_timer_enabled,
            shot_timer_duration_s: state.shot_timer_duration_s,
            steaming: state.steaming,
        },
        buttons: state.buttons,
        relays: state.actuators,
    }
}

#[cfg(all(test, feature = "simulation"))]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::hal_sim::SimulatedRig;

    #[test]
    fn report_reflects_live_state() {
        let rig = SimulatedRig::new(70.0);
        let mut m = Machine::new(
            &MachineConfig::default(),
            rig.sensor(),
            rig.buttons(),
            rig.relays(),
        );
        m.state.record_temperature(91.2, 9_000);
        m.state.power_ms = 350;
        m.state.steaming = true;
        m.state.touch(8_000);

        let report = status_report(&m, 10_000);
        assert_eq!(report.ts_ms, 10_000);
        assert_eq!(report.data.temperature, 91.2);
        assert_eq!(report.data.temperature_age_s, Some(1.0));
        assert_eq!(report.data.power_ms, 350);
        assert_eq!(report.data.idle_time_s, 2);
        assert!(report.data.steaming);
        assert_eq!(report.pid.k_param, 70.0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["relays"]["boiler"], false);
        assert_eq!(json["buttons"]["steam"], false);
        assert_eq!(json["data"]["temperature_age_s"], 1.0);
    }

    #[test]
    fn age_is_omitted_before_the_first_sample() {
        let rig = SimulatedRig::new(70.0);
        let m = Machine::new(
            &MachineConfig::default(),
            rig.sensor(),
            rig.buttons(),
            rig.relays(),
        );

        let report = status_report(&m, 1_000);
        assert!(report.data.temperature_age_s.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["data"].get("temperature_age_s").is_none());
    }
}
