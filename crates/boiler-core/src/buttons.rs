use crate::hal::{Button, Relay};
use crate::machine::Machine;
use crate::state::ButtonSnapshot;
use tracing::debug;

/// Button poll period. The poll period itself is the debounce window; the
/// inputs are expected to be electrically debounced already.
pub const POLL_PERIOD_MS: u64 = 200;

/// One poll tick: capture the three button states, compute edges against
/// the previous tick and apply the per-button rules. Each button produces
/// at most one transition per tick, and only on a genuine change.
pub fn poll(machine: &mut Machine, now_ms: u64) {
    let current = ButtonSnapshot {
        brew: machine.inputs.read(Button::Brew),
        pump: machine.inputs.read(Button::Pump),
        steam: machine.inputs.read(Button::Steam),
    };
    let previous = machine.state.buttons;
    machine.state.prev_buttons = previous;
    machine.state.buttons = current;

    if current == previous {
        return;
    }
    debug!(?previous, ?current, "button edge");

    if current.pump != previous.pump {
        machine.state.pumping = current.pump;
        machine.set_relay(Relay::Pump, current.pump);
        machine.state.touch(now_ms);
    }

    if current.brew != previous.brew {
        if current.brew {
            machine.set_relay(Relay::Valve, true);
            machine.set_relay(Relay::Pump, true);
        } else {
            // Release clears the flag; press never set it. Kept as the
            // reference firmware behaves.
            machine.state.brewing = false;
            machine.set_relay(Relay::Valve, false);
            machine.set_relay(Relay::Pump, false);
        }
        machine.state.touch(now_ms);
    }

    if current.steam != previous.steam {
        if current.steam {
            machine.state.steaming = true;
            machine.state.steaming_started_at_ms = now_ms;
        } else {
            machine.state.steaming = false;
        }
        machine.state.touch(now_ms);
    }
}

#[cfg(all(test, feature = "simulation"))]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::hal_sim::SimulatedRig;

    fn machine(rig: &SimulatedRig) -> Machine {
        Machine::new(
            &MachineConfig::default(),
            rig.sensor(),
            rig.buttons(),
            rig.relays(),
        )
    }

    #[test]
    fn pump_press_and_release_drive_pump_relay() {
        let rig = SimulatedRig::new(70.0);
        let mut m = machine(&rig);

        rig.press(Button::Pump, true);
        poll(&mut m, 200);
        assert!(m.state.pumping);
        assert!(m.state.actuators.pump);
        assert_eq!(m.state.last_cmd_time_ms, 200);

        rig.press(Button::Pump, false);
        poll(&mut m, 400);
        assert!(!m.state.pumping);
        assert!(!m.state.actuators.pump);
    }

    #[test]
    fn held_button_produces_no_second_transition() {
        let rig = SimulatedRig::new(70.0);
        let mut m = machine(&rig);

        rig.press(Button::Pump, true);
        poll(&mut m, 200);
        poll(&mut m, 400);
        // last_cmd_time only moved on the edge, not while held.
        assert_eq!(m.state.last_cmd_time_ms, 200);
        assert!(m.state.pumping);
    }

    #[test]
    fn brew_press_opens_valve_and_pump_without_brewing_flag() {
        let rig = SimulatedRig::new(70.0);
        let mut m = machine(&rig);

        rig.press(Button::Brew, true);
        poll(&mut m, 200);
        assert!(m.state.actuators.valve);
        assert!(m.state.actuators.pump);
        assert!(!m.state.brewing);

        rig.press(Button::Brew, false);
        poll(&mut m, 400);
        assert!(!m.state.actuators.valve);
        assert!(!m.state.actuators.pump);
        assert!(!m.state.brewing);
    }

    #[test]
    fn steam_press_enters_mode_and_records_start_time() {
        let rig = SimulatedRig::new(70.0);
        let mut m = machine(&rig);

        rig.press(Button::Steam, true);
        poll(&mut m, 600);
        assert!(m.state.steaming);
        assert_eq!(m.state.steaming_started_at_ms, 600);

        rig.press(Button::Steam, false);
        poll(&mut m, 800);
        assert!(!m.state.steaming);
    }

    #[test]
    fn simultaneous_edges_apply_independently() {
        let rig = SimulatedRig::new(70.0);
        let mut m = machine(&rig);

        rig.press(Button::Pump, true);
        rig.press(Button::Steam, true);
        poll(&mut m, 200);
        assert!(m.state.pumping);
        assert!(m.state.steaming);
    }
}
