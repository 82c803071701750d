use crate::hal::{Button, ButtonInputs, Relay, RelayOutputs, SensorError, TemperatureSensor};
use std::cell::RefCell;
use std::rc::Rc;

/// Simulated single-boiler machine with first-order thermal dynamics.
#[derive(Debug)]
pub struct SimulatedBoiler {
    temperature_c: f64,
    latched_c: f64,
    conversion_started: bool,
    fail_next_read: bool,

    heater_on: bool,
    valve_on: bool,
    pump_on: bool,

    brew_held: bool,
    pump_held: bool,
    steam_held: bool,

    ambient_c: f64,
    element_limit_c: f64,
    time_constant_s: f64,
}

impl SimulatedBoiler {
    fn new(initial_c: f64) -> Self {
        Self {
            temperature_c: initial_c,
            latched_c: initial_c,
            conversion_started: false,
            fail_next_read: false,
            heater_on: false,
            valve_on: false,
            pump_on: false,
            brew_held: false,
            pump_held: false,
            steam_held: false,
            ambient_c: 21.0,
            element_limit_c: 140.0,
            time_constant_s: 90.0,
        }
    }

    /// Advance the thermal model. The boiler relaxes toward the element
    /// limit while heated, toward ambient otherwise.
    fn step(&mut self, dt_s: f64) {
        let drive = if self.heater_on {
            self.element_limit_c
        } else {
            self.ambient_c
        };
        let response = 1.0 - (-dt_s / self.time_constant_s).exp();
        self.temperature_c += (drive - self.temperature_c) * response;
    }
}

/// Owns one [`SimulatedBoiler`] and hands out boxed views over it for each
/// of the three HAL seams, so a single simulation backs the whole machine.
/// Single-threaded by construction, like everything else on the scheduler.
#[derive(Clone)]
pub struct SimulatedRig {
    cell: Rc<RefCell<SimulatedBoiler>>,
}

impl SimulatedRig {
    pub fn new(initial_c: f64) -> Self {
        Self {
            cell: Rc::new(RefCell::new(SimulatedBoiler::new(initial_c))),
        }
    }

    pub fn sensor(&self) -> Box<dyn TemperatureSensor> {
        Box::new(SimSensor {
            cell: Rc::clone(&self.cell),
        })
    }

    pub fn buttons(&self) -> Box<dyn ButtonInputs> {
        Box::new(SimButtons {
            cell: Rc::clone(&self.cell),
        })
    }

    pub fn relays(&self) -> Box<dyn RelayOutputs> {
        Box::new(SimRelays {
            cell: Rc::clone(&self.cell),
        })
    }

    pub fn step(&self, dt_s: f64) {
        self.cell.borrow_mut().step(dt_s);
    }

    /// Script a button as held or released.
    pub fn press(&self, button: Button, held: bool) {
        let mut sim = self.cell.borrow_mut();
        match button {
            Button::Brew => sim.brew_held = held,
            Button::Pump => sim.pump_held = held,
            Button::Steam => sim.steam_held = held,
        }
    }

    pub fn set_temperature(&self, celsius: f64) {
        self.cell.borrow_mut().temperature_c = celsius;
    }

    /// The next `read_celsius` fails once, emulating a bus fault.
    pub fn fail_next_read(&self) {
        self.cell.borrow_mut().fail_next_read = true;
    }

    pub fn temperature(&self) -> f64 {
        self.cell.borrow().temperature_c
    }

    pub fn heater_on(&self) -> bool {
        self.cell.borrow().heater_on
    }

    pub fn valve_on(&self) -> bool {
        self.cell.borrow().valve_on
    }

    pub fn pump_on(&self) -> bool {
        self.cell.borrow().pump_on
    }
}

struct SimSensor {
    cell: Rc<RefCell<SimulatedBoiler>>,
}

impl TemperatureSensor for SimSensor {
    fn start_conversion(&mut self) {
        let mut sim = self.cell.borrow_mut();
        sim.latched_c = sim.temperature_c;
        sim.conversion_started = true;
    }

    fn read_celsius(&mut self) -> Result<f64, SensorError> {
        let mut sim = self.cell.borrow_mut();
        if !sim.conversion_started {
            return Err(SensorError::NotReady);
        }
        sim.conversion_started = false;
        if sim.fail_next_read {
            sim.fail_next_read = false;
            return Err(SensorError::Bus("simulated bus fault".to_string()));
        }
        Ok(sim.latched_c)
    }
}

struct SimButtons {
    cell: Rc<RefCell<SimulatedBoiler>>,
}

impl ButtonInputs for SimButtons {
    fn read(&mut self, button: Button) -> bool {
        let sim = self.cell.borrow();
        match button {
            Button::Brew => sim.brew_held,
            Button::Pump => sim.pump_held,
            Button::Steam => sim.steam_held,
        }
    }
}

struct SimRelays {
    cell: Rc<RefCell<SimulatedBoiler>>,
}

impl RelayOutputs for SimRelays {
    fn set(&mut self, relay: Relay, on: bool) {
        let mut sim = self.cell.borrow_mut();
        match relay {
            Relay::Boiler => sim.heater_on = on,
            Relay::Valve => sim.valve_on = on,
            Relay::Pump => sim.pump_on = on,
        }
    }
}
