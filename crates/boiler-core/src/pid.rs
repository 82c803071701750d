use crate::machine::Machine;
use tracing::debug;

/// How often the control tick runs.
pub const CONTROL_PERIOD_MS: u64 = 1000;

/// A temperature sample older than this suppresses the control tick; the
/// controller itself has no time awareness.
pub const TEMP_STALE_MS: u64 = 10_000;

const OUTPUT_MIN: f64 = 0.0;
const OUTPUT_MAX: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub k_param: f64,
    pub i_param: f64,
    pub d_param: f64,
    pub cycle_time: f64,
}

/// Classic PID in derivative-of-measurement form: the proportional and
/// derivative terms act on the measured temperature, not the error, so a
/// setpoint change never produces an output spike. Output accumulates
/// across calls and the `[0, 1000]` clamp is the sole anti-windup.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    k0: f64,
    k1: f64,

    output: f64,
    pp: f64,
    pi: f64,
    pd: f64,

    prev_temp: f64,
    prev_temp_2: f64,
    primed: bool,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        let mut pid = Self {
            gains,
            k0: 0.0,
            k1: 0.0,
            output: 0.0,
            pp: 0.0,
            pi: 0.0,
            pd: 0.0,
            prev_temp: 0.0,
            prev_temp_2: 0.0,
            primed: false,
        };
        pid.recompute_coefficients();
        pid
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
        self.recompute_coefficients();
    }

    fn recompute_coefficients(&mut self) {
        // i_param == 0 disables integral action entirely.
        self.k0 = if self.gains.i_param == 0.0 {
            0.0
        } else {
            self.gains.k_param * self.gains.cycle_time / self.gains.i_param
        };
        self.k1 = self.gains.k_param * self.gains.d_param / self.gains.cycle_time;
    }

    /// One control cycle. Returns the clamped output as heater-on
    /// milliseconds per cycle. The temperature history advances on every
    /// call, enabled or not; disabling resets the accumulated output and
    /// all term values to zero so re-enabling starts cold.
    pub fn update(&mut self, temperature: f64, setpoint: f64, enabled: bool) -> u16 {
        if !self.primed {
            // Seed the history with the first real sample. Starting from a
            // zeroed history would kick the derivative term with the full
            // magnitude of the first reading.
            self.prev_temp = temperature;
            self.prev_temp_2 = temperature;
            self.primed = true;
        }

        let error = setpoint - temperature;
        if enabled {
            self.pp = self.gains.k_param * (self.prev_temp - temperature);
            self.pi = self.k0 * error;
            self.pd = self.k1 * (2.0 * self.prev_temp - temperature - self.prev_temp_2);
            self.output += self.pp + self.pi + self.pd;
        } else {
            self.output = 0.0;
            self.pp = 0.0;
            self.pi = 0.0;
            self.pd = 0.0;
        }

        self.prev_temp_2 = self.prev_temp;
        self.prev_temp = temperature;

        self.output = self.output.clamp(OUTPUT_MIN, OUTPUT_MAX);
        self.output as u16
    }
}

/// The per-cycle control step: picks the active setpoint, runs the
/// controller and publishes the result as `power_ms`. Skipped entirely when
/// the temperature sample is stale, which lets `power_age` grow until the
/// modulator cuts the heater.
pub fn control_tick(machine: &mut Machine, now_ms: u64) {
    let age = machine.state.temperature_age_ms(now_ms);
    if age > TEMP_STALE_MS {
        debug!(age_ms = age, "temperature stale, skipping control tick");
        return;
    }
    let setpoint = machine.state.target();
    let power = machine
        .pid
        .update(machine.state.temperature, setpoint, machine.state.enabled);
    machine.state.power_ms = power;
    machine.state.power_sample_time_ms = now_ms;
}
