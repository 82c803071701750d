use crate::machine::Machine;
use tracing::warn;

/// Fixed conversion time of the sensor; the read phase must not run sooner.
pub const CONVERSION_LATENCY_MS: u64 = 750;

/// Gap between completing one sample and requesting the next.
pub const INTER_SAMPLE_DELAY_MS: u64 = 250;

/// First phase: kick off a conversion. The caller schedules
/// [`complete`] after [`CONVERSION_LATENCY_MS`].
pub fn request(machine: &mut Machine) {
    machine.sensor.start_conversion();
}

/// Second phase: read the converted value. On failure the previous
/// temperature is retained and the sample time is not refreshed, so the
/// staleness guards age out naturally. The caller schedules [`request`]
/// after [`INTER_SAMPLE_DELAY_MS`].
pub fn complete(machine: &mut Machine, now_ms: u64) {
    match machine.sensor.read_celsius() {
        Ok(value) if value.is_finite() => {
            machine.state.record_temperature(value, now_ms);
        }
        Ok(value) => {
            warn!(value, "discarding non-finite temperature reading");
        }
        Err(err) => {
            warn!(error = %err, "temperature read failed, keeping previous sample");
        }
    }
}
