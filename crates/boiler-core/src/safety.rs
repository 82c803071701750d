use crate::machine::Machine;
use tracing::warn;

/// Cadence of the status/safety tick.
pub const STATUS_PERIOD_MS: u64 = 1000;

/// Steam mode is force-exited after this dwell time.
pub const STEAM_DWELL_MS: u64 = 300_000;

/// Cycle-level guards. Runs once per status cycle.
pub fn enforce(machine: &mut Machine, now_ms: u64) {
    let state = &mut machine.state;

    if state.steaming && now_ms > state.steaming_started_at_ms + STEAM_DWELL_MS {
        warn!(
            dwell_ms = now_ms - state.steaming_started_at_ms,
            "steam dwell exceeded, leaving steam mode"
        );
        state.steaming = false;
    }

    if state.auto_off_enabled
        && state.enabled
        && state.idle_time_ms(now_ms) > state.auto_off_secs * 1000
    {
        warn!(
            idle_ms = state.idle_time_ms(now_ms),
            "idle timeout, disabling controller"
        );
        state.enabled = false;
    }
}
