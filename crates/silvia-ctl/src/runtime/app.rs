use crate::bridge::BridgeServer;
use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use boiler_core::scheduler::Scheduler;
use boiler_core::{buttons, modulator, pid, safety, sampler, telemetry};
use boiler_core::{Machine, MachineConfig, SimulatedRig, StatusPublisher};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// How often the bridge is drained for remote configuration updates.
const BRIDGE_POLL_MS: u64 = 100;

/// Step size of the simulated plant.
const SIM_STEP_MS: u64 = 250;

/// The actuation cycle starts after the first samples and control ticks
/// have had a chance to run.
const ACTUATION_START_DELAY_MS: u64 = 2000;

/// The scheduler's task context: the machine aggregate plus the runtime's
/// collaborators (plant simulation, bridge, persisted configuration).
pub struct App {
    machine: Machine,
    rig: SimulatedRig,
    bridge: Option<BridgeServer>,
    config: MachineConfig,
    config_path: PathBuf,
}

fn sample_request(s: &mut Scheduler<App>, app: &mut App) {
    sampler::request(&mut app.machine);
    s.schedule_after_ms(sampler::CONVERSION_LATENCY_MS, sample_complete);
}

fn sample_complete(s: &mut Scheduler<App>, app: &mut App) {
    sampler::complete(&mut app.machine, s.now_ms());
    s.schedule_after_ms(sampler::INTER_SAMPLE_DELAY_MS, sample_request);
}

fn control_tick(s: &mut Scheduler<App>, app: &mut App) {
    pid::control_tick(&mut app.machine, s.now_ms());
    s.schedule_after_ms(pid::CONTROL_PERIOD_MS, control_tick);
}

fn actuation_cycle(s: &mut Scheduler<App>, app: &mut App) {
    if let Some(off_after_ms) = modulator::apply_cycle(&mut app.machine, s.now_ms()) {
        s.schedule_after_ms(off_after_ms, heater_off);
    }
    s.schedule_after_ms(modulator::CYCLE_MS, actuation_cycle);
}

fn heater_off(_s: &mut Scheduler<App>, app: &mut App) {
    modulator::heater_off(&mut app.machine);
}

fn button_poll(s: &mut Scheduler<App>, app: &mut App) {
    buttons::poll(&mut app.machine, s.now_ms());
    s.schedule_after_ms(buttons::POLL_PERIOD_MS, button_poll);
}

fn status_tick(s: &mut Scheduler<App>, app: &mut App) {
    safety::enforce(&mut app.machine, s.now_ms());
    let report = telemetry::status_report(&app.machine, s.now_ms());
    if let Some(bridge) = app.bridge.as_mut() {
        // Best effort; a dropped report is retried with fresh data next
        // cycle anyway.
        let _ = bridge.publish(&report);
    }
    s.schedule_after_ms(safety::STATUS_PERIOD_MS, status_tick);
}

fn bridge_poll(s: &mut Scheduler<App>, app: &mut App) {
    let updates = match app.bridge.as_mut() {
        Some(bridge) => bridge.poll(),
        None => Vec::new(),
    };
    for update in updates {
        app.machine.apply_update(&update, s.now_ms());
        app.config = app.machine.export_config(&app.config);
        if let Err(err) = app.config.save(&app.config_path) {
            warn!(error = %err, "config save failed, in-memory settings stay authoritative");
        }
    }
    s.schedule_after_ms(BRIDGE_POLL_MS, bridge_poll);
}

fn sim_step(s: &mut Scheduler<App>, app: &mut App) {
    app.rig.step(SIM_STEP_MS as f64 / 1000.0);
    s.schedule_after_ms(SIM_STEP_MS, sim_step);
}

pub fn run_from_args() {
    let config = RuntimeConfig::from_env();
    if config.show_help {
        RuntimeConfig::print_help();
        return;
    }
    run(config);
}

pub fn run(runtime: RuntimeConfig) {
    init_tracing(runtime.json_logs);

    // Real sensor and relay drivers plug into the same three HAL seams the
    // rig implements; none are linked into this binary yet.
    if !runtime.sim {
        error!("no hardware backend in this build, rerun with --sim");
        return;
    }

    let mut config = MachineConfig::load_or_default(&runtime.config_path);
    if let Some(addr) = &runtime.bind_addr {
        config.bind_addr = addr.clone();
    }

    let rig = SimulatedRig::new(21.0);
    let machine = Machine::new(&config, rig.sensor(), rig.buttons(), rig.relays());

    let bridge = if runtime.bridge_enabled {
        match BridgeServer::bind(&config.bind_addr) {
            Ok(bridge) => Some(bridge),
            Err(err) => {
                warn!(addr = %config.bind_addr, error = %err, "bridge unavailable, running without it");
                None
            }
        }
    } else {
        info!("bridge disabled");
        None
    };

    info!(
        brew_setpoint = config.brew_setpoint,
        steam_setpoint = config.steam_setpoint,
        k_param = config.k_param,
        i_param = config.i_param,
        d_param = config.d_param,
        "starting control loop"
    );

    let bridge_present = bridge.is_some();
    let mut app = App {
        machine,
        rig,
        bridge,
        config,
        config_path: runtime.config_path.clone(),
    };

    let mut sched = Scheduler::new();
    sched.schedule_after_ms(0, sample_request);
    sched.schedule_after_ms(0, control_tick);
    sched.schedule_after_ms(0, button_poll);
    sched.schedule_after_ms(0, status_tick);
    sched.schedule_after_ms(0, sim_step);
    if bridge_present {
        sched.schedule_after_ms(0, bridge_poll);
    }
    sched.schedule_after_ms(ACTUATION_START_DELAY_MS, actuation_cycle);

    let stop = Arc::new(AtomicBool::new(false));
    if let Some(seconds) = runtime.run_seconds {
        info!(seconds, "running for limited duration");
        let stop_timer = Arc::clone(&stop);
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(seconds));
            stop_timer.store(true, std::sync::atomic::Ordering::Relaxed);
        });
    }

    sched.run(&mut app, &stop);
    info!("control loop stopped");
}
