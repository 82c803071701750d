use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub run_seconds: Option<u64>,
    pub config_path: PathBuf,
    pub bind_addr: Option<String>,
    pub bridge_enabled: bool,
    pub json_logs: bool,
    pub sim: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            run_seconds: None,
            config_path: PathBuf::from("silvia.conf"),
            bind_addr: None,
            bridge_enabled: true,
            json_logs: false,
            sim: false,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Self {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" => {
                    if i + 1 < args.len() {
                        cfg.config_path = PathBuf::from(&args[i + 1]);
                        i += 1;
                    }
                }
                "--bind" => {
                    if i + 1 < args.len() {
                        cfg.bind_addr = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--no-bridge" => {
                    cfg.bridge_enabled = false;
                }
                "--run-seconds" => {
                    if i + 1 < args.len() {
                        cfg.run_seconds = args[i + 1].parse::<u64>().ok();
                        i += 1;
                    }
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--sim" => {
                    cfg.sim = true;
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                _ => {}
            }
            i += 1;
        }
        cfg
    }

    pub fn print_help() {
        println!(
            r#"silvia-ctl - single-boiler espresso machine controller

USAGE:
    silvia-ctl [OPTIONS]

OPTIONS:
    --config <PATH>         Persisted machine configuration [default: silvia.conf]
    --bind <ADDR>           Bridge TCP bind address (overrides the stored one)
    --no-bridge             Disable the telemetry/remote-config bridge
    --run-seconds <SECS>    Run for a fixed duration then exit
    --json-logs             Output logs in JSON format (for log aggregation)
    --sim                   Drive the simulated boiler instead of hardware
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log filter (e.g., RUST_LOG=debug,silvia_ctl=trace)

EXAMPLES:
    # Run the simulated boiler against the stored configuration
    silvia-ctl --sim

    # Short simulated run without the bridge
    silvia-ctl --sim --run-seconds 10 --no-bridge
"#
        );
    }
}
