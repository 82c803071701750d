use crate::pid::PidGains;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The persisted machine configuration. Field names match the stored JSON
/// record; missing fields take their defaults so older files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub brew_setpoint: f64,
    pub steam_setpoint: f64,
    pub cycle_time: f64,
    pub enabled: bool,
    pub k_param: f64,
    pub i_param: f64,
    pub d_param: f64,
    pub shot_timer_enabled: bool,
    pub shot_timer_duration: u32,
    pub auto_off_enabled: bool,
    pub auto_off_secs: u64,
    pub bind_addr: String,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            brew_setpoint: 78.0,
            steam_setpoint: 110.0,
            cycle_time: 1.0,
            enabled: true,
            k_param: 70.0,
            i_param: 80.0,
            d_param: 4.0,
            shot_timer_enabled: true,
            shot_timer_duration: 25,
            auto_off_enabled: false,
            auto_off_secs: 4 * 60 * 60,
            bind_addr: "127.0.0.1:7000".to_string(),
        }
    }
}

impl MachineConfig {
    pub fn gains(&self) -> PidGains {
        PidGains {
            k_param: self.k_param,
            i_param: self.i_param,
            d_param: self.d_param,
            cycle_time: self.cycle_time,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load the persisted record, or fall back to defaults. A missing file
    /// is seeded with the defaults; a corrupt file is left untouched so it
    /// can be inspected.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                if let Err(err) = config.save(path) {
                    warn!(path = %path.display(), error = %err, "failed to seed default config");
                }
                config
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable config, using defaults");
                Self::default()
            }
        }
    }

    /// Atomic replace: write a temporary file next to the target, then
    /// rename over the previous copy, so a crash mid-write never corrupts
    /// the stored record.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// A partial remote configuration update. Unknown keys in the payload are
/// ignored; a type error on any recognized key fails the whole update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub brew_setpoint: Option<f64>,
    pub steam_setpoint: Option<f64>,
    pub pid_p: Option<f64>,
    pub pid_i: Option<f64>,
    pub pid_d: Option<f64>,
    pub shot_timer_enabled: Option<bool>,
    pub shot_timer_duration: Option<u32>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.brew_setpoint.is_none()
            && self.steam_setpoint.is_none()
            && self.pid_p.is_none()
            && self.pid_i.is_none()
            && self.pid_d.is_none()
            && self.shot_timer_enabled.is_none()
            && self.shot_timer_duration.is_none()
    }
}
