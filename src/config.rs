use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

use crate::error::Result;
use crate::simulation::SimulationConfig;
use crate::telemetry::TelemetryConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

pub const ENV_PREFIX: &str = "SOLAR__";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub runner: RunnerConfig,
    #[validate(nested)]
    pub simulation: SimulationConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RunnerConfig {
    /// Begin ticking as soon as the runner is spawned
    pub autostart: bool,
    /// Emit a status line every this many ticks (0 disables)
    pub log_every_ticks: u64,
    /// Pending control commands before senders wait
    #[validate(range(min = 1, max = 4096))]
    pub command_buffer: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            autostart: true,
            log_every_ticks: 50,
            command_buffer: 32,
        }
    }
}

impl Config {
    /// Defaults, overlaid by `config/default.toml`, overlaid by `SOLAR__*` env vars
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let cfg: Config = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }
}
