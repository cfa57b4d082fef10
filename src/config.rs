use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::auth::DEFAULT_AUTH_SOCKET;

pub const CONFIG_PATH: &str = "/etc/qstatw/config.toml";
pub const ENV_PREFIX: &str = "QSTATW_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Unix socket of the authentication daemon.
    pub auth_socket: PathBuf,
    /// Dashboard refresh interval.
    pub refresh_secs: u64,
    /// Deadline for each daemon exchange and for dialing the batch server.
    pub timeout_secs: u64,
    pub verbose: bool,
    pub json_logs: bool,
    /// Where the dashboard writes logs; it logs nowhere without one.
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auth_socket: PathBuf::from(DEFAULT_AUTH_SOCKET),
            refresh_secs: 3,
            timeout_secs: 5,
            verbose: false,
            json_logs: false,
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Layer defaults, the config file, `QSTATW_*` variables and CLI
    /// overrides, later sources winning.
    pub fn new<T: Serialize>(config_file: Option<&Path>, overrides: Option<&T>) -> Result<Self> {
        let file = config_file.unwrap_or(Path::new(CONFIG_PATH));

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX));

        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.refresh_secs == 0 {
            bail!("refresh_secs must be greater than zero");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
