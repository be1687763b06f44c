use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File, Source};
use serde::Deserialize;

use crate::error::AppError;

pub const CONFIG_FILE: &str = "config/medisearch.toml";
pub const ENV_PREFIX: &str = "MEDISEARCH";

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    #[serde(default = "default_orders_path")]
    pub orders_path: PathBuf,
    #[serde(default)]
    pub telegram_token: Option<String>,
    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,
    #[serde(default = "default_dashboard_addr")]
    pub dashboard_addr: String,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_results_limit")]
    pub results_limit: usize,
    #[serde(default = "default_stock")]
    pub default_stock: u32,
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/medicines.csv")
}

fn default_orders_path() -> PathBuf {
    PathBuf::from("data/orders.csv")
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_dashboard_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_results_limit() -> usize {
    10
}

fn default_stock() -> u32 {
    crate::catalog_actor::DEFAULT_STOCK
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("dataset_path", &self.dataset_path)
            .field("orders_path", &self.orders_path)
            .field("telegram_token", &self.telegram_token.as_ref().map(|_| "<redacted>"))
            .field("telegram_api_url", &self.telegram_api_url)
            .field("dashboard_addr", &self.dashboard_addr)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("results_limit", &self.results_limit)
            .field("default_stock", &self.default_stock)
            .finish()
    }
}

impl AppConfig {
    /// Load from `config/medisearch.toml` (optional), then `MEDISEARCH__*`
    /// environment variables, then the unprefixed variables older
    /// deployments set.
    pub fn load() -> Result<Self, AppError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Ok(Self::from_sources(File::with_name(CONFIG_FILE).required(false), env)?)
    }

    fn from_sources<S>(file: S, env: HashMap<String, String>) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .source(Some(env.clone())),
            )
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;
        config.apply_legacy_env(&env);
        Ok(config)
    }

    /// `TELEGRAM_BOT_TOKEN`, `dataset_path` (a file name under `data/`) and
    /// `PORT` fill in values that were left unset or at their default.
    fn apply_legacy_env(&mut self, env: &HashMap<String, String>) {
        let legacy = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        if self.telegram_token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            self.telegram_token = legacy("TELEGRAM_BOT_TOKEN").map(str::to_string);
        }
        if self.dataset_path == default_dataset_path() {
            if let Some(name) = legacy("dataset_path") {
                self.dataset_path = PathBuf::from("data").join(name);
            }
        }
        if self.dashboard_addr == default_dashboard_addr() {
            if let Some(port) = legacy("PORT") {
                self.dashboard_addr = format!("0.0.0.0:{}", port);
            }
        }
    }

    /// The bot token; a deployment without one cannot start.
    pub fn bot_token(&self) -> Result<&str, AppError> {
        self.telegram_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::MissingToken)
    }

    pub fn dashboard_socket_addr(&self) -> Result<SocketAddr, AppError> {
        self.dashboard_addr
            .parse()
            .map_err(|_| AppError::InvalidAddress(self.dashboard_addr.clone()))
    }
}
