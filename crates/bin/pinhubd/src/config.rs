//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `pinhub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use pinhub_adapter_gpio::{Backend, GpioConfig};
use pinhub_app::watcher::WatcherConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// The house this controller drives.
    pub house: HouseConfig,
    /// Output line backend.
    pub gpio: GpioConfig,
    /// Reconciliation timing.
    pub schedule: ScheduleConfig,
    /// Live event stream.
    pub events: EventsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// House bootstrap.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HouseConfig {
    /// Name given to the house when it has to be created.
    pub name: String,
    /// Create an empty house when the store holds none.
    pub create_if_missing: bool,
}

/// Schedule watcher timing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between two reconciliation ticks.
    pub interval_secs: u64,
    /// Upper bound on each persistence or broadcast call made by a tick.
    pub dispatch_timeout_secs: u64,
}

/// Event bus sizing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Events buffered per subscriber before the slowest one starts lagging.
    pub capacity: usize,
}

impl Config {
    /// Load configuration from `pinhub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("pinhub.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(val) = var("PINHUB_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("PINHUB_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("PINHUB_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Some(val) = var("PINHUB_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("PINHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("PINHUB_HOUSE_NAME") {
            self.house.name = val;
        }
        if let Some(capacity) = var("PINHUB_EVENT_CAPACITY").and_then(|val| val.parse().ok()) {
            self.events.capacity = capacity;
        }
        if let Some(val) = var("PINHUB_GPIO_BACKEND") {
            self.gpio.backend = val.parse::<Backend>().map_err(ConfigError::Validation)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.gpio.first_pin > self.gpio.last_pin {
            return Err(ConfigError::Validation(format!(
                "gpio pin range {}..={} is empty",
                self.gpio.first_pin, self.gpio.last_pin
            )));
        }
        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "schedule interval must be non-zero".to_string(),
            ));
        }
        if self.schedule.interval_secs <= self.schedule.dispatch_timeout_secs.saturating_mul(2) {
            return Err(ConfigError::Validation(format!(
                "schedule interval ({}s) must exceed twice the dispatch timeout ({}s)",
                self.schedule.interval_secs, self.schedule.dispatch_timeout_secs
            )));
        }
        if self.events.capacity == 0 {
            return Err(ConfigError::Validation(
                "event capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn watcher(&self) -> WatcherConfig {
        WatcherConfig {
            interval: Duration::from_secs(self.schedule.interval_secs),
            dispatch_timeout: Duration::from_secs(self.schedule.dispatch_timeout_secs),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:pinhub.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "pinhubd=info,pinhub=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for HouseConfig {
    fn default() -> Self {
        Self {
            name: "Home".to_string(),
            create_if_missing: true,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            dispatch_timeout_secs: 5,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.url, "sqlite:pinhub.db?mode=rwc");
        assert_eq!(config.house.name, "Home");
        assert!(config.house.create_if_missing);
        assert_eq!(config.gpio.backend, Backend::Virtual);
        assert_eq!(config.watcher(), WatcherConfig::default());
        assert_eq!(config.events.capacity, 256);
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.schedule.interval_secs, 60);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [server]
            host = '127.0.0.1'
            port = 9090

            [database]
            url = 'sqlite:test.db'

            [logging]
            filter = 'debug'

            [house]
            name = 'Cabin'
            create_if_missing = false

            [gpio]
            backend = 'sysfs'
            sysfs_root = '/tmp/gpio'
            active_low = false
            first_pin = 4
            last_pin = 12

            [schedule]
            interval_secs = 30
            dispatch_timeout_secs = 2

            [events]
            capacity = 64
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.house.name, "Cabin");
        assert!(!config.house.create_if_missing);
        assert_eq!(config.gpio.backend, Backend::Sysfs);
        assert_eq!(config.gpio.sysfs_root.to_str(), Some("/tmp/gpio"));
        assert!(!config.gpio.active_low);
        assert_eq!((config.gpio.first_pin, config.gpio.last_pin), (4, 12));
        assert_eq!(config.watcher().interval, Duration::from_secs(30));
        assert_eq!(config.watcher().dispatch_timeout, Duration::from_secs(2));
        assert_eq!(config.events.capacity, 64);
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let toml = "
            [gpio]
            last_pin = 17
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.gpio.first_pin, 2);
        assert_eq!(config.gpio.last_pin, 17);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }

    #[test]
    fn should_apply_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("PINHUB_BIND", "127.0.0.1:8080"),
                ("PINHUB_DATABASE_URL", "sqlite::memory:"),
                ("PINHUB_LOG", "debug"),
                ("PINHUB_HOUSE_NAME", "Cabin"),
                ("PINHUB_GPIO_BACKEND", "sysfs"),
                ("PINHUB_EVENT_CAPACITY", "1024"),
            ]))
            .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.house.name, "Cabin");
        assert_eq!(config.gpio.backend, Backend::Sysfs);
        assert_eq!(config.events.capacity, 1024);
    }

    #[test]
    fn should_prefer_rust_log_over_pinhub_log() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[("PINHUB_LOG", "debug"), ("RUST_LOG", "trace")]))
            .unwrap();
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_ignore_unparsable_port() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("PINHUB_PORT", "http")])).unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_reject_unknown_gpio_backend() {
        let mut config = Config::default();
        let result = config.apply_overrides(env(&[("PINHUB_GPIO_BACKEND", "spi")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_inverted_pin_range() {
        let mut config = Config::default();
        config.gpio.first_pin = 20;
        config.gpio.last_pin = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_interval() {
        let mut config = Config::default();
        config.schedule.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_interval_not_exceeding_twice_dispatch_timeout() {
        let mut config = Config::default();
        config.schedule.interval_secs = 10;
        config.schedule.dispatch_timeout_secs = 5;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        config.schedule.interval_secs = 11;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_reject_zero_event_capacity() {
        let mut config = Config::default();
        config.events.capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_accept_defaults() {
        assert!(Config::default().validate().is_ok());
    }
}
