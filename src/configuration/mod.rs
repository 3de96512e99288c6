use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use config::builder::DefaultState;
use serde::Deserialize;

use std::time::Duration;
use std::{env, net::SocketAddr};

use crate::common::types::BackendAddr;
use crate::health::HealthCheckSettings;

#[derive(Debug, Deserialize)]
pub struct RawSettings {
    pub listen_addr: String,
    pub backends: Vec<BackendAddr>,
    pub health_check_interval_secs: u64,
    pub health_check_timeout_secs: u64,
    pub health_check_path: String,
    pub proxy_timeout_secs: u64,
    pub shutdown_grace_period_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub listen_addr: SocketAddr,
    pub backends: Vec<BackendAddr>,
    pub health_check: HealthCheckSettings,
    pub proxy_timeout: Duration,
    pub shutdown_grace_period: Duration,
}

impl Settings {
    /// Layers, lowest priority first: built-in defaults, `<RUN_MODE>.toml`,
    /// `config.toml` (required in production), `LB__*` environment variables.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let config = defaults()?
            .add_source(File::with_name(&run_mode).required(false))
            .add_source(File::with_name("config").required(run_mode == "production"))
            .add_source(Environment::with_prefix("LB").separator("__"))
            .build()?;

        Self::from_config(config)
    }

    /// Parses a TOML document on top of the built-in defaults.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        let config = defaults()?
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let raw: RawSettings = config.try_deserialize()?;
        raw.try_into()
    }
}

impl TryFrom<RawSettings> for Settings {
    type Error = ConfigError;

    fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
        let listen_addr = raw.listen_addr.parse::<SocketAddr>().map_err(|e| {
            ConfigError::Message(format!("invalid listen address {:?}: {}", raw.listen_addr, e))
        })?;

        if raw.backends.is_empty() {
            return Err(ConfigError::Message(
                "at least one backend must be configured".into(),
            ));
        }

        let health_check = HealthCheckSettings {
            interval: Duration::from_secs(raw.health_check_interval_secs),
            timeout: Duration::from_secs(raw.health_check_timeout_secs),
            path: raw.health_check_path,
        };
        let proxy_timeout = Duration::from_secs(raw.proxy_timeout_secs);

        for (key, value) in [
            ("health_check_interval_secs", health_check.interval),
            ("health_check_timeout_secs", health_check.timeout),
            ("proxy_timeout_secs", proxy_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Message(format!(
                    "{} must be greater than zero",
                    key
                )));
            }
        }

        Ok(Self {
            listen_addr,
            backends: raw.backends,
            health_check,
            proxy_timeout,
            shutdown_grace_period: Duration::from_secs(raw.shutdown_grace_period_secs),
        })
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("listen_addr", "127.0.0.1:8000")?
        .set_default(
            "backends",
            vec![
                default_backend(8001),
                default_backend(8002),
                default_backend(8003),
            ],
        )?
        .set_default("health_check_interval_secs", 10)?
        .set_default("health_check_timeout_secs", 5)?
        .set_default("health_check_path", "/health")?
        .set_default("proxy_timeout_secs", 30)?
        .set_default("shutdown_grace_period_secs", 10)
}

fn default_backend(port: u16) -> config::Map<String, config::Value> {
    let mut backend = config::Map::new();
    backend.insert("host".to_string(), "localhost".into());
    backend.insert("port".to_string(), i64::from(port).into());
    backend
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.listen_addr, "127.0.0.1:8000".parse().unwrap());
        assert_eq!(
            settings.backends,
            vec![
                BackendAddr::new("localhost", 8001),
                BackendAddr::new("localhost", 8002),
                BackendAddr::new("localhost", 8003),
            ]
        );
        assert_eq!(settings.health_check, HealthCheckSettings::default());
        assert_eq!(settings.proxy_timeout, Duration::from_secs(30));
    }

    #[test]
    fn file_values_override_defaults() {
        let settings = Settings::from_toml(
            r#"
            listen_addr = "0.0.0.0:9000"
            health_check_interval_secs = 3
            health_check_path = "/livez"

            [[backends]]
            host = "10.0.0.5"
            port = 80
            "#,
        )
        .unwrap();

        assert_eq!(settings.listen_addr.port(), 9000);
        assert_eq!(settings.backends, vec![BackendAddr::new("10.0.0.5", 80)]);
        assert_eq!(settings.health_check.interval, Duration::from_secs(3));
        assert_eq!(settings.health_check.timeout, Duration::from_secs(5));
        assert_eq!(settings.health_check.path, "/livez");
    }

    #[test]
    fn empty_backend_list_is_fatal() {
        let err = Settings::from_toml("backends = []").unwrap_err();
        assert!(err.to_string().contains("at least one backend"));
    }

    #[test]
    fn zero_intervals_and_timeouts_are_fatal() {
        for key in [
            "health_check_interval_secs",
            "health_check_timeout_secs",
            "proxy_timeout_secs",
        ] {
            let err = Settings::from_toml(&format!("{} = 0", key)).unwrap_err();
            assert!(err.to_string().contains(key), "{}: {}", key, err);
        }
    }

    #[test]
    fn bad_listen_address_is_fatal() {
        assert!(Settings::from_toml(r#"listen_addr = "nowhere""#).is_err());
    }
}
