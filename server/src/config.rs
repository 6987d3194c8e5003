use crate::error::ConfigError;
use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub is_production: bool,
    /// Per-request upstream timeout. `None` leaves the transport default.
    pub upstream_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("RELAY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                name: "RELAY_BIND_ADDR",
                value: bind_addr.clone(),
            })?;

        let is_production = lookup("APP_ENV").as_deref() == Some("production");

        let upstream_timeout = match lookup("RELAY_UPSTREAM_TIMEOUT_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "RELAY_UPSTREAM_TIMEOUT_SECS",
                        value,
                    })
                }
            },
            None => None,
        };

        Ok(Self {
            bind_addr,
            is_production,
            upstream_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse().unwrap());
        assert!(!config.is_production);
        assert_eq!(config.upstream_timeout, None);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("RELAY_BIND_ADDR", "127.0.0.1:8080"),
            ("APP_ENV", "production"),
            ("RELAY_UPSTREAM_TIMEOUT_SECS", "15"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert!(config.is_production);
        assert_eq!(config.upstream_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config_from(&[("RELAY_BIND_ADDR", "localhost")]),
            Err(ConfigError::InvalidValue { name: "RELAY_BIND_ADDR", .. })
        ));
        for timeout in ["0", "soon", "-1"] {
            assert!(matches!(
                config_from(&[("RELAY_UPSTREAM_TIMEOUT_SECS", timeout)]),
                Err(ConfigError::InvalidValue { name: "RELAY_UPSTREAM_TIMEOUT_SECS", .. })
            ));
        }
    }
}
