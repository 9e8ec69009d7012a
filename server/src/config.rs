use regatta_shared::config::{ConfigError, EnvironmentConfig};
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub tick_rate_hz: u32,
    /// Extra ports tried, one after another, when the listen port is taken
    pub port_retry_attempts: u16,
    pub max_connections: usize,
    pub log_level: String,
    pub rng_seed: u64,
    pub environment: EnvironmentConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            tick_rate_hz: 20,
            port_retry_attempts: 10,
            max_connections: 64,
            log_level: "info".to_string(),
            rng_seed: 42,
            environment: EnvironmentConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerConfigError {
    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },

    #[error("{0}")]
    OutOfRange(&'static str),

    #[error("Invalid environment config: {0}")]
    Environment(#[from] ConfigError),
}

impl ServerConfig {
    /// Defaults overridden by `PORT`, `REGATTA_LISTEN_ADDR`, `REGATTA_TICK_HZ`
    /// and `LOG_LEVEL`.
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ServerConfigError> {
        let mut config = Self::default();

        // Hosting platforms hand out PORT; it wins over an explicit address
        if let Some(port) = lookup("PORT") {
            let port: u16 = port.parse().map_err(|_| ServerConfigError::InvalidVar {
                var: "PORT",
                value: port.clone(),
            })?;
            config.listen_addr = format!("0.0.0.0:{}", port);
        } else if let Some(addr) = lookup("REGATTA_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(hz) = lookup("REGATTA_TICK_HZ") {
            config.tick_rate_hz = hz.parse().map_err(|_| ServerConfigError::InvalidVar {
                var: "REGATTA_TICK_HZ",
                value: hz.clone(),
            })?;
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ServerConfigError> {
        self.listen_addr
            .parse::<SocketAddr>()
            .map_err(|_| ServerConfigError::InvalidAddress(self.listen_addr.clone()))?;
        if !(1..=1000).contains(&self.tick_rate_hz) {
            return Err(ServerConfigError::OutOfRange(
                "tick_rate_hz must be between 1 and 1000",
            ));
        }
        if self.max_connections == 0 {
            return Err(ServerConfigError::OutOfRange("max_connections must be > 0"));
        }
        self.environment.validate()?;
        Ok(())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid_and_ticks_at_20hz() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_duration(), Duration::from_millis(50));
    }

    #[test]
    fn port_var_overrides_listen_addr() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "8123"),
            ("REGATTA_LISTEN_ADDR", "127.0.0.1:9000"),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8123");
    }

    #[test]
    fn listen_addr_var_used_without_port() {
        let config =
            ServerConfig::from_lookup(lookup(&[("REGATTA_LISTEN_ADDR", "127.0.0.1:9000")]))
                .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    fn bad_tick_rate_is_rejected() {
        assert!(ServerConfig::from_lookup(lookup(&[("REGATTA_TICK_HZ", "fast")])).is_err());
        let config = ServerConfig {
            tick_rate_hz: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_address_is_rejected() {
        let config = ServerConfig {
            listen_addr: "nowhere".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ServerConfigError::InvalidAddress(_))
        ));
    }

    #[test]
    fn invalid_environment_is_rejected() {
        let mut config = ServerConfig::default();
        config.environment.wind_speed = 99.0;
        assert!(matches!(
            config.validate(),
            Err(ServerConfigError::Environment(_))
        ));
    }
}
