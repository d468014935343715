use crate::env::{ConfigError, Environment, Lookup, ProcessEnv, parsed};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub environment: Environment,
    pub port: u16,
    pub metrics_port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let config = Self {
            environment: Environment::from_lookup(lookup)?,
            port: parsed(lookup, "PORT", 8000)?,
            metrics_port: parsed(lookup, "METRICS_PORT", 9100)?,
        };

        if config.port == config.metrics_port {
            return Err(ConfigError::invalid(
                "METRICS_PORT",
                &config.metrics_port.to_string(),
                "must differ from PORT",
            ));
        }

        Ok(config)
    }
}
