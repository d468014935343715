//! # Classroom Config
//!
//! Configuration types for the classroom API, loaded from environment
//! variables:
//!
//! - [`cors`]: allowed origin (`FRONTEND_URL`, required)
//! - [`database`]: PostgreSQL connection settings (`DATABASE_URL`, required)
//! - [`jwt`]: token signing secret and lifetime
//! - [`security`]: admission gate settings
//! - [`server`]: environment and listen ports
//!
//! Loading fails with a [`ConfigError`] instead of falling back silently
//! when a required value is missing or a value does not parse.
//!
//! # Example
//!
//! ```ignore
//! use classroom_config::AppConfig;
//!
//! let config = AppConfig::from_env()?;
//! println!("listening on {}", config.server.port);
//! ```

pub mod cors;
pub mod database;
pub mod env;
pub mod jwt;
pub mod security;
pub mod server;

pub use cors::CorsConfig;
pub use database::DatabaseConfig;
pub use env::{ConfigError, Environment, Lookup, ProcessEnv};
pub use jwt::JwtConfig;
pub use security::{FailureMode, SecurityConfig};
pub use server::ServerConfig;

/// Every configuration section, loaded together at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let server = ServerConfig::from_lookup(lookup)?;
        let environment = server.environment;

        Ok(Self {
            cors: CorsConfig::from_lookup(lookup)?,
            database: DatabaseConfig::from_lookup(lookup)?,
            jwt: JwtConfig::from_lookup(lookup, environment)?,
            security: SecurityConfig::from_lookup(lookup, environment)?,
            server,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_load_all_sections() {
        let env = HashMap::from([
            ("FRONTEND_URL", "https://classroom.example.com"),
            ("APP_ENV", "test"),
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/classroom_test"),
        ]);
        let config = AppConfig::from_lookup(&env).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cors.allowed_origin, "https://classroom.example.com");
        assert!(config.security.bypass);
    }

    #[test]
    fn test_missing_origin_fails_fast() {
        let env = HashMap::from([("APP_ENV", "production"), ("JWT_SECRET", "x")]);
        assert_eq!(
            AppConfig::from_lookup(&env).unwrap_err(),
            ConfigError::Missing("FRONTEND_URL")
        );
    }
}
