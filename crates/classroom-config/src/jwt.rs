use crate::env::{ConfigError, Environment, Lookup, ProcessEnv, parsed, var};

const DEV_SECRET: &str = "classroom-dev-secret-change-me-in-production";
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in seconds.
    pub access_token_expiry: i64,
}

impl JwtConfig {
    pub fn from_env(environment: Environment) -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv, environment)
    }

    pub fn from_lookup(lookup: &impl Lookup, environment: Environment) -> Result<Self, ConfigError> {
        let secret = match (var(lookup, "JWT_SECRET"), environment) {
            (Some(secret), Environment::Production) if secret.len() < MIN_PRODUCTION_SECRET_LEN => {
                return Err(ConfigError::invalid(
                    "JWT_SECRET",
                    "<redacted>",
                    format!("must be at least {MIN_PRODUCTION_SECRET_LEN} characters in production"),
                ));
            }
            (Some(secret), _) => secret,
            (None, Environment::Production) => return Err(ConfigError::Missing("JWT_SECRET")),
            (None, _) => DEV_SECRET.to_string(),
        };

        let access_token_expiry = parsed(lookup, "JWT_ACCESS_EXPIRY", 604_800)?; // 7 days
        if access_token_expiry <= 0 {
            return Err(ConfigError::invalid(
                "JWT_ACCESS_EXPIRY",
                &access_token_expiry.to_string(),
                "must be positive",
            ));
        }

        Ok(Self {
            secret,
            access_token_expiry,
        })
    }
}
