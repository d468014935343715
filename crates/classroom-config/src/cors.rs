use crate::env::{ConfigError, Lookup, ProcessEnv, required};

/// CORS settings. The single allowed origin comes from `FRONTEND_URL`, which
/// is required: the server refuses to start without it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorsConfig {
    pub allowed_origin: String,
}

impl CorsConfig {
    pub fn new(allowed_origin: impl Into<String>) -> Self {
        Self {
            allowed_origin: allowed_origin.into(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let raw = required(lookup, "FRONTEND_URL")?;
        let origin = raw.trim_end_matches('/');

        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "FRONTEND_URL",
                &raw,
                "origin must start with http:// or https://",
            ));
        }

        Ok(Self::new(origin))
    }
}
