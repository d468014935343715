//! Admission gate configuration.
//!
//! # Environment Variables
//!
//! - `ADMISSION_MODE`: `LIVE` (default) or `DRY_RUN`
//! - `ADMISSION_TIMEOUT_MS`: decision timeout in milliseconds (default 500)
//! - `ADMISSION_FAILURE_MODE`: `closed` (default) refuses with 500 when the
//!   decision service fails or times out, `open` admits the request
//! - `ADMISSION_BOT_DETECTION`, `ADMISSION_SHIELD`: detector toggles (default on)
//! - `TRUST_PROXY_HEADERS`: derive the client IP from `x-forwarded-for` /
//!   `x-real-ip` (default off)
//!
//! Both gates are bypassed when `APP_ENV=test`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use classroom_admission::{Detectors, LocalDecisionService, Mode};

use crate::env::{ConfigError, Environment, Lookup, ProcessEnv, flag, parsed};

/// What a gate does when the decision service errors or times out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// Refuse with 500.
    #[default]
    Closed,
    /// Admit and log.
    Open,
}

impl FromStr for FailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "closed" | "fail-closed" => Ok(FailureMode::Closed),
            "open" | "fail-open" => Ok(FailureMode::Open),
            other => Err(format!("unknown failure mode {other}")),
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureMode::Closed => "closed",
            FailureMode::Open => "open",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityConfig {
    /// Disables both admission gates. Only ever set for `APP_ENV=test`.
    pub bypass: bool,
    pub mode: Mode,
    pub decision_timeout: Duration,
    pub failure_mode: FailureMode,
    pub detectors: Detectors,
    pub trust_proxy_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            bypass: false,
            mode: Mode::Live,
            decision_timeout: Duration::from_millis(500),
            failure_mode: FailureMode::Closed,
            detectors: Detectors::default(),
            trust_proxy_headers: false,
        }
    }
}

impl SecurityConfig {
    pub fn from_env(environment: Environment) -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv, environment)
    }

    pub fn from_lookup(lookup: &impl Lookup, environment: Environment) -> Result<Self, ConfigError> {
        let timeout_ms: u64 = parsed(lookup, "ADMISSION_TIMEOUT_MS", 500)?;
        if timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "ADMISSION_TIMEOUT_MS",
                "0",
                "must be greater than zero",
            ));
        }

        Ok(Self {
            bypass: environment == Environment::Test,
            mode: parsed(lookup, "ADMISSION_MODE", Mode::Live)?,
            decision_timeout: Duration::from_millis(timeout_ms),
            failure_mode: parsed(lookup, "ADMISSION_FAILURE_MODE", FailureMode::Closed)?,
            detectors: Detectors {
                bot: flag(lookup, "ADMISSION_BOT_DETECTION", true)?,
                shield: flag(lookup, "ADMISSION_SHIELD", true)?,
            },
            trust_proxy_headers: flag(lookup, "TRUST_PROXY_HEADERS", false)?,
        })
    }

    /// Builds the in-process decision service for these settings.
    #[must_use]
    pub fn local_decision_service(&self) -> LocalDecisionService {
        LocalDecisionService::new(self.detectors)
    }
}
