//! Rate-limit policies and the role table.
//!
//! A [`Policy`] admits at most `max_count` requests per `interval`. The
//! per-role policies are fixed at compile time; [`role_limit`] is an
//! exhaustive match, so adding a [`Role`] variant without a limit does not
//! compile.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use classroom_core::Role;
use thiserror::Error;

/// Length of every role window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Whether denials are enforced or only reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Evaluate and log, but always admit.
    DryRun,
    #[default]
    Live,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::DryRun => "DRY_RUN",
            Mode::Live => "LIVE",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "LIVE" => Ok(Mode::Live),
            "DRY_RUN" | "DRYRUN" => Ok(Mode::DryRun),
            other => Err(PolicyError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("policy interval must be greater than zero")]
    ZeroInterval,
    #[error("policy max_count must be greater than zero")]
    ZeroMaxCount,
    #[error("unknown admission mode: {0}")]
    UnknownMode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Policy {
    mode: Mode,
    interval: Duration,
    max_count: NonZeroU32,
}

impl Policy {
    pub fn new(mode: Mode, interval: Duration, max_count: u32) -> Result<Self, PolicyError> {
        if interval.is_zero() {
            return Err(PolicyError::ZeroInterval);
        }
        let max_count = NonZeroU32::new(max_count).ok_or(PolicyError::ZeroMaxCount)?;

        Ok(Self {
            mode,
            interval,
            max_count,
        })
    }

    /// The policy applied to a caller with the given role.
    pub fn for_role(role: Role, mode: Mode) -> Self {
        Self {
            mode,
            interval: WINDOW,
            max_count: role_limit(role).max_count,
        }
    }

    /// The fixed policy applied before identity is known.
    pub fn guest(mode: Mode) -> Self {
        Self::for_role(Role::Guest, mode)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_count(&self) -> NonZeroU32 {
        self.max_count
    }
}

/// Request budget and refusal message for one role.
#[derive(Debug, PartialEq, Eq)]
pub struct RoleLimit {
    pub max_count: NonZeroU32,
    pub message: &'static str,
}

const fn per_minute(n: u32) -> NonZeroU32 {
    match NonZeroU32::new(n) {
        Some(n) => n,
        None => panic!("role limit must be non-zero"),
    }
}

static ADMIN_LIMIT: RoleLimit = RoleLimit {
    max_count: per_minute(20),
    message: "Admin request limit exceeded (20 per minute). Slow Down",
};

static USER_LIMIT: RoleLimit = RoleLimit {
    max_count: per_minute(10),
    message: "User request limit exceeded (10 per minute). Please Wait",
};

static GUEST_LIMIT: RoleLimit = RoleLimit {
    max_count: per_minute(5),
    message: "Guest request limit exceeded (5 per minute). Please sign up for higher limits",
};

pub fn role_limit(role: Role) -> &'static RoleLimit {
    match role {
        Role::Admin => &ADMIN_LIMIT,
        Role::Teacher | Role::Student => &USER_LIMIT,
        Role::Guest => &GUEST_LIMIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_table() {
        assert_eq!(role_limit(Role::Admin).max_count.get(), 20);
        assert_eq!(role_limit(Role::Teacher).max_count.get(), 10);
        assert_eq!(role_limit(Role::Student).max_count.get(), 10);
        assert_eq!(role_limit(Role::Guest).max_count.get(), 5);
    }

    #[test]
    fn test_role_messages() {
        assert_eq!(
            role_limit(Role::Admin).message,
            "Admin request limit exceeded (20 per minute). Slow Down"
        );
        assert_eq!(role_limit(Role::Teacher).message, role_limit(Role::Student).message);
        assert!(role_limit(Role::Guest).message.starts_with("Guest request limit exceeded"));
    }

    #[test]
    fn test_unknown_role_name_gets_guest_policy() {
        let policy = Policy::for_role(Role::from_name(Some("principal")), Mode::Live);
        assert_eq!(policy, Policy::guest(Mode::Live));
        assert_eq!(policy.max_count().get(), 5);
    }

    #[test]
    fn test_for_role_uses_one_minute_window() {
        for role in Role::ALL {
            assert_eq!(Policy::for_role(role, Mode::Live).interval(), WINDOW);
        }
    }

    #[test]
    fn test_new_rejects_zero_values() {
        assert_eq!(
            Policy::new(Mode::Live, Duration::ZERO, 5),
            Err(PolicyError::ZeroInterval)
        );
        assert_eq!(
            Policy::new(Mode::Live, Duration::from_secs(1), 0),
            Err(PolicyError::ZeroMaxCount)
        );
        assert!(Policy::new(Mode::DryRun, Duration::from_millis(10), 1).is_ok());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("LIVE".parse::<Mode>().unwrap(), Mode::Live);
        assert_eq!("dry_run".parse::<Mode>().unwrap(), Mode::DryRun);
        assert_eq!("dry-run".parse::<Mode>().unwrap(), Mode::DryRun);
        assert!("shadow".parse::<Mode>().is_err());
    }
}
