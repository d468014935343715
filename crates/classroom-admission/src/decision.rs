//! The decision service seam.
//!
//! Gates hand a [`Policy`] and a [`RequestDetails`] snapshot to a
//! [`DecisionService`] and act on the returned [`Verdict`]. The service owns
//! every counter; gates keep no state of their own.

use std::net::IpAddr;

use async_trait::async_trait;
use thiserror::Error;

use crate::policy::Policy;
use crate::verdict::Verdict;

/// The parts of a request a decision service may inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDetails {
    pub client_ip: Option<IpAddr>,
    /// Authenticated subject (user id), when identity is known.
    pub subject: Option<String>,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestDetails {
    /// Characteristic that rate-limit counters are keyed on.
    pub fn rate_limit_key(&self) -> String {
        match (&self.subject, self.client_ip) {
            (Some(subject), _) => format!("user:{subject}"),
            (None, Some(ip)) => format!("ip:{ip}"),
            (None, None) => "anonymous".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("decision service unavailable: {0}")]
    Unavailable(String),
    #[error("decision service rejected the request: {0}")]
    InvalidRequest(String),
}

#[async_trait]
pub trait DecisionService: Send + Sync {
    async fn evaluate(
        &self,
        policy: &Policy,
        request: &RequestDetails,
    ) -> Result<Verdict, DecisionError>;
}
