//! Pre-auth and post-auth admission gates.
//!
//! The pre-auth gate evaluates the guest policy against the client IP for
//! every request without a verified identity, including requests whose
//! bearer token failed verification. Requests with a verified token are
//! handed on to the post-auth gate instead of being charged to the anonymous
//! bucket. The post-auth gate evaluates the caller's role policy against
//! their user id; anonymous requests pass it untouched.
//!
//! Every decision call is bounded by `SecurityConfig::decision_timeout`. A
//! failed or timed out call is answered according to `FailureMode`.

use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use classroom_admission::{DenyReason, Policy, RequestDetails, Verdict, role_limit};
use classroom_config::FailureMode;
use classroom_core::Role;

use crate::metrics::{track_admission_decision, track_admission_fault, track_admission_latency};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    PreAuth,
    PostAuth,
}

impl Gate {
    pub fn label(&self) -> &'static str {
        match self {
            Gate::PreAuth => "pre_auth",
            Gate::PostAuth => "post_auth",
        }
    }

    fn fault_message(&self) -> &'static str {
        match self {
            Gate::PreAuth => "Something went wrong with Pre-auth Security Middleware",
            Gate::PostAuth => "Something went wrong with Post-auth Security Middleware",
        }
    }

    /// Pre-auth rate-limit refusals are 403, post-auth ones 429.
    fn rate_limit_status(&self) -> StatusCode {
        match self {
            Gate::PreAuth => StatusCode::FORBIDDEN,
            Gate::PostAuth => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

/// Body of every gate refusal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Refusal {
    pub error: String,
    pub message: String,
}

impl Refusal {
    fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_owned(),
            message: message.to_owned(),
        }
    }

    pub fn denied(gate: Gate, reason: DenyReason, role: Role) -> (StatusCode, Self) {
        match reason {
            DenyReason::Bot => (
                StatusCode::FORBIDDEN,
                Self::new("Forbidden", "Automated requests are not allowed"),
            ),
            DenyReason::Shield => (
                StatusCode::FORBIDDEN,
                Self::new("Forbidden", "Request blocked by security policy"),
            ),
            DenyReason::RateLimit => (
                gate.rate_limit_status(),
                Self::new("Too many requests.", role_limit(role).message),
            ),
        }
    }

    pub fn fault(gate: Gate) -> (StatusCode, Self) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Self::new("Internal Error", gate.fault_message()),
        )
    }
}

fn refuse((status, body): (StatusCode, Refusal)) -> Response {
    (status, Json(body)).into_response()
}

pub async fn pre_auth_admission(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let security = &state.security_config;
    if security.bypass || req.extensions().get::<AuthUser>().is_some() {
        return next.run(req).await;
    }

    let policy = Policy::guest(security.mode);
    let details = request_details(&req, security.trust_proxy_headers, None);

    match admit(&state, Gate::PreAuth, &policy, &details, Role::Guest).await {
        Ok(()) => next.run(req).await,
        Err(refusal) => refusal,
    }
}

pub async fn post_auth_admission(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let security = &state.security_config;
    if security.bypass {
        return next.run(req).await;
    }

    let Some(user) = req.extensions().get::<AuthUser>() else {
        return next.run(req).await;
    };
    let role = user.role();
    let subject = user.subject().to_owned();

    let policy = Policy::for_role(role, security.mode);
    let details = request_details(&req, security.trust_proxy_headers, Some(subject));

    match admit(&state, Gate::PostAuth, &policy, &details, role).await {
        Ok(()) => next.run(req).await,
        Err(refusal) => refusal,
    }
}

async fn admit(
    state: &AppState,
    gate: Gate,
    policy: &Policy,
    details: &RequestDetails,
    role: Role,
) -> Result<(), Response> {
    let security = &state.security_config;
    let started = Instant::now();
    let evaluation = tokio::time::timeout(
        security.decision_timeout,
        state.decision.evaluate(policy, details),
    )
    .await;
    track_admission_latency(gate.label(), started.elapsed());

    match evaluation {
        Ok(Ok(verdict)) => {
            track_admission_decision(gate.label(), &verdict);
            match verdict {
                Verdict::Allow => Ok(()),
                Verdict::Deny(reason) => {
                    info!(
                        gate = gate.label(),
                        reason = %reason,
                        role = %role,
                        key = %details.rate_limit_key(),
                        path = %details.path,
                        "Request denied"
                    );
                    Err(refuse(Refusal::denied(gate, reason, role)))
                }
            }
        }
        Ok(Err(err)) => {
            error!(gate = gate.label(), error = %err, "Decision service failed");
            track_admission_fault(gate.label(), "error");
            on_failure(gate, security.failure_mode)
        }
        Err(_) => {
            error!(
                gate = gate.label(),
                timeout_ms = security.decision_timeout.as_millis() as u64,
                "Decision service timed out"
            );
            track_admission_fault(gate.label(), "timeout");
            on_failure(gate, security.failure_mode)
        }
    }
}

fn on_failure(gate: Gate, failure_mode: FailureMode) -> Result<(), Response> {
    match failure_mode {
        FailureMode::Closed => Err(refuse(Refusal::fault(gate))),
        FailureMode::Open => {
            warn!(gate = gate.label(), "Admitting request without a decision");
            Ok(())
        }
    }
}

/// Snapshot of the request handed to the decision service.
pub fn request_details(
    req: &Request,
    trust_proxy_headers: bool,
    subject: Option<String>,
) -> RequestDetails {
    let forwarded = trust_proxy_headers
        .then(|| forwarded_ip(req.headers()))
        .flatten();
    let client_ip = forwarded.or_else(|| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    });

    RequestDetails {
        client_ip,
        subject,
        method: req.method().to_string(),
        path: req.uri().path().to_owned(),
        query: req.uri().query().map(str::to_owned),
        user_agent: req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
    }
}

/// First address of `x-forwarded-for`, falling back to `x-real-ip`.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|ip| ip.trim().parse().ok())
    };

    header_ip("x-forwarded-for").or_else(|| header_ip("x-real-ip"))
}
