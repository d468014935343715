//! In-process decision service.
//!
//! Screens with the shield and bot detectors first, then charges the request
//! against a sliding log of admission times kept per `(window, key)`. A key
//! is admitted only while fewer than `max_count` of its admissions fall
//! inside the trailing `interval`, so no span of `interval` ever holds more
//! than `max_count` admissions.

use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::bot;
use crate::decision::{DecisionError, DecisionService, RequestDetails};
use crate::policy::{Mode, Policy};
use crate::shield;
use crate::verdict::{DenyReason, Verdict};

/// Which screening rules run before rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detectors {
    pub bot: bool,
    pub shield: bool,
}

impl Default for Detectors {
    fn default() -> Self {
        Self {
            bot: true,
            shield: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Window {
    interval: Duration,
    max_count: NonZeroU32,
}

impl Window {
    fn of(policy: &Policy) -> Self {
        Self {
            interval: policy.interval(),
            max_count: policy.max_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LogKey {
    window: Window,
    key: String,
}

/// Admission times of one key inside its window, oldest first.
#[derive(Debug, Default)]
struct Admissions(VecDeque<Instant>);

impl Admissions {
    fn expire(&mut self, interval: Duration, now: Instant) {
        while self
            .0
            .front()
            .is_some_and(|&at| now.saturating_duration_since(at) >= interval)
        {
            self.0.pop_front();
        }
    }

    fn try_admit(&mut self, window: Window, now: Instant) -> bool {
        self.expire(window.interval, now);
        if self.0.len() >= window.max_count.get() as usize {
            return false;
        }
        self.0.push_back(now);
        true
    }
}

#[derive(Default)]
pub struct LocalDecisionService {
    detectors: Detectors,
    admissions: DashMap<LogKey, Admissions>,
}

impl LocalDecisionService {
    pub fn new(detectors: Detectors) -> Self {
        Self {
            detectors,
            admissions: DashMap::new(),
        }
    }

    pub fn detectors(&self) -> Detectors {
        self.detectors
    }

    /// Records an admission for `key` unless its window is full. The entry's
    /// shard lock is held across the check and the insert.
    fn try_admit(&self, policy: &Policy, key: String, now: Instant) -> bool {
        let window = Window::of(policy);
        self.admissions
            .entry(LogKey { window, key })
            .or_default()
            .try_admit(window, now)
    }

    fn decide(&self, policy: &Policy, request: &RequestDetails, now: Instant) -> Verdict {
        if self.detectors.shield && shield::is_suspicious(&request.path, request.query.as_deref()) {
            return Verdict::Deny(DenyReason::Shield);
        }
        if self.detectors.bot && bot::is_automated(request.user_agent.as_deref()) {
            return Verdict::Deny(DenyReason::Bot);
        }

        if self.try_admit(policy, request.rate_limit_key(), now) {
            Verdict::Allow
        } else {
            Verdict::Deny(DenyReason::RateLimit)
        }
    }

    /// Drops keys with no admission left inside their window.
    pub fn prune(&self) {
        self.prune_at(Instant::now());
    }

    fn prune_at(&self, now: Instant) {
        self.admissions.retain(|log_key, admissions| {
            admissions.expire(log_key.window.interval, now);
            !admissions.0.is_empty()
        });
        self.admissions.shrink_to_fit();
    }

    /// Number of keys currently tracked across all windows.
    pub fn tracked_keys(&self) -> usize {
        self.admissions.len()
    }
}

#[async_trait]
impl DecisionService for LocalDecisionService {
    async fn evaluate(
        &self,
        policy: &Policy,
        request: &RequestDetails,
    ) -> Result<Verdict, DecisionError> {
        let verdict = self.decide(policy, request, Instant::now());

        if let Verdict::Deny(reason) = verdict
            && policy.mode() == Mode::DryRun
        {
            warn!(
                reason = %reason,
                key = %request.rate_limit_key(),
                path = %request.path,
                "Dry run: request would have been denied"
            );
            return Ok(Verdict::Allow);
        }

        debug!(
            verdict = %verdict.reason_label(),
            max_count = policy.max_count().get(),
            key = %request.rate_limit_key(),
            "Admission decision"
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROWSER: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 Safari/605.1.15";

    fn browser_request(ip: &str) -> RequestDetails {
        RequestDetails {
            client_ip: Some(ip.parse().unwrap()),
            method: "GET".to_string(),
            path: "/".to_string(),
            user_agent: Some(BROWSER.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_guest_budget_is_five_per_minute() {
        let service = LocalDecisionService::default();
        let policy = Policy::guest(Mode::Live);
        let request = browser_request("198.51.100.7");

        for _ in 0..5 {
            let verdict = service.evaluate(&policy, &request).await.unwrap();
            assert_eq!(verdict, Verdict::Allow);
        }
        let verdict = service.evaluate(&policy, &request).await.unwrap();
        assert_eq!(verdict, Verdict::Deny(DenyReason::RateLimit));
    }

    #[tokio::test]
    async fn test_separate_ips_have_separate_budgets() {
        let service = LocalDecisionService::default();
        let policy = Policy::new(Mode::Live, Duration::from_secs(60), 1).unwrap();

        let first = browser_request("10.0.0.1");
        let second = browser_request("10.0.0.2");

        assert!(service.evaluate(&policy, &first).await.unwrap().is_allowed());
        assert!(service.evaluate(&policy, &first).await.unwrap().is_denied());
        assert!(service.evaluate(&policy, &second).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_subject_budget_is_independent_of_ip() {
        let service = LocalDecisionService::default();
        let policy = Policy::new(Mode::Live, Duration::from_secs(60), 1).unwrap();

        let mut alice = browser_request("10.0.0.9");
        alice.subject = Some("alice".to_string());
        let mut bob = browser_request("10.0.0.9");
        bob.subject = Some("bob".to_string());

        assert!(service.evaluate(&policy, &alice).await.unwrap().is_allowed());
        assert!(service.evaluate(&policy, &bob).await.unwrap().is_allowed());
        assert!(service.evaluate(&policy, &alice).await.unwrap().is_denied());
    }

    #[tokio::test]
    async fn test_bot_denied_without_consuming_budget() {
        let service = LocalDecisionService::default();
        let policy = Policy::new(Mode::Live, Duration::from_secs(60), 1).unwrap();

        let mut scripted = browser_request("10.1.1.1");
        scripted.user_agent = Some("curl/8.5.0".to_string());
        let verdict = service.evaluate(&policy, &scripted).await.unwrap();
        assert_eq!(verdict, Verdict::Deny(DenyReason::Bot));

        let browser = browser_request("10.1.1.1");
        assert!(service.evaluate(&policy, &browser).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_shield_checked_before_bot() {
        let service = LocalDecisionService::default();
        let policy = Policy::guest(Mode::Live);

        let mut request = browser_request("10.2.2.2");
        request.user_agent = None;
        request.query = Some("q=../../etc/passwd".to_string());

        let verdict = service.evaluate(&policy, &request).await.unwrap();
        assert_eq!(verdict, Verdict::Deny(DenyReason::Shield));
    }

    #[tokio::test]
    async fn test_disabled_detectors_skip_screening() {
        let service = LocalDecisionService::new(Detectors {
            bot: false,
            shield: false,
        });
        let policy = Policy::guest(Mode::Live);

        let mut request = browser_request("10.3.3.3");
        request.user_agent = Some("curl/8.5.0".to_string());
        request.path = "/api/../etc/passwd".to_string();

        assert!(service.evaluate(&policy, &request).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_dry_run_never_denies() {
        let service = LocalDecisionService::default();
        let policy = Policy::new(Mode::DryRun, Duration::from_secs(60), 1).unwrap();
        let request = browser_request("10.4.4.4");

        for _ in 0..3 {
            assert!(service.evaluate(&policy, &request).await.unwrap().is_allowed());
        }

        let mut bot = request.clone();
        bot.user_agent = None;
        assert!(service.evaluate(&policy, &bot).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_policies_with_same_window_share_a_log() {
        let service = LocalDecisionService::default();
        let request = browser_request("10.5.5.5");

        service
            .evaluate(&Policy::guest(Mode::Live), &request)
            .await
            .unwrap();
        service
            .evaluate(&Policy::guest(Mode::DryRun), &request)
            .await
            .unwrap();

        assert_eq!(service.tracked_keys(), 1);
    }

    fn admitted_at(service: &LocalDecisionService, policy: &Policy, ip: &str, at: Instant) -> bool {
        service
            .decide(policy, &browser_request(ip), at)
            .is_allowed()
    }

    #[test]
    fn test_spread_requests_still_refused_at_max_count_plus_one() {
        let service = LocalDecisionService::default();
        let policy = Policy::new(Mode::Live, Duration::from_secs(1), 5).unwrap();
        let start = Instant::now();
        let at = |ms: u64| start + Duration::from_millis(ms);

        for step in 0..5 {
            assert!(admitted_at(&service, &policy, "10.6.6.6", at(step * 150)));
        }
        assert!(!admitted_at(&service, &policy, "10.6.6.6", at(650)));
        assert!(!admitted_at(&service, &policy, "10.6.6.6", at(999)));

        // Only the admission at 0ms has left the window.
        assert!(admitted_at(&service, &policy, "10.6.6.6", at(1000)));
        assert!(!admitted_at(&service, &policy, "10.6.6.6", at(1100)));
        assert!(admitted_at(&service, &policy, "10.6.6.6", at(1150)));
    }

    #[test]
    fn test_no_interval_span_exceeds_max_count() {
        let service = LocalDecisionService::default();
        let policy = Policy::new(Mode::Live, Duration::from_secs(1), 5).unwrap();
        let start = Instant::now();

        let burst = (0..5)
            .filter(|_| admitted_at(&service, &policy, "10.7.7.7", start))
            .count();
        let later = start + Duration::from_millis(450);
        let after_pause = (0..5)
            .filter(|_| admitted_at(&service, &policy, "10.7.7.7", later))
            .count();

        assert_eq!(burst, 5);
        assert_eq!(after_pause, 0);
    }

    #[test]
    fn test_guest_sixth_request_within_a_minute_is_refused() {
        let service = LocalDecisionService::default();
        let policy = Policy::guest(Mode::Live);
        let start = Instant::now();

        for step in 0..5 {
            let at = start + Duration::from_secs(step * 12);
            assert!(admitted_at(&service, &policy, "10.8.8.8", at));
        }
        assert!(!admitted_at(&service, &policy, "10.8.8.8", start + Duration::from_secs(59)));
        assert!(admitted_at(&service, &policy, "10.8.8.8", start + Duration::from_secs(60)));
    }

    #[test]
    fn test_prune_drops_expired_keys() {
        let service = LocalDecisionService::default();
        let policy = Policy::new(Mode::Live, Duration::from_secs(1), 2).unwrap();
        let start = Instant::now();

        assert!(admitted_at(&service, &policy, "10.9.9.1", start));
        assert!(admitted_at(&service, &policy, "10.9.9.2", start + Duration::from_millis(800)));

        service.prune_at(start + Duration::from_millis(1200));
        assert_eq!(service.tracked_keys(), 1);

        service.prune_at(start + Duration::from_secs(2));
        assert_eq!(service.tracked_keys(), 0);
    }
}
