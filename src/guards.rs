//! Pre-flight guards for sensitive storefront actions.
//!
//! The sign-in, order-submission, and contact flows each check their guard
//! before attempting the operation. A check consumes quota and returns a
//! decision carrying everything the caller needs for the user-facing
//! denial message.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::config::FloodgateConfig;
use crate::ratelimit::FixedWindowLimiter;
use crate::sweep::{Sweeper, SweeperHandle};

/// Outcome of a rate limit check.
///
/// `remaining` and `reset_at_ms` are read after the admission decision, so
/// they reflect the post-admission (or post-denial) window state. At the
/// moment of denial `remaining` is always 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Attempts left in the current window
    pub remaining: u32,
    /// End of the current window, if one is active (epoch milliseconds)
    pub reset_at_ms: Option<u64>,
}

impl RateLimitDecision {
    /// The window end as local wall-clock time.
    pub fn retry_at(&self) -> Option<DateTime<Local>> {
        self.reset_at_ms
            .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
            .map(|utc| utc.with_timezone(&Local))
    }

    /// A user-facing denial message, or `None` if the request was allowed.
    pub fn denial_message(&self) -> Option<String> {
        if self.allowed {
            return None;
        }

        let retry = match self.retry_at() {
            Some(at) => format!("after {}", at.format("%H:%M:%S")),
            None => "later".to_string(),
        };

        Some(format!(
            "Too many attempts. Please try again {}. Remaining attempts: {}",
            retry, self.remaining
        ))
    }
}

/// The storefront's pre-configured limiter instances.
///
/// Construct once at process start and share; each guarded flow calls its
/// `check_*` helper with the submitter's identifier (an email address or
/// user id) before attempting the operation.
pub struct Guards {
    auth: Arc<FixedWindowLimiter>,
    order: Arc<FixedWindowLimiter>,
    contact: Arc<FixedWindowLimiter>,
    sweep_period: Duration,
}

impl Guards {
    /// Build guards with the production quotas.
    pub fn new() -> Self {
        Self::from_config(&FloodgateConfig::default())
    }

    /// Build guards from configuration.
    pub fn from_config(config: &FloodgateConfig) -> Self {
        Self {
            auth: Arc::new(FixedWindowLimiter::new(config.auth.settings())),
            order: Arc::new(FixedWindowLimiter::new(config.order.settings())),
            contact: Arc::new(FixedWindowLimiter::new(config.contact.settings())),
            sweep_period: Duration::from_millis(config.sweep_interval_ms),
        }
    }

    /// Check and consume quota for a sign-in or sign-up attempt.
    pub fn check_auth_rate_limit(&self, identifier: &str) -> RateLimitDecision {
        check(&self.auth, identifier)
    }

    /// Check and consume quota for an order submission.
    pub fn check_order_rate_limit(&self, identifier: &str) -> RateLimitDecision {
        check(&self.order, identifier)
    }

    /// Check and consume quota for a contact form submission.
    pub fn check_contact_rate_limit(&self, identifier: &str) -> RateLimitDecision {
        check(&self.contact, identifier)
    }

    /// The auth limiter, for quota introspection without consuming it.
    pub fn auth(&self) -> &FixedWindowLimiter {
        &self.auth
    }

    /// The order limiter.
    pub fn order(&self) -> &FixedWindowLimiter {
        &self.order
    }

    /// The contact limiter.
    pub fn contact(&self) -> &FixedWindowLimiter {
        &self.contact
    }

    /// Start the background sweep over all three limiters.
    ///
    /// Call once at process start; hold the handle and shut it down when the
    /// process stops.
    pub fn start_sweeper(&self) -> SweeperHandle {
        Sweeper::new(self.sweep_period)
            .register(Arc::clone(&self.auth))
            .register(Arc::clone(&self.order))
            .register(Arc::clone(&self.contact))
            .spawn()
    }
}

impl Default for Guards {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate admission first, then read the post-decision window state
/// against the same key.
fn check(limiter: &FixedWindowLimiter, identifier: &str) -> RateLimitDecision {
    let allowed = limiter.is_allowed(identifier);
    let remaining = limiter.remaining_requests(identifier);
    let reset_at_ms = limiter.reset_time(identifier);

    RateLimitDecision {
        allowed,
        remaining,
        reset_at_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimiterProfile;

    fn tight_config() -> FloodgateConfig {
        FloodgateConfig {
            auth: LimiterProfile {
                max_requests: 2,
                window_ms: 60_000,
                key_prefix: "auth".to_string(),
            },
            order: LimiterProfile {
                max_requests: 2,
                window_ms: 60_000,
                key_prefix: "order".to_string(),
            },
            contact: LimiterProfile {
                max_requests: 1,
                window_ms: 60_000,
                key_prefix: "contact".to_string(),
            },
            sweep_interval_ms: 300_000,
        }
    }

    #[test]
    fn test_first_check_reports_post_admission_state() {
        let guards = Guards::new();

        let decision = guards.check_auth_rate_limit("a@x.com");

        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);
        assert!(decision.reset_at_ms.is_some());
        assert!(decision.retry_at().is_some());
        assert_eq!(decision.denial_message(), None);
    }

    #[test]
    fn test_denial_carries_reset_time_and_zero_remaining() {
        let guards = Guards::from_config(&tight_config());

        assert!(guards.check_auth_rate_limit("a@x.com").allowed);
        assert!(guards.check_auth_rate_limit("a@x.com").allowed);

        let denied = guards.check_auth_rate_limit("a@x.com");
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.reset_at_ms.is_some());

        let message = denied.denial_message().unwrap();
        assert!(message.contains("Remaining attempts: 0"));
        assert!(message.contains("try again after"));
    }

    #[test]
    fn test_flows_are_throttled_independently() {
        let guards = Guards::from_config(&tight_config());

        for _ in 0..2 {
            assert!(guards.check_auth_rate_limit("a@x.com").allowed);
        }
        assert!(!guards.check_auth_rate_limit("a@x.com").allowed);

        // Exhausting the auth quota leaves the other flows untouched, even
        // for the same identifier.
        let order = guards.check_order_rate_limit("a@x.com");
        assert!(order.allowed);
        assert_eq!(order.remaining, 1);

        let contact = guards.check_contact_rate_limit("a@x.com");
        assert!(contact.allowed);
        assert_eq!(contact.remaining, 0);
    }

    #[test]
    fn test_decision_without_active_window_has_no_retry_time() {
        let decision = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at_ms: None,
        };

        assert_eq!(decision.retry_at(), None);
        let message = decision.denial_message().unwrap();
        assert!(message.contains("try again later"));
    }

    #[tokio::test]
    async fn test_guards_sweeper_lifecycle() {
        let mut config = tight_config();
        config.sweep_interval_ms = 10;
        config.auth.window_ms = 1;
        let guards = Guards::from_config(&config);

        assert!(guards.check_auth_rate_limit("a@x.com").allowed);
        assert!(guards.check_order_rate_limit("b@x.com").allowed);
        assert_eq!(guards.auth().entry_count(), 1);

        let handle = guards.start_sweeper();
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.shutdown().await;

        // The expired auth entry was reclaimed; the active order window
        // survived the sweeps.
        assert_eq!(guards.auth().entry_count(), 0);
        assert_eq!(guards.order().entry_count(), 1);
    }
}
