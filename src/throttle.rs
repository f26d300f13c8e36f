//! Process-wide request throttling for remote lookups.
//!
//! This module provides the [`RateLimiter`] struct which enforces a minimum
//! interval between remote metadata lookups across every chat session. Unlike
//! a delaying limiter, a trigger that arrives too early is rejected outright
//! and told how long to wait, so the bot can answer immediately.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use magnet_resolver_core::throttle::{RateLimiter, ThrottleDecision};
//!
//! let limiter = RateLimiter::new(Duration::from_secs(3));
//!
//! // First request proceeds immediately
//! assert!(limiter.try_acquire().is_allowed());
//!
//! // A second request inside the window is rejected with a wait hint
//! match limiter.try_acquire() {
//!     ThrottleDecision::Rejected { .. } => {}
//!     ThrottleDecision::Allowed => unreachable!(),
//! }
//! ```

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, instrument};

/// Result of a throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// The request may proceed; the window was restarted.
    Allowed,
    /// The request arrived inside the current window.
    Rejected {
        /// Time remaining until the window closes.
        retry_after: Duration,
    },
}

impl ThrottleDecision {
    /// Returns true when the request may proceed.
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Remaining wait in milliseconds (zero when allowed).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn retry_after_ms(self) -> u64 {
        match self {
            Self::Allowed => 0,
            Self::Rejected { retry_after } => retry_after.as_millis() as u64,
        }
    }

    /// Remaining wait rounded up to whole seconds, for user messaging.
    #[must_use]
    pub fn retry_after_secs(self) -> u64 {
        self.retry_after_ms().div_ceil(1000)
    }
}

/// Fixed-window throttle shared by all chat sessions.
///
/// Wrap in `Arc` and inject into the pipeline; tests construct independent
/// instances. The check and the timestamp update happen under one lock, so two
/// concurrent triggers inside the same window can never both pass.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum time between two allowed requests.
    min_interval: Duration,

    /// Whether throttling is disabled (`min_interval_ms = 0`).
    disabled: bool,

    /// Time of the last allowed request. `None` until the first request.
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a throttle with the given minimum interval.
    ///
    /// A zero interval produces a disabled throttle.
    #[must_use]
    #[instrument(skip_all, fields(min_interval_ms = min_interval.as_millis()))]
    pub fn new(min_interval: Duration) -> Self {
        if min_interval.is_zero() {
            return Self::disabled();
        }
        debug!("creating rate limiter");
        Self {
            min_interval,
            disabled: false,
            last_request: Mutex::new(None),
        }
    }

    /// Creates a throttle that allows every request.
    #[must_use]
    pub fn disabled() -> Self {
        debug!("creating disabled rate limiter");
        Self {
            min_interval: Duration::ZERO,
            disabled: true,
            last_request: Mutex::new(None),
        }
    }

    /// Returns whether throttling is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the configured minimum interval.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Checks the window against the current time.
    pub fn try_acquire(&self) -> ThrottleDecision {
        self.try_acquire_at(Instant::now())
    }

    /// Checks the window against `now` and restarts it when allowed.
    ///
    /// A rejected call leaves the stored timestamp untouched.
    pub fn try_acquire_at(&self, now: Instant) -> ThrottleDecision {
        if self.disabled {
            return ThrottleDecision::Allowed;
        }

        let mut last_request = self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(last) = *last_request {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                let retry_after = self.min_interval - elapsed;
                debug!(
                    retry_after_ms = retry_after.as_millis(),
                    "request rejected by throttle"
                );
                return ThrottleDecision::Rejected { retry_after };
            }
        }

        *last_request = Some(now);
        ThrottleDecision::Allowed
    }
}
