//! Reconnect backoff policy.
//!
//! Delay doubles with each failed attempt, starting from the base delay, and
//! retries stop once the attempt count reaches the cap. No jitter.
//!
//! | Attempt | Delay (defaults) |
//! |---------|------------------|
//! | 1 | 3000 ms |
//! | 2 | 6000 ms |
//! | 3 | 12000 ms |
//! | 4 | 24000 ms |
//! | 5 | 48000 ms |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default attempt cap.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(3000);

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Pure retry-eligibility and delay computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

impl ReconnectPolicy {
    /// Creates a policy with the given cap and base delay.
    #[inline]
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Returns the attempt cap.
    #[inline]
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay before the first retry.
    #[inline]
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns `true` iff another automatic retry is allowed.
    #[inline]
    #[must_use]
    pub const fn should_retry(&self, count: u32) -> bool {
        count < self.max_attempts
    }

    /// Delay before retry number `count` (1-based).
    ///
    /// `base * 2^(count - 1)`; `count == 0` is treated as 1. Saturates
    /// instead of overflowing.
    #[must_use]
    pub fn next_delay(&self, count: u32) -> Duration {
        let exponent = count.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

// ============================================================================
// ReconnectAttempt
// ============================================================================

/// Attempt counter paired with its policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconnectAttempt {
    count: u32,
    policy: ReconnectPolicy,
}

impl ReconnectAttempt {
    /// Starts a fresh counter at zero.
    #[inline]
    #[must_use]
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self { count: 0, policy }
    }

    /// Current number of failed attempts.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// The policy this counter follows.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// See [`ReconnectPolicy::should_retry`].
    #[inline]
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        self.policy.should_retry(self.count)
    }

    /// See [`ReconnectPolicy::next_delay`].
    #[inline]
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        self.policy.next_delay(self.count)
    }

    /// Counts one failed attempt and returns the new count.
    #[inline]
    pub fn record_failure(&mut self) -> u32 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    /// Resets to zero after a successful open.
    #[inline]
    pub fn reset(&mut self) {
        self.count = 0;
    }
}

// ============================================================================
// Tests
// ============================================================================
