//! Retry policy.
//!
//! Decides, from a classification and the per-operation retry state, whether
//! to wait and try again or to give up. Deterministic and explainable:
//! exponential backoff bounded by a maximum wait, uniform jitter to keep a
//! batch script's retries from stampeding, server-provided retry-after
//! honored verbatim.

use std::time::Duration;

use rand::Rng;

use crate::error::Classification;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry { after: Duration },
    GiveUp,
}

/// Per-operation mutable retry bookkeeping. Lives only for the duration of
/// one execution; discarded once the operation resolves.
#[derive(Debug, Clone, Copy)]
pub struct RetryState {
    /// 1-based number of the attempt that just failed.
    pub attempt: u32,
    /// Cumulative time spent waiting between attempts.
    pub waited: Duration,
}

impl RetryState {
    pub fn first() -> Self {
        Self {
            attempt: 1,
            waited: Duration::ZERO,
        }
    }

    pub fn next(self, waited: Duration) -> Self {
        Self {
            attempt: self.attempt + 1,
            waited: self.waited + waited,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first.
    pub max_attempts: u32,
    /// Backoff base; also the width of the jitter interval.
    pub base_delay: Duration,
    /// Upper bound on the exponential component of the wait.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// A policy that never retries. Useful for tests and fail-fast tooling.
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Decide how to proceed after a failed attempt.
    ///
    /// `retry_after` is the server-provided wait, if the reply carried one.
    /// It is honored exactly (no jitter) for `RateLimited`.
    pub fn decide(
        &self,
        classification: Classification,
        state: &RetryState,
        retry_after: Option<Duration>,
    ) -> Decision {
        if !classification.is_retryable() {
            return Decision::GiveUp;
        }
        if state.attempt >= self.max_attempts {
            return Decision::GiveUp;
        }

        let after = match classification {
            Classification::RateLimited => match retry_after {
                Some(wait) => wait,
                None => self.backoff(state.attempt),
            },
            _ => self.backoff(state.attempt),
        };
        Decision::Retry { after }
    }

    /// `base × 2^(attempt−1)` capped at `max_delay`, plus uniform jitter in
    /// `[0, base)`.
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.exponential(attempt);
        exp + self.jitter()
    }

    pub(crate) fn exponential(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = base_ms
            .saturating_mul(factor)
            .min(self.max_delay.as_millis() as u64);
        Duration::from_millis(ms)
    }

    fn jitter(&self) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        if base_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..base_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NON_RETRYABLE: [Classification; 6] = [
        Classification::Validation,
        Classification::Authentication,
        Classification::ObjectNotFound,
        Classification::StreamInterrupted,
        Classification::Cancelled,
        Classification::Unknown,
    ];

    fn state(attempt: u32) -> RetryState {
        RetryState {
            attempt,
            waited: Duration::ZERO,
        }
    }

    #[test]
    fn non_retryable_classes_always_give_up() {
        let policy = RetryPolicy::default();
        for class in NON_RETRYABLE {
            for attempt in [1, 2, 10, 1000] {
                assert_eq!(
                    policy.decide(class, &state(attempt), None),
                    Decision::GiveUp,
                    "{class} attempt {attempt}"
                );
            }
        }
    }

    #[test]
    fn rate_limited_honors_server_wait_exactly() {
        let policy = RetryPolicy::default();
        let wait = Duration::from_secs(7);
        match policy.decide(Classification::RateLimited, &state(1), Some(wait)) {
            Decision::Retry { after } => assert_eq!(after, wait),
            Decision::GiveUp => panic!("should retry"),
        }
    }

    #[test]
    fn rate_limited_without_hint_backs_off() {
        let policy = RetryPolicy::default();
        match policy.decide(Classification::RateLimited, &state(1), None) {
            Decision::Retry { after } => {
                assert!(after >= policy.base_delay);
                assert!(after < policy.base_delay * 2);
            }
            Decision::GiveUp => panic!("should retry"),
        }
    }

    #[test]
    fn transient_backoff_is_non_decreasing_up_to_cap() {
        let policy = RetryPolicy::new(
            16,
            Duration::from_millis(100),
            Duration::from_secs(2),
        );
        let mut prev = Duration::ZERO;
        for attempt in 1..15 {
            let exp = policy.exponential(attempt);
            assert!(exp >= prev, "attempt {attempt}: {exp:?} < {prev:?}");
            assert!(exp <= policy.max_delay);
            prev = exp;
        }
        assert_eq!(policy.exponential(14), policy.max_delay);
    }

    #[test]
    fn transient_wait_lies_within_jitter_bound() {
        let policy = RetryPolicy::default();
        for attempt in 1..3 {
            match policy.decide(Classification::Transient, &state(attempt), None) {
                Decision::Retry { after } => {
                    let floor = policy.exponential(attempt);
                    assert!(after >= floor);
                    assert!(after < floor + policy.base_delay);
                }
                Decision::GiveUp => panic!("should retry"),
            }
        }
    }

    #[test]
    fn attempts_exhausted_gives_up() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(
                Classification::Transient,
                &state(policy.max_attempts),
                None
            ),
            Decision::GiveUp
        );
    }

    #[test]
    fn retry_state_accumulates() {
        let st = RetryState::first().next(Duration::from_millis(300));
        assert_eq!(st.attempt, 2);
        assert_eq!(st.waited, Duration::from_millis(300));
    }
}
