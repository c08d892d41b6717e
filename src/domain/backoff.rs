//! Reconnect backoff schedule.

use std::time::Duration;

/// Shortest delay ever scheduled, whatever the policy says. A zero
/// ceiling would otherwise spin the reconnect loop.
pub const MIN_DELAY: Duration = Duration::from_millis(1);

/// Parameters of the multiplicative backoff.
///
/// The defaults match the device web UI: start at one second, grow by
/// half on every consecutive failure, never wait longer than ten seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after a successful connect.
    pub floor: Duration,
    /// Upper bound on the delay.
    pub ceiling: Duration,
    /// Growth factor applied after each scheduled retry.
    pub factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            floor: Duration::from_millis(1000),
            ceiling: Duration::from_millis(10_000),
            factor: 1.5,
        }
    }
}

/// Current retry delay under a [`BackoffPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Duration,
}

impl Backoff {
    /// Creates a schedule sitting at the floor.
    #[must_use]
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.floor.max(MIN_DELAY),
            policy,
        }
    }

    /// Delay the next reconnect would use.
    #[must_use]
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Drops back to the floor.
    pub fn reset(&mut self) {
        self.current = self.policy.floor.max(MIN_DELAY);
    }

    /// Returns the delay to wait now and grows the schedule for the next
    /// failure.
    pub fn advance(&mut self) -> Duration {
        let delay = self.current;
        let factor = if self.policy.factor.is_finite() && self.policy.factor >= 1.0 {
            self.policy.factor
        } else {
            1.0
        };
        self.current = self
            .current
            .mul_f64(factor)
            .min(self.policy.ceiling)
            .max(self.policy.floor.min(self.policy.ceiling))
            .max(MIN_DELAY);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_after(n: i32) -> Duration {
        Duration::from_secs_f64((1.5f64.powi(n)).min(10.0))
    }

    #[test]
    fn starts_at_floor() {
        let backoff = Backoff::new(BackoffPolicy::default());
        assert_eq!(backoff.current(), Duration::from_millis(1000));
    }

    #[test]
    fn grows_by_half_until_capped() {
        let mut backoff = Backoff::new(BackoffPolicy::default());
        for n in 1..=10 {
            backoff.advance();
            assert_eq!(backoff.current(), expected_after(n), "after {n} disconnects");
        }
        assert_eq!(backoff.current(), Duration::from_millis(10_000));
    }

    #[test]
    fn advance_returns_delay_before_growth() {
        let mut backoff = Backoff::new(BackoffPolicy::default());
        assert_eq!(backoff.advance(), Duration::from_millis(1000));
        assert_eq!(backoff.advance(), Duration::from_millis(1500));
        assert_eq!(backoff.advance(), Duration::from_millis(2250));
    }

    #[test]
    fn reset_returns_to_floor() {
        let mut backoff = Backoff::new(BackoffPolicy::default());
        for _ in 0..6 {
            backoff.advance();
        }
        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_millis(1000));
    }

    #[test]
    fn zero_policy_never_schedules_zero_delay() {
        let mut backoff = Backoff::new(BackoffPolicy {
            floor: Duration::ZERO,
            ceiling: Duration::ZERO,
            factor: 1.5,
        });
        for _ in 0..5 {
            assert_eq!(backoff.advance(), MIN_DELAY);
        }
        backoff.reset();
        assert_eq!(backoff.current(), MIN_DELAY);
    }

    #[test]
    fn zero_ceiling_caps_at_minimum() {
        let mut backoff = Backoff::new(BackoffPolicy {
            ceiling: Duration::ZERO,
            ..BackoffPolicy::default()
        });
        assert_eq!(backoff.advance(), Duration::from_millis(1000));
        assert_eq!(backoff.advance(), MIN_DELAY);
    }

    #[test]
    fn shrinking_factor_is_clamped() {
        let mut backoff = Backoff::new(BackoffPolicy {
            factor: 0.5,
            ..BackoffPolicy::default()
        });
        backoff.advance();
        assert_eq!(backoff.current(), Duration::from_millis(1000));
    }
}
