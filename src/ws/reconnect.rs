//! Retry schedule for abnormal closures.

use std::future;
use std::pin::Pin;
use std::time::Duration;

use backoff::backoff::Backoff;
use tokio::time::{Sleep, sleep};

use super::config::ReconnectConfig;

/// Exponential delays with a hard attempt ceiling.
///
/// Delay `k` (zero-based) is `base_interval * growth_factor^k`, clamped to
/// `max_interval` when one is configured. [`Backoff::next_backoff`] returns
/// `None` once `max_attempts` delays have been handed out.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    base_interval: Duration,
    growth_factor: f64,
    max_interval: Option<Duration>,
    ceiling: u32,
    attempt: u32,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            base_interval: config.base_interval,
            growth_factor: config.growth_factor,
            max_interval: config.max_interval,
            ceiling: config.max_attempts,
            attempt: 0,
        }
    }

    /// Attempts handed out since the last reset.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    #[must_use]
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.ceiling
    }

    /// Delay before retry `attempt`, independent of the current position.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "growth is fractional; the product is clamped to u64 nanoseconds before conversion"
    )]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let nanos = self.base_interval.as_nanos() as f64 * self.growth_factor.powi(exponent);

        let delay = if nanos.is_finite() && nanos < u64::MAX as f64 {
            Duration::from_nanos(nanos as u64)
        } else {
            Duration::MAX
        };

        self.max_interval.map_or(delay, |max| delay.min(max))
    }
}

impl Backoff for RetryPolicy {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let delay = self.delay_for(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}

/// Result of asking the controller for a retry.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// A retry timer was armed; `attempt` is the new attempt count.
    Scheduled { attempt: u32, delay: Duration },
    /// A retry timer was already pending; nothing changed.
    AlreadyPending,
    /// The ceiling was reached; no timer was armed.
    Exhausted { attempts: u32 },
}

/// Owns the retry state and the single pending retry timer.
#[derive(Debug)]
pub(crate) struct ReconnectController {
    policy: RetryPolicy,
    timer: Option<Pin<Box<Sleep>>>,
}

impl ReconnectController {
    pub(crate) fn new(config: &ReconnectConfig) -> Self {
        Self {
            policy: RetryPolicy::new(config),
            timer: None,
        }
    }

    pub(crate) fn attempt(&self) -> u32 {
        self.policy.attempt()
    }

    /// Arm the retry timer unless one is pending or the ceiling is reached.
    pub(crate) fn schedule(&mut self) -> Schedule {
        if self.timer.is_some() {
            return Schedule::AlreadyPending;
        }

        match self.policy.next_backoff() {
            Some(delay) => {
                self.timer = Some(Box::pin(sleep(delay)));
                Schedule::Scheduled {
                    attempt: self.policy.attempt(),
                    delay,
                }
            }
            None => Schedule::Exhausted {
                attempts: self.policy.ceiling(),
            },
        }
    }

    /// Drop any pending timer. Returns whether one was pending.
    pub(crate) fn cancel(&mut self) -> bool {
        self.timer.take().is_some()
    }

    /// Cancel any pending timer and start counting from zero again.
    pub(crate) fn reset(&mut self) {
        self.cancel();
        self.policy.reset();
    }

    /// Resolves when the pending timer fires; never resolves without one.
    ///
    /// Cancel-safe: dropping the future keeps the timer armed.
    pub(crate) async fn due(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.as_mut().await;
                self.timer = None;
            }
            None => future::pending().await,
        }
    }
}
