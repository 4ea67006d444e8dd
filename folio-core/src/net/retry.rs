//! Bounded retry with exponential backoff and jitter

use crate::error::NetworkError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_retries: u32,
    /// Delay before the second attempt, in seconds
    pub initial_backoff_secs: f64,
    /// Upper bound for any single delay, in seconds
    pub max_backoff_secs: f64,
    /// Relative jitter; 0.3 means each delay is scaled by a factor in [0.7, 1.3]
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff_secs: 1.0,
            max_backoff_secs: 30.0,
            jitter: 0.3,
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps and tries exactly once
    pub fn no_retry() -> Self {
        Self {
            max_retries: 1,
            ..Self::default()
        }
    }

    /// Delay for a given base backoff and a jitter sample in [-1, 1].
    ///
    /// The result is `backoff * (1 + jitter * sample)` clamped to
    /// `[0, max_backoff]`.
    pub fn jittered_delay(&self, backoff_secs: f64, sample: f64) -> Duration {
        let factor = 1.0 + self.jitter.max(0.0) * sample.clamp(-1.0, 1.0);
        let secs = (backoff_secs * factor).clamp(0.0, self.max_backoff_secs.max(0.0));
        Duration::from_secs_f64(secs)
    }

    /// Base backoff before jitter for the n-th delay (1-based)
    pub fn base_backoff(&self, n: u32) -> f64 {
        let exp = n.saturating_sub(1).min(63) as i32;
        (self.initial_backoff_secs * 2f64.powi(exp)).min(self.max_backoff_secs)
    }
}

/// Something that can pause the calling thread
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Hooks for watching retry progress
pub trait RetryObserver: Send + Sync {
    /// Called before every attempt (1-based)
    fn on_attempt(&self, _attempt: u32, _max_attempts: u32) {}

    /// Called when a retryable failure is followed by a sleep
    fn on_backoff(&self, _attempt: u32, _delay: Duration, _error: &NetworkError) {}

    /// Called when the error is returned to the caller
    fn on_give_up(&self, _attempts: u32, _error: &NetworkError) {}
}

/// Run `thunk` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. The thunk receives the 1-based attempt number.
pub fn retry_with_backoff<T, F>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    observer: Option<&dyn RetryObserver>,
    mut thunk: F,
) -> Result<T, NetworkError>
where
    F: FnMut(u32) -> Result<T, NetworkError>,
{
    let max_attempts = policy.max_retries.max(1);
    let mut backoff = policy.initial_backoff_secs.max(0.0);
    let mut rng = rand::thread_rng();

    for attempt in 1..=max_attempts {
        debug!(attempt, max_attempts, "request attempt");
        if let Some(observer) = observer {
            observer.on_attempt(attempt, max_attempts);
        }

        let error = match thunk(attempt) {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_retryable() || attempt == max_attempts {
            if error.is_retryable() {
                warn!(attempts = attempt, error = %error, "giving up after retries");
            } else {
                debug!(error = %error, "non-retryable failure");
            }
            if let Some(observer) = observer {
                observer.on_give_up(attempt, &error);
            }
            return Err(error);
        }

        let sample = if policy.jitter > 0.0 {
            rng.gen_range(-1.0..=1.0)
        } else {
            0.0
        };
        let delay = policy.jittered_delay(backoff, sample);
        debug!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "backing off");
        if let Some(observer) = observer {
            observer.on_backoff(attempt, delay, &error);
        }
        sleeper.sleep(delay);
        backoff = (backoff * 2.0).min(policy.max_backoff_secs);
    }

    // max_attempts >= 1, so the loop always returns
    Err(NetworkError::Transport("no attempt was made".to_string()))
}
