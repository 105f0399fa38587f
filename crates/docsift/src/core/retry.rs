//! Bounded fixed-delay retry and the clock it runs against.
//!
//! Only errors for which [`ParseError::is_transient`] is true are retried. Anything
//! structural is returned on the first occurrence. The delay between attempts is a
//! plain sleep with no jitter and no growth.

use crate::core::config::RetryConfig;
use crate::{ParseError, Result};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of time for retry spacing and the processing deadline.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `Instant::now` and `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// A clock that only moves when told to.
///
/// `sleep` advances the clock instantly and records the requested duration, so tests
/// can assert on retry spacing without waiting.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState::default()),
        }
    }

    /// Move the clock forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.offset += by;
    }

    /// Durations passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        let state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.sleeps.clone()
    }

    /// Total time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        let state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.offset
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.origin + state.offset
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.offset += duration;
        state.sleeps.push(duration);
    }
}

/// Re-runs an operation on transient failure, up to `max_attempts` times in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. `on_retry` is called with the number
    /// of the attempt that just failed, before the delay. On success the value is
    /// returned together with the attempt number that produced it. When attempts are
    /// exhausted the last transient error is returned unchanged.
    pub fn run<T, F, R>(&self, clock: &dyn Clock, operation: &str, mut on_retry: R, mut op: F) -> Result<(T, u32)>
    where
        F: FnMut(u32) -> Result<T>,
        R: FnMut(u32, &ParseError),
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok((value, attempt)),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    on_retry(attempt, &err);
                    clock.sleep(self.delay);
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        tracing::warn!(operation, attempts = attempt, error = %err, "retry attempts exhausted");
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.delay())
    }
}
