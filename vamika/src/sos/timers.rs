//! Scheduling of the countdown tick and the auto-expiry deadline.
//!
//! The controller polls the returned timers from its own loop rather than
//! spawning callbacks, so dropping them is a complete cancellation: a
//! dropped timer can never fire.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("timers unavailable: {0}")]
    Unavailable(String),
}

/// Timers for one armed countdown.
pub struct ArmedTimers {
    /// Periodic tick, first firing one period after arming.
    pub tick: Interval,
    /// One-shot auto-expiry deadline.
    pub expiry: Pin<Box<Sleep>>,
}

pub trait TimerSource: Send + Sync {
    /// Schedule a tick every `period` starting one period after
    /// `armed_at`, and an expiry at `armed_at + expiry`.
    fn arm(
        &self,
        armed_at: Instant,
        period: Duration,
        expiry: Duration,
    ) -> Result<ArmedTimers, TimerError>;
}

/// Timers driven by the ambient Tokio runtime.
pub struct TokioTimers;

impl TimerSource for TokioTimers {
    fn arm(
        &self,
        armed_at: Instant,
        period: Duration,
        expiry: Duration,
    ) -> Result<ArmedTimers, TimerError> {
        // Outside a runtime, Tokio's timer constructors panic.
        tokio::runtime::Handle::try_current()
            .map_err(|e| TimerError::Unavailable(e.to_string()))?;

        let mut tick = tokio::time::interval_at(armed_at + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Ok(ArmedTimers {
            tick,
            expiry: Box::pin(tokio::time::sleep_until(armed_at + expiry)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arming_outside_a_runtime_fails() {
        let result = TokioTimers.arm(
            Instant::now(),
            Duration::from_secs(1),
            Duration::from_secs(10),
        );
        assert!(matches!(result, Err(TimerError::Unavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_one_period_after_arming() {
        let armed_at = Instant::now();
        let mut timers = TokioTimers
            .arm(armed_at, Duration::from_secs(1), Duration::from_secs(10))
            .unwrap();

        let first = timers.tick.tick().await;
        assert_eq!(first - armed_at, Duration::from_secs(1));
        let second = timers.tick.tick().await;
        assert_eq!(second - armed_at, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_fires_at_deadline() {
        let armed_at = Instant::now();
        let timers = TokioTimers
            .arm(armed_at, Duration::from_secs(1), Duration::from_secs(10))
            .unwrap();

        timers.expiry.await;
        assert_eq!(armed_at.elapsed(), Duration::from_secs(10));
    }
}
