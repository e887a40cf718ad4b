use std::time::Duration;

/// Countdown ticks between activation and dispatch.
pub const INITIAL_COUNT: u32 = 3;

/// Period of one countdown tick. Not configurable.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Longest an alert may stay armed before it is cancelled.
pub const AUTO_EXPIRY: Duration = Duration::from_secs(10);

/// Upper bound on one notify-contacts call.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// Ticks counted down before contacts are notified. Must be at
    /// least 1.
    pub initial_count: u32,

    /// Time from activation after which a still-counting alert is
    /// cancelled. Must exceed [`countdown`](Self::countdown), or no alert
    /// would ever dispatch.
    pub auto_expiry: Duration,

    /// How long the notifier may take before the dispatch is reported
    /// as failed.
    pub notify_timeout: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            initial_count: INITIAL_COUNT,
            auto_expiry: AUTO_EXPIRY,
            notify_timeout: NOTIFY_TIMEOUT,
        }
    }
}

impl AlertConfig {
    /// Time from activation to dispatch.
    pub fn countdown(&self) -> Duration {
        TICK_PERIOD.saturating_mul(self.initial_count)
    }
}
