use tokio::time::Instant;

use crate::api_client::types::{AlertPhase, SosState};

/// Lifecycle of one SOS alert.
///
/// Each variant carries only the data valid in that phase, so an idle
/// alert cannot have an arming time and a counting alert always has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Idle,
    Counting {
        remaining_ticks: u32,
        armed_at: Instant,
    },
    /// Countdown finished and contacts were (or are being) notified.
    /// Terminal until the alert is cancelled back to idle.
    Dispatched { armed_at: Instant },
}

impl AlertState {
    pub fn phase(&self) -> AlertPhase {
        match self {
            AlertState::Idle => AlertPhase::Idle,
            AlertState::Counting { .. } => AlertPhase::Counting,
            AlertState::Dispatched { .. } => AlertPhase::Dispatched,
        }
    }

    /// Rendering view. An idle alert shows the full countdown.
    pub fn snapshot(&self, initial_count: u32) -> SosState {
        let remaining_ticks = match self {
            AlertState::Idle => initial_count,
            AlertState::Counting {
                remaining_ticks, ..
            } => *remaining_ticks,
            AlertState::Dispatched { .. } => 0,
        };

        SosState {
            phase: self.phase(),
            remaining_ticks,
        }
    }

    pub fn armed_at(&self) -> Option<Instant> {
        match self {
            AlertState::Idle => None,
            AlertState::Counting { armed_at, .. } | AlertState::Dispatched { armed_at } => {
                Some(*armed_at)
            }
        }
    }
}
