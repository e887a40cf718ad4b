//! Notifications the controller emits for the presentation layer.

use super::timers::TimerError;
use crate::api_client::types::{AlertEvent, AlertEventKind, Severity};
use crate::notify::NotifyError;

impl AlertEvent {
    fn new(kind: AlertEventKind, severity: Severity, title: &str, message: String) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message,
            severity,
        }
    }

    pub(super) fn started(initial_count: u32) -> Self {
        Self::new(
            AlertEventKind::Started,
            Severity::Urgent,
            "SOS Activated",
            format!(
                "Emergency contacts will be notified in {initial_count} seconds. \
                 Activate again to cancel."
            ),
        )
    }

    pub(super) fn cancelled() -> Self {
        Self::new(
            AlertEventKind::Cancelled,
            Severity::Informational,
            "SOS Canceled",
            "Emergency alert has been canceled.".into(),
        )
    }

    /// Auto-expiry is reported as a cancellation with its own wording.
    pub(super) fn expired() -> Self {
        Self::new(
            AlertEventKind::Cancelled,
            Severity::Informational,
            "SOS Expired",
            "Emergency alert was armed too long and has been canceled.".into(),
        )
    }

    pub(super) fn dispatched(reached: usize) -> Self {
        Self::new(
            AlertEventKind::Dispatched,
            Severity::Urgent,
            "Emergency Contacts Notified",
            format!("Your location has been shared with {reached} emergency contact(s)."),
        )
    }

    pub(super) fn dispatch_failed(error: &NotifyError) -> Self {
        Self::new(
            AlertEventKind::DispatchFailed,
            Severity::Urgent,
            "Could Not Notify Contacts",
            format!("{error}. Call a helpline or your contacts directly."),
        )
    }

    pub(super) fn arm_failed(error: &TimerError) -> Self {
        Self::new(
            AlertEventKind::ArmFailed,
            Severity::Urgent,
            "SOS Not Activated",
            format!("The alert could not be started ({error}). Call for help directly."),
        )
    }
}
