//! Notifying emergency contacts when an SOS alert is dispatched.
//!
//! The alert controller calls a [`ContactNotifier`] exactly once per
//! dispatch and never retries. Implementations decide how contacts are
//! reached; [`WebhookNotifier`] posts to an SMS/messaging gateway and
//! [`LogNotifier`] only records the dispatch.

mod log_only;
mod webhook;

use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::api_client::types::{Location, UserProfile};

pub use log_only::LogNotifier;
pub use webhook::WebhookNotifier;

/// Who raised the alert, where, and when.
#[derive(Debug, Clone)]
pub struct EmergencyContext {
    pub user: UserProfile,
    /// Last known location; `None` if the device never reported one.
    pub location: Option<Location>,
    pub raised_at: OffsetDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("no emergency contacts configured")]
    NoContacts,

    #[error("could not load emergency contacts: {0}")]
    Contacts(#[from] crate::error::Error),

    #[error("{failed} of {total} emergency contacts could not be reached")]
    Delivery { failed: usize, total: usize },

    #[error("contact notification timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait ContactNotifier: Send + Sync {
    /// Tell the user's emergency contacts about an active emergency.
    ///
    /// Returns the number of contacts reached.
    async fn notify_contacts(&self, context: &EmergencyContext) -> Result<usize, NotifyError>;
}

/// Text sent to each contact.
pub fn compose_message(context: &EmergencyContext) -> String {
    let mut message = format!(
        "EMERGENCY: {} triggered an SOS alert and may need help.",
        context.user.name
    );

    match context.location {
        Some(location) => message.push_str(&format!(
            " Last known location: https://maps.google.com/?q={:.6},{:.6}",
            location.latitude, location.longitude
        )),
        None => message.push_str(" Location unavailable."),
    }

    if !context.user.phone.is_empty() {
        message.push_str(&format!(" Call them at {}.", context.user.phone));
    }

    message
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn context(location: Option<Location>) -> EmergencyContext {
        EmergencyContext {
            user: UserProfile {
                id: 1,
                name: "Asha".into(),
                email: "asha@example.com".into(),
                phone: "555-0100".into(),
                avatar_url: None,
            },
            location,
            raised_at: datetime!(2026-03-01 21:40 UTC),
        }
    }

    #[test]
    fn message_links_location() {
        let message = compose_message(&context(Some(Location {
            latitude: 40.785091,
            longitude: -73.968285,
            accuracy_m: None,
        })));

        assert!(message.starts_with("EMERGENCY: Asha"));
        assert!(message.contains("https://maps.google.com/?q=40.785091,-73.968285"));
        assert!(message.ends_with("Call them at 555-0100."));
    }

    #[test]
    fn message_without_location_says_so() {
        let message = compose_message(&context(None));
        assert!(message.contains("Location unavailable."));
    }
}
