//! Commands sent from [`AlertHandle`](super::AlertHandle)s to the
//! controller task.
//!
//! Each command carries a oneshot reply channel. The controller answers
//! with the state after the transition, so when the caller receives the
//! reply the transition (including any timer cancellation) has happened.

use tokio::sync::oneshot;

use crate::api_client::types::SosState;

pub enum AlertCommand {
    /// Arm the alert, or cancel it if it is counting down.
    Activate { reply: oneshot::Sender<SosState> },

    /// Stop any countdown and return to idle.
    Cancel { reply: oneshot::Sender<SosState> },
}
