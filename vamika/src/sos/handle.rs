use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::commands::AlertCommand;
use crate::api_client::types::{AlertEvent, SosState};

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("SOS controller is not running")]
    ControllerGone,
}

/// Cloneable front end to a running [`AlertController`](super::AlertController).
///
/// Commands return once the controller has applied them, with the state
/// they produced.
pub struct AlertHandle {
    command_tx: mpsc::Sender<AlertCommand>,
    state_rx: watch::Receiver<SosState>,
    event_rx: broadcast::Receiver<AlertEvent>,
}

impl AlertHandle {
    pub(super) fn new(
        command_tx: mpsc::Sender<AlertCommand>,
        state_rx: watch::Receiver<SosState>,
        event_rx: broadcast::Receiver<AlertEvent>,
    ) -> Self {
        Self {
            command_tx,
            state_rx,
            event_rx,
        }
    }

    /// Toggle the alert: arm when idle, cancel when counting.
    pub async fn activate(&self) -> Result<SosState, AlertError> {
        let (reply, rx) = oneshot::channel();
        self.send(AlertCommand::Activate { reply }, rx).await
    }

    pub async fn cancel(&self) -> Result<SosState, AlertError> {
        let (reply, rx) = oneshot::channel();
        self.send(AlertCommand::Cancel { reply }, rx).await
    }

    async fn send(
        &self,
        command: AlertCommand,
        rx: oneshot::Receiver<SosState>,
    ) -> Result<SosState, AlertError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| AlertError::ControllerGone)?;
        rx.await.map_err(|_| AlertError::ControllerGone)
    }

    /// Latest state, without waiting.
    pub fn snapshot(&self) -> SosState {
        *self.state_rx.borrow()
    }

    /// Receiver that is notified on every state change.
    pub fn watch(&self) -> watch::Receiver<SosState> {
        self.state_rx.clone()
    }

    /// Events emitted from now on. The stream ends when the controller
    /// stops.
    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.event_rx.resubscribe()
    }
}

impl Clone for AlertHandle {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            state_rx: self.state_rx.clone(),
            event_rx: self.event_rx.resubscribe(),
        }
    }
}
