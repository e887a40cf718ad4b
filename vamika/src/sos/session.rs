use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::AlertConfig;
use super::controller::AlertController;
use super::handle::AlertHandle;
use super::timers::TimerSource;
use crate::api_client::types::{Location, UserId, UserProfile};
use crate::notify::ContactNotifier;
use crate::tracing::prelude::*;

const COMMAND_CAPACITY: usize = 16;

/// A running alert controller bound to one signed-in user.
///
/// Created at sign-in and torn down at sign-out, so a countdown never
/// outlives the session that armed it.
pub struct AlertSession {
    user_id: UserId,
    handle: AlertHandle,
    profile_tx: watch::Sender<UserProfile>,
    location_tx: watch::Sender<Option<Location>>,
    cancellation: CancellationToken,
    task: JoinHandle<()>,
}

impl AlertSession {
    /// Start a controller for `user` on the current runtime. Cancelling
    /// `parent` stops it too.
    pub fn spawn(
        config: AlertConfig,
        user: UserProfile,
        timers: Arc<dyn TimerSource>,
        notifier: Arc<dyn ContactNotifier>,
        parent: &CancellationToken,
    ) -> Self {
        let user_id = user.id;
        let (profile_tx, profile_rx) = watch::channel(user);
        let (location_tx, location_rx) = watch::channel(None);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);

        let controller = AlertController::new(config, profile_rx, timers, notifier, location_rx);
        let handle = AlertHandle::new(
            command_tx,
            controller.state_receiver(),
            controller.subscribe(),
        );

        let cancellation = parent.child_token();
        let task = tokio::spawn(controller.run(command_rx, cancellation.clone()));
        debug!(user_id, "SOS controller started");

        Self {
            user_id,
            handle,
            profile_tx,
            location_tx,
            cancellation,
            task,
        }
    }

    pub fn handle(&self) -> AlertHandle {
        self.handle.clone()
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Use `profile` for the name and phone in future dispatches.
    pub fn update_profile(&self, profile: UserProfile) {
        self.profile_tx.send_replace(profile);
    }

    /// Record the device's latest position for the next dispatch.
    pub fn update_location(&self, location: Location) {
        self.location_tx.send_replace(Some(location));
    }

    /// Stop the controller and wait for it to exit. Pending timers are
    /// dropped with it and nothing is emitted afterwards.
    pub async fn teardown(self) {
        self.cancellation.cancel();
        if let Err(e) = self.task.await {
            error!(user_id = self.user_id, error = %e, "SOS controller task failed");
        }
    }
}
