//! The daemon-side presentation shell.
//!
//! [`Shell`] composes the collaborators, gates everything behind the
//! signed-in session and owns the alert controller of whoever is signed
//! in. The HTTP API is a thin layer over it.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::api_client::types::{
    AlertEvent, Contact, ContactId, Incident, Location, NewContact, NewIncident, ProfileUpdate,
    Severity, SignInRequest, SignUpRequest, UserProfile,
};
use crate::contacts::{self, ContactStore, InMemoryContactStore};
use crate::error::{Error, Result};
use crate::incidents::{InMemoryIncidentStore, IncidentStore};
use crate::notify::{ContactNotifier, LogNotifier};
use crate::session::{InMemorySessionProvider, SessionProvider};
use crate::sos::{AlertConfig, AlertHandle, AlertSession, TimerSource, TokioTimers};
use crate::tracing::prelude::*;

/// Everything the shell delegates to.
pub struct Collaborators {
    pub session: Arc<dyn SessionProvider>,
    pub contacts: Arc<dyn ContactStore>,
    pub incidents: Arc<dyn IncidentStore>,
    pub notifier: Arc<dyn ContactNotifier>,
    pub timers: Arc<dyn TimerSource>,
}

impl Collaborators {
    /// In-process collaborators around `contacts`. Dispatches are only
    /// logged.
    pub fn in_memory(contacts: Arc<dyn ContactStore>) -> Self {
        let session: Arc<dyn SessionProvider> = Arc::new(InMemorySessionProvider::new());
        Self {
            incidents: Arc::new(InMemoryIncidentStore::new(Arc::clone(&session))),
            notifier: Arc::new(LogNotifier::new(Arc::clone(&contacts))),
            timers: Arc::new(TokioTimers),
            session,
            contacts,
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::in_memory(Arc::new(InMemoryContactStore::new()))
    }
}

pub struct Shell {
    session: Arc<dyn SessionProvider>,
    contacts: Arc<dyn ContactStore>,
    incidents: Arc<dyn IncidentStore>,
    notifier: Arc<dyn ContactNotifier>,
    timers: Arc<dyn TimerSource>,
    alert_config: AlertConfig,
    /// Alert controller of the signed-in user. Held across awaits while
    /// a controller starts or stops, hence the async mutex.
    alert: Mutex<Option<AlertSession>>,
    shutdown: CancellationToken,
}

impl Shell {
    pub fn new(
        collaborators: Collaborators,
        alert_config: AlertConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            session: collaborators.session,
            contacts: collaborators.contacts,
            incidents: collaborators.incidents,
            notifier: collaborators.notifier,
            timers: collaborators.timers,
            alert_config,
            alert: Mutex::new(None),
            shutdown,
        }
    }

    /// Register and sign in. The example contacts are a convenience: if
    /// they cannot be stored the account still works, alert included.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<UserProfile> {
        let user = self.session.sign_up(request).await?;
        self.start_alert(user.clone()).await;

        if let Err(e) = contacts::seed_examples(self.contacts.as_ref(), user.id).await {
            warn!(user_id = user.id, error = %e, "Could not seed example contacts");
        }
        Ok(user)
    }

    pub async fn sign_in(&self, request: SignInRequest) -> Result<UserProfile> {
        let user = self.session.sign_in(request).await?;
        self.start_alert(user.clone()).await;
        Ok(user)
    }

    /// End the session. Any countdown in progress is cancelled first.
    pub async fn sign_out(&self) -> Result<()> {
        let user = self.require_user().await?;
        self.stop_alert().await;
        self.session.sign_out().await?;
        info!(user_id = user.id, "Signed out");
        Ok(())
    }

    /// The signed-in user, or [`Error::Unauthenticated`].
    pub async fn require_user(&self) -> Result<UserProfile> {
        self.session
            .current_user()
            .await
            .ok_or(Error::Unauthenticated)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<UserProfile> {
        self.require_user().await?;
        let user = self.session.update_profile(update).await?;
        if let Some(alert) = self.alert.lock().await.as_ref() {
            alert.update_profile(user.clone());
        }
        Ok(user)
    }

    /// Handle to the signed-in user's alert controller.
    pub async fn alert(&self) -> Result<AlertHandle> {
        let user = self.require_user().await?;
        match self.alert.lock().await.as_ref() {
            Some(alert) if alert.user_id() == user.id => Ok(alert.handle()),
            _ => Err(Error::Unauthenticated),
        }
    }

    pub async fn update_location(&self, location: Location) -> Result<()> {
        if !location.latitude.is_finite()
            || !location.longitude.is_finite()
            || !(-90.0..=90.0).contains(&location.latitude)
            || !(-180.0..=180.0).contains(&location.longitude)
        {
            return Err(Error::Invalid("coordinates out of range".into()));
        }

        self.require_user().await?;
        if let Some(alert) = self.alert.lock().await.as_ref() {
            alert.update_location(location);
        }
        Ok(())
    }

    pub async fn contacts(&self) -> Result<Vec<Contact>> {
        let user = self.require_user().await?;
        self.contacts.list(user.id).await
    }

    pub async fn add_contact(&self, contact: NewContact) -> Result<Contact> {
        let user = self.require_user().await?;
        self.contacts.add(user.id, contact).await
    }

    pub async fn remove_contact(&self, id: ContactId) -> Result<()> {
        let user = self.require_user().await?;
        self.contacts.remove(user.id, id).await
    }

    pub async fn incidents(&self) -> Result<Vec<Incident>> {
        self.require_user().await?;
        self.incidents.list().await
    }

    pub async fn report_incident(&self, incident: NewIncident) -> Result<Incident> {
        let user = self.require_user().await?;
        self.incidents.report(&user, incident).await
    }

    /// Stop the alert controller for good.
    pub async fn shutdown(&self) {
        self.stop_alert().await;
        self.shutdown.cancel();
    }

    /// Replace the running alert controller with a fresh one for `user`.
    async fn start_alert(&self, user: UserProfile) {
        let mut alert = self.alert.lock().await;
        if let Some(previous) = alert.take() {
            previous.teardown().await;
        }

        let session = AlertSession::spawn(
            self.alert_config.clone(),
            user,
            Arc::clone(&self.timers),
            Arc::clone(&self.notifier),
            &self.shutdown,
        );
        tokio::spawn(relay_events(session.handle().subscribe()));
        *alert = Some(session);
    }

    async fn stop_alert(&self) {
        if let Some(session) = self.alert.lock().await.take() {
            session.teardown().await;
        }
    }
}

/// Log alert events until the controller stops.
async fn relay_events(mut events: broadcast::Receiver<AlertEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => log_event(&event),
            Err(RecvError::Lagged(missed)) => warn!(missed, "Alert event relay lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn log_event(event: &AlertEvent) {
    match event.severity {
        Severity::Urgent => warn!(kind = ?event.kind, title = %event.title, "{}", event.message),
        Severity::Informational => {
            info!(kind = ?event.kind, title = %event.title, "{}", event.message)
        }
    }
}
