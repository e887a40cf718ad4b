use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;

use super::{ContactNotifier, EmergencyContext, NotifyError, compose_message};
use crate::api_client::types::Contact;
use crate::contacts::ContactStore;
use crate::tracing::prelude::*;

/// Body posted to the gateway, one per contact.
#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    to: &'a str,
    contact_name: &'a str,
    user_name: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    longitude: Option<f64>,
}

/// Sends the emergency message to every contact through an HTTP
/// messaging gateway (SMS bridge, push relay, etc.).
///
/// All contacts are tried concurrently. The dispatch counts as failed if
/// any contact could not be reached, so the user knows to call for help
/// some other way.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
    contacts: Arc<dyn ContactStore>,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>, contacts: Arc<dyn ContactStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            contacts,
        }
    }

    async fn deliver(
        &self,
        contact: &Contact,
        context: &EmergencyContext,
        message: &str,
    ) -> reqwest::Result<()> {
        let body = OutboundMessage {
            to: &contact.phone,
            contact_name: &contact.name,
            user_name: &context.user.name,
            message,
            latitude: context.location.map(|l| l.latitude),
            longitude: context.location.map(|l| l.longitude),
        };

        self.client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl ContactNotifier for WebhookNotifier {
    async fn notify_contacts(&self, context: &EmergencyContext) -> Result<usize, NotifyError> {
        let contacts = self.contacts.list(context.user.id).await?;
        if contacts.is_empty() {
            return Err(NotifyError::NoContacts);
        }

        let message = compose_message(context);
        let results = join_all(
            contacts
                .iter()
                .map(|contact| self.deliver(contact, context, &message)),
        )
        .await;

        let mut failed = 0;
        for (contact, result) in contacts.iter().zip(results) {
            if let Err(e) = result {
                failed += 1;
                warn!(contact_id = contact.id, error = %e, "Emergency message delivery failed");
            }
        }

        let total = contacts.len();
        if failed > 0 {
            return Err(NotifyError::Delivery { failed, total });
        }

        info!(contacts = total, "Emergency contacts notified");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
    use parking_lot::Mutex;
    use time::OffsetDateTime;

    use super::*;
    use crate::api_client::types::{Location, NewContact, UserProfile};
    use crate::contacts::InMemoryContactStore;

    type Received = Arc<Mutex<Vec<serde_json::Value>>>;

    /// Start a gateway on a loopback port that records bodies and answers
    /// with `status`. Returns its URL.
    async fn spawn_gateway(status: StatusCode, received: Received) -> String {
        async fn accept(
            State((status, received)): State<(StatusCode, Received)>,
            Json(body): Json<serde_json::Value>,
        ) -> StatusCode {
            received.lock().push(body);
            status
        }

        let app = Router::new()
            .route("/send", post(accept))
            .with_state((status, received));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}/send")
    }

    fn user() -> UserProfile {
        UserProfile {
            id: 1,
            name: "Asha".into(),
            email: "asha@example.com".into(),
            phone: String::new(),
            avatar_url: None,
        }
    }

    fn context(location: Option<Location>) -> EmergencyContext {
        EmergencyContext {
            user: user(),
            location,
            raised_at: OffsetDateTime::now_utc(),
        }
    }

    async fn store_with_contacts(n: usize) -> Arc<InMemoryContactStore> {
        let store = Arc::new(InMemoryContactStore::new());
        for i in 0..n {
            store
                .add(
                    1,
                    NewContact {
                        name: format!("Contact {i}"),
                        phone: format!("555-010{i}"),
                        relation: String::new(),
                    },
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn posts_one_message_per_contact() {
        let received = Received::default();
        let url = spawn_gateway(StatusCode::OK, received.clone()).await;
        let notifier = WebhookNotifier::new(url, store_with_contacts(2).await);

        let reached = notifier
            .notify_contacts(&context(Some(Location {
                latitude: 12.97,
                longitude: 77.59,
                accuracy_m: Some(8.0),
            })))
            .await
            .unwrap();
        assert_eq!(reached, 2);

        let bodies = received.lock().clone();
        assert_eq!(bodies.len(), 2);
        let mut recipients: Vec<_> = bodies.iter().map(|b| b["to"].clone()).collect();
        recipients.sort_by_key(|v| v.to_string());
        assert_eq!(recipients, ["555-0100", "555-0101"]);
        assert_eq!(bodies[0]["user_name"], "Asha");
        assert_eq!(bodies[0]["latitude"], 12.97);
    }

    #[tokio::test]
    async fn omits_coordinates_without_location() {
        let received = Received::default();
        let url = spawn_gateway(StatusCode::OK, received.clone()).await;
        let notifier = WebhookNotifier::new(url, store_with_contacts(1).await);

        notifier.notify_contacts(&context(None)).await.unwrap();

        let body = received.lock()[0].clone();
        assert!(body.get("latitude").is_none());
        assert!(body.get("longitude").is_none());
    }

    #[tokio::test]
    async fn gateway_errors_fail_the_dispatch() {
        let received = Received::default();
        let url = spawn_gateway(StatusCode::SERVICE_UNAVAILABLE, received.clone()).await;
        let notifier = WebhookNotifier::new(url, store_with_contacts(2).await);

        let result = notifier.notify_contacts(&context(None)).await;
        assert!(matches!(
            result,
            Err(NotifyError::Delivery {
                failed: 2,
                total: 2
            })
        ));
        // Every contact was still attempted
        assert_eq!(received.lock().len(), 2);
    }

    #[tokio::test]
    async fn no_contacts_is_a_failure() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/unused", store_with_contacts(0).await);

        let result = notifier.notify_contacts(&context(None)).await;
        assert!(matches!(result, Err(NotifyError::NoContacts)));
    }
}
