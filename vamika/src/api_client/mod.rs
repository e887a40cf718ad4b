//! HTTP client for the daemon's API, used by the CLI.

pub mod types;

use anyhow::{Context, Result, bail};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use types::{
    Contact, Helpline, Incident, NewContact, SafeSpot, SignInRequest, SosState, UserProfile,
};

/// Base URL used when none is given.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:7786";

pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Client {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/api/v0{}", self.base_url, path))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        decode(send(self.request(Method::GET, path)).await?).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        decode(send(self.request(Method::POST, path).json(body)).await?).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        decode(send(self.request(Method::POST, path)).await?).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserProfile> {
        let request = SignInRequest {
            email: email.into(),
            password: password.into(),
        };
        self.post("/session/sign-in", &request).await
    }

    pub async fn sign_out(&self) -> Result<()> {
        send(self.request(Method::POST, "/session/sign-out")).await?;
        Ok(())
    }

    pub async fn get_profile(&self) -> Result<UserProfile> {
        self.get("/profile").await
    }

    pub async fn get_sos(&self) -> Result<SosState> {
        self.get("/sos").await
    }

    pub async fn activate_sos(&self) -> Result<SosState> {
        self.post_empty("/sos/activate").await
    }

    pub async fn cancel_sos(&self) -> Result<SosState> {
        self.post_empty("/sos/cancel").await
    }

    pub async fn get_contacts(&self) -> Result<Vec<Contact>> {
        self.get("/contacts").await
    }

    pub async fn add_contact(&self, contact: &NewContact) -> Result<Contact> {
        self.post("/contacts", contact).await
    }

    pub async fn get_incidents(&self) -> Result<Vec<Incident>> {
        self.get("/incidents").await
    }

    pub async fn get_helplines(&self) -> Result<Vec<Helpline>> {
        self.get("/resources/helplines").await
    }

    pub async fn get_safe_spots(&self, query: Option<&str>) -> Result<Vec<SafeSpot>> {
        let mut request = self.request(Method::GET, "/resources/safe-spots");
        if let Some(query) = query {
            request = request.query(&[("q", query)]);
        }
        decode(send(request).await?).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Send `request`, turning error statuses into errors carrying the
/// server's message.
async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request
        .send()
        .await
        .context("could not reach the vamika daemon")?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| status.to_string());
    bail!("{message} ({status})")
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .context("unexpected response from the vamika daemon")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::api::{SharedState, build_router};
    use crate::api_client::types::AlertPhase;
    use crate::shell::{Collaborators, Shell};
    use crate::sos::AlertConfig;

    async fn spawn_daemon() -> Client {
        let shell = Shell::new(
            Collaborators::default(),
            AlertConfig::default(),
            CancellationToken::new(),
        );
        let shell = Arc::new(shell);
        shell
            .sign_up(types::SignUpRequest {
                email: "lata@example.com".into(),
                password: "secret1".into(),
                name: "Lata".into(),
                phone: "555-0175".into(),
            })
            .await
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_router(SharedState { shell });
        tokio::spawn(async move { axum::serve(listener, app).await });

        Client::with_base_url(format!("http://{addr}/"))
    }

    #[tokio::test]
    async fn drives_the_daemon() {
        let client = spawn_daemon().await;

        assert_eq!(client.get_profile().await.unwrap().name, "Lata");
        assert_eq!(client.get_contacts().await.unwrap().len(), 2);
        assert!(!client.get_helplines().await.unwrap().is_empty());
        assert!(!client.get_safe_spots(Some("hospital")).await.unwrap().is_empty());

        let state = client.activate_sos().await.unwrap();
        assert_eq!(state.phase, AlertPhase::Counting);
        let state = client.cancel_sos().await.unwrap();
        assert_eq!(state.phase, AlertPhase::Idle);
    }

    #[tokio::test]
    async fn server_errors_carry_the_message() {
        let client = spawn_daemon().await;
        client.sign_out().await.unwrap();

        let error = client.get_sos().await.unwrap_err();

        assert!(error.to_string().contains("not signed in"), "{error}");
    }
}
