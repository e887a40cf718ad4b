//! Session and identity provider.
//!
//! The daemon serves one device, so there is a single current session,
//! much like a browser profile: signing in replaces whoever was signed in
//! before. Credentials are checked locally against salted SHA-256
//! digests; no password is kept in memory after sign-up.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::api_client::types::{ProfileUpdate, SignInRequest, SignUpRequest, UserId, UserProfile};
use crate::error::{Error, Result};
use crate::tracing::prelude::*;

const MIN_PASSWORD_LEN: usize = 6;

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Register a new account and sign it in.
    async fn sign_up(&self, request: SignUpRequest) -> Result<UserProfile>;

    async fn sign_in(&self, request: SignInRequest) -> Result<UserProfile>;

    /// End the current session. Signing out with no session is a no-op.
    async fn sign_out(&self) -> Result<()>;

    async fn current_user(&self) -> Option<UserProfile>;

    async fn is_authenticated(&self) -> bool {
        self.current_user().await.is_some()
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<UserProfile>;

    /// Display name of any registered user, for attributing reports.
    async fn display_name(&self, user: UserId) -> Option<String>;
}

struct Account {
    profile: UserProfile,
    password_digest: String,
}

#[derive(Default)]
struct Directory {
    next_id: UserId,
    /// Keyed by normalized email.
    accounts: HashMap<String, Account>,
    current: Option<String>,
}

/// Session provider holding accounts in memory.
#[derive(Default)]
pub struct InMemorySessionProvider {
    directory: Mutex<Directory>,
}

impl InMemorySessionProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(Error::Invalid(format!("not an email address: {email:?}"))),
    }
}

/// Hex SHA-256 of the password, salted with the account email.
fn password_digest(email: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl SessionProvider for InMemorySessionProvider {
    async fn sign_up(&self, request: SignUpRequest) -> Result<UserProfile> {
        let email = normalize_email(&request.email)?;
        let name = request.name.trim();
        if name.is_empty() {
            return Err(Error::Invalid("name is required".into()));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::Invalid(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let mut directory = self.directory.lock();
        if directory.accounts.contains_key(&email) {
            return Err(Error::Conflict(format!("{email} is already registered")));
        }

        directory.next_id += 1;
        let profile = UserProfile {
            id: directory.next_id,
            name: name.to_string(),
            email: email.clone(),
            phone: request.phone.trim().to_string(),
            avatar_url: None,
        };
        let password_digest = password_digest(&email, &request.password);
        directory.accounts.insert(
            email.clone(),
            Account {
                profile: profile.clone(),
                password_digest,
            },
        );
        directory.current = Some(email);

        info!(user_id = profile.id, "Account created");
        Ok(profile)
    }

    async fn sign_in(&self, request: SignInRequest) -> Result<UserProfile> {
        let email = normalize_email(&request.email)?;
        let digest = password_digest(&email, &request.password);

        let mut directory = self.directory.lock();
        let profile = match directory.accounts.get(&email) {
            Some(account) if account.password_digest == digest => account.profile.clone(),
            _ => {
                warn!("Rejected sign-in attempt");
                return Err(Error::Invalid("invalid login credentials".into()));
            }
        };
        directory.current = Some(email);

        info!(user_id = profile.id, "Signed in");
        Ok(profile)
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(email) = self.directory.lock().current.take() {
            debug!(%email, "Signed out");
        }
        Ok(())
    }

    async fn current_user(&self) -> Option<UserProfile> {
        let directory = self.directory.lock();
        let email = directory.current.as_ref()?;
        directory.accounts.get(email).map(|a| a.profile.clone())
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<UserProfile> {
        let mut directory = self.directory.lock();
        let email = directory.current.clone().ok_or(Error::Unauthenticated)?;
        let account = directory
            .accounts
            .get_mut(&email)
            .ok_or(Error::Unauthenticated)?;

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::Invalid("name is required".into()));
            }
            account.profile.name = name.to_string();
        }
        if let Some(phone) = update.phone {
            account.profile.phone = phone.trim().to_string();
        }
        if let Some(avatar_url) = update.avatar_url {
            account.profile.avatar_url = Some(avatar_url).filter(|url| !url.is_empty());
        }

        Ok(account.profile.clone())
    }

    async fn display_name(&self, user: UserId) -> Option<String> {
        self.directory
            .lock()
            .accounts
            .values()
            .find(|a| a.profile.id == user)
            .map(|a| a.profile.name.clone())
    }
}
