// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory authentication provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthError;
use crate::store::{AuthProvider, Credentials};
use crate::types::{Identity, UserId};

/// Minimum password length accepted by the provider.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Consecutive failed sign-ins before the provider throttles an email.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// How long a sign-in counts as recent for sensitive operations.
pub const RECENT_LOGIN_WINDOW_SECS: i64 = 300;

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Clone)]
struct Account {
    id: UserId,
    email: String,
    password: String,
    display_name: Option<String>,
    verified: bool,
    failed_attempts: u32,
}

impl Account {
    fn identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            email_verified: self.verified,
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    email: String,
    signed_in_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ProviderState {
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    outbox: Vec<SentEmail>,
}

/// A mail the provider would have sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// Recipient.
    pub to: String,
    /// Mail kind: `password_reset` or `verification`.
    pub kind: &'static str,
}

// =============================================================================
// Memory Auth Provider
// =============================================================================

/// An in-memory [`AuthProvider`].
///
/// Emails are matched case-insensitively. Sent mails are recorded in an
/// outbox instead of being delivered.
#[derive(Debug, Clone)]
pub struct MemoryAuthProvider {
    state: Arc<RwLock<ProviderState>>,
    identity: Arc<watch::Sender<Option<Identity>>>,
    offline: Arc<AtomicBool>,
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuthProvider {
    /// Creates a provider with no accounts.
    pub fn new() -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            state: Arc::new(RwLock::new(ProviderState::default())),
            identity: Arc::new(identity),
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Registers an account without signing it in.
    pub fn seed_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Identity {
        let account = Account {
            id: UserId::new(Uuid::now_v7().to_string()),
            email: email.to_string(),
            password: password.to_string(),
            display_name: display_name.map(str::to_string),
            verified: false,
            failed_attempts: 0,
        };
        let identity = account.identity();
        self.state.write().accounts.insert(normalize(email), account);
        identity
    }

    /// Switches the provider offline; every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Marks an email as verified.
    pub fn verify_email(&self, email: &str) {
        let mut state = self.state.write();
        if let Some(account) = state.accounts.get_mut(&normalize(email)) {
            account.verified = true;
        }
        let current = Self::current_in(&state);
        drop(state);
        if let Some(identity) = current {
            self.identity.send_replace(Some(identity));
        }
    }

    /// Ages the current session past the recent-login window.
    pub fn expire_recent_login(&self) {
        if let Some(session) = self.state.write().session.as_mut() {
            session.signed_in_at = Utc::now() - Duration::seconds(RECENT_LOGIN_WINDOW_SECS + 1);
        }
    }

    /// Clears the failed-attempt counter for an email.
    pub fn reset_throttle(&self, email: &str) {
        if let Some(account) = self.state.write().accounts.get_mut(&normalize(email)) {
            account.failed_attempts = 0;
        }
    }

    /// Returns every mail sent so far.
    pub fn outbox(&self) -> Vec<SentEmail> {
        self.state.read().outbox.clone()
    }

    /// Returns `true` if an account exists for the email.
    pub fn has_account(&self, email: &str) -> bool {
        self.state.read().accounts.contains_key(&normalize(email))
    }

    fn check_online(&self) -> Result<(), AuthError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(AuthError::unavailable("auth provider is offline"))
        } else {
            Ok(())
        }
    }

    fn current_in(state: &ProviderState) -> Option<Identity> {
        state
            .session
            .as_ref()
            .and_then(|s| state.accounts.get(&normalize(&s.email)))
            .map(Account::identity)
    }

    fn start_session(&self, state: &mut ProviderState, email: &str) -> Option<Identity> {
        state.session = Some(Session {
            email: email.to_string(),
            signed_in_at: Utc::now(),
        });
        Self::current_in(state)
    }

    fn require_recent(state: &ProviderState) -> Result<String, AuthError> {
        let session = state.session.as_ref().ok_or(AuthError::NotSignedIn)?;
        if Utc::now() - session.signed_in_at > Duration::seconds(RECENT_LOGIN_WINDOW_SECS) {
            return Err(AuthError::RequiresRecentLogin);
        }
        Ok(normalize(&session.email))
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::weak_secret(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        self.check_online()?;
        let key = normalize(&credentials.email);
        let mut state = self.state.write();

        let account = state
            .accounts
            .get_mut(&key)
            .ok_or(AuthError::InvalidCredential)?;
        if account.failed_attempts >= MAX_FAILED_ATTEMPTS {
            return Err(AuthError::TooManyRequests);
        }
        if account.password != credentials.password {
            account.failed_attempts += 1;
            debug!(attempts = account.failed_attempts, "Sign-in rejected");
            return Err(AuthError::InvalidCredential);
        }
        account.failed_attempts = 0;
        let email = account.email.clone();

        let identity = self
            .start_session(&mut state, &email)
            .ok_or(AuthError::InvalidCredential)?;
        drop(state);

        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        self.check_online()?;
        if !credentials.email.contains('@') {
            return Err(AuthError::InvalidCredential);
        }
        check_password(&credentials.password)?;

        let key = normalize(&credentials.email);
        let mut state = self.state.write();
        if state.accounts.contains_key(&key) {
            return Err(AuthError::email_in_use(&credentials.email));
        }

        state.accounts.insert(
            key,
            Account {
                id: UserId::new(Uuid::now_v7().to_string()),
                email: credentials.email.trim().to_string(),
                password: credentials.password.clone(),
                display_name: None,
                verified: false,
                failed_attempts: 0,
            },
        );
        let identity = self
            .start_session(&mut state, credentials.email.trim())
            .ok_or(AuthError::InvalidCredential)?;
        drop(state);

        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.state.write().session = None;
        self.identity.send_replace(None);
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        Self::current_in(&self.state.read())
    }

    fn watch_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.check_online()?;
        let mut state = self.state.write();
        let account = state
            .accounts
            .get(&normalize(email))
            .ok_or_else(|| AuthError::user_not_found(email))?;
        let to = account.email.clone();
        state.outbox.push(SentEmail {
            to,
            kind: "password_reset",
        });
        Ok(())
    }

    async fn reauthenticate(&self, credentials: &Credentials) -> Result<(), AuthError> {
        self.check_online()?;
        let mut state = self.state.write();
        let session_email = state
            .session
            .as_ref()
            .map(|s| normalize(&s.email))
            .ok_or(AuthError::NotSignedIn)?;
        if session_email != normalize(&credentials.email) {
            return Err(AuthError::InvalidCredential);
        }
        let matches = state
            .accounts
            .get(&session_email)
            .map(|a| a.password == credentials.password)
            .unwrap_or(false);
        if !matches {
            return Err(AuthError::InvalidCredential);
        }
        if let Some(session) = state.session.as_mut() {
            session.signed_in_at = Utc::now();
        }
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> Result<(), AuthError> {
        self.check_online()?;
        check_password(new_password)?;
        let mut state = self.state.write();
        let key = Self::require_recent(&state)?;
        let account = state.accounts.get_mut(&key).ok_or(AuthError::NotSignedIn)?;
        account.password = new_password.to_string();
        Ok(())
    }

    async fn send_email_verification(&self) -> Result<(), AuthError> {
        self.check_online()?;
        let mut state = self.state.write();
        let identity = Self::current_in(&state).ok_or(AuthError::NotSignedIn)?;
        if identity.email_verified {
            return Err(AuthError::AlreadyVerified);
        }
        state.outbox.push(SentEmail {
            to: identity.email,
            kind: "verification",
        });
        Ok(())
    }

    async fn delete_current_user(&self) -> Result<(), AuthError> {
        self.check_online()?;
        let mut state = self.state.write();
        let key = Self::require_recent(&state)?;
        state.accounts.remove(&key);
        state.session = None;
        drop(state);

        self.identity.send_replace(None);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
