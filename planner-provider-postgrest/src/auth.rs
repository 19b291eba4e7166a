//! Email/password accounts over GoTrue.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use planner_core::AuthError;
use planner_core::auth::{IdentityProvider, Session, SignUpOutcome};

use crate::endpoint::{Endpoint, error_message};
use crate::session::SessionFile;

pub struct RestAuth {
    endpoint: Endpoint,
    sessions: SessionFile,
    current: Mutex<Option<Session>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Unix seconds
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<UserResponse>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self, email: &str, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)));

        Session {
            email: self
                .user
                .and_then(|u| u.email)
                .unwrap_or_else(|| email.to_string()),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// Sign-up answers with a session when the account is confirmed
/// immediately, and with the bare user otherwise.
fn sign_up_outcome(body: Value, email: &str, now: DateTime<Utc>) -> Result<SignUpOutcome, AuthError> {
    if body.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(body)
            .map_err(|e| AuthError::Provider(format!("Unexpected sign-up response: {}", e)))?;
        return Ok(SignUpOutcome::SignedIn(token.into_session(email, now)));
    }

    let email = body
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or(email)
        .to_string();
    Ok(SignUpOutcome::ConfirmationPending { email })
}

fn provider_error(err: impl std::fmt::Display) -> AuthError {
    AuthError::Provider(err.to_string())
}

impl RestAuth {
    /// Picks up a session saved by an earlier sign-in.
    pub fn new(endpoint: Endpoint, sessions: SessionFile) -> anyhow::Result<Self> {
        let current = sessions.load()?;
        Ok(RestAuth {
            endpoint,
            sessions,
            current: Mutex::new(current),
        })
    }

    fn current(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn establish(&self, session: Session) -> Result<Session, AuthError> {
        self.sessions
            .save(&session)
            .map_err(|e| AuthError::Provider(format!("{:#}", e)))?;
        *self.current() = Some(session.clone());
        Ok(session)
    }
}

#[async_trait]
impl IdentityProvider for RestAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let mut url = self.endpoint.url(&["auth", "v1", "token"]);
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .endpoint
            .request(Method::POST, url, None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(provider_error)?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::BAD_REQUEST => return Err(AuthError::InvalidCredentials),
            _ => return Err(AuthError::Provider(error_message(response).await)),
        }

        let token: TokenResponse = response.json().await.map_err(provider_error)?;
        debug!(email, "signed in");
        self.establish(token.into_session(email, Utc::now()))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, AuthError> {
        let mut url = self.endpoint.url(&["auth", "v1", "signup"]);
        if let Some(redirect_to) = redirect_to {
            url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        }

        let response = self
            .endpoint
            .request(Method::POST, url, None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(provider_error)?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(error_message(response).await));
        }

        let body: Value = response.json().await.map_err(provider_error)?;
        match sign_up_outcome(body, email, Utc::now())? {
            SignUpOutcome::SignedIn(session) => {
                Ok(SignUpOutcome::SignedIn(self.establish(session)?))
            }
            pending => Ok(pending),
        }
    }

    async fn session(&self) -> Option<Session> {
        self.current().clone().filter(|s| !s.is_expired())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.current().take();

        if let Some(session) = session {
            let url = self.endpoint.url(&["auth", "v1", "logout"]);
            let result = self
                .endpoint
                .request(Method::POST, url, Some(&session.access_token))
                .send()
                .await;
            // The local session is dropped either way
            match result {
                Ok(response) if !response.status().is_success() => {
                    let error = error_message(response).await;
                    warn!(%error, "remote sign-out failed");
                }
                Err(error) => warn!(%error, "remote sign-out failed"),
                Ok(_) => {}
            }
        }

        self.sessions
            .clear()
            .map_err(|e| AuthError::Provider(format!("{:#}", e)))
    }
}
