//! Email/password identity.
//!
//! The identity provider itself is external; this module defines the seam,
//! the session it hands back, and the checks run before it is contacted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// The account exists but stays unusable until the emailed link is followed.
    ConfirmationPending { email: String },
    /// The provider confirmed the account immediately.
    SignedIn(Session),
}

/// What a user typed into the sign-up form.
#[derive(Debug, Clone)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> Result<Session, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, AuthError>;

    /// The current session, if one is established.
    async fn session(&self) -> Option<Session>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

pub fn validate_sign_up(form: &SignUpForm) -> Result<(), AuthError> {
    if form.email.trim().is_empty() {
        return Err(AuthError::MissingEmail);
    }
    if form.password != form.confirm_password {
        return Err(AuthError::PasswordMismatch);
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

pub async fn sign_in<P: IdentityProvider + ?Sized>(
    provider: &P,
    email: &str,
    password: &str,
) -> Result<Session, AuthError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::MissingEmail);
    }
    provider.sign_in_with_password(email, password).await
}

/// Validate the form, then register the account.
pub async fn sign_up<P: IdentityProvider + ?Sized>(
    provider: &P,
    form: &SignUpForm,
    redirect_to: Option<&str>,
) -> Result<SignUpOutcome, AuthError> {
    validate_sign_up(form)?;
    provider
        .sign_up(form.email.trim(), &form.password, redirect_to)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl IdentityProvider for RecordingProvider {
        async fn sign_in_with_password(
            &self,
            email: &str,
            password: &str,
        ) -> Result<Session, AuthError> {
            self.calls.lock().unwrap().push(format!("sign_in {}", email));
            if password != "secret1" {
                return Err(AuthError::InvalidCredentials);
            }
            Ok(Session {
                email: email.to_string(),
                access_token: "token".into(),
                refresh_token: None,
                expires_at: None,
            })
        }

        async fn sign_up(
            &self,
            email: &str,
            _password: &str,
            redirect_to: Option<&str>,
        ) -> Result<SignUpOutcome, AuthError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("sign_up {} {:?}", email, redirect_to));
            Ok(SignUpOutcome::ConfirmationPending {
                email: email.to_string(),
            })
        }

        async fn session(&self) -> Option<Session> {
            None
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            Ok(())
        }
    }

    fn form(password: &str, confirm: &str) -> SignUpForm {
        SignUpForm {
            email: "ana@example.com".into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn test_validate_sign_up() {
        assert_eq!(
            validate_sign_up(&form("secret1", "secret2")),
            Err(AuthError::PasswordMismatch)
        );
        assert_eq!(
            validate_sign_up(&form("abc", "abc")),
            Err(AuthError::PasswordTooShort { min: 6 })
        );
        assert_eq!(validate_sign_up(&form("abcdef", "abcdef")), Ok(()));

        let mut blank = form("abcdef", "abcdef");
        blank.email = "  ".into();
        assert_eq!(validate_sign_up(&blank), Err(AuthError::MissingEmail));
    }

    #[test]
    fn test_session_expiry() {
        let mut session = Session {
            email: "a@b.c".into(),
            access_token: "t".into(),
            refresh_token: None,
            expires_at: None,
        };
        assert!(!session.is_expired());
        session.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        assert!(session.is_expired());
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_provider() {
        let provider = RecordingProvider::default();

        let result = sign_up(&provider, &form("abc", "abc"), None).await;

        assert_eq!(result, Err(AuthError::PasswordTooShort { min: 6 }));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_up_leaves_confirmation_pending() {
        let provider = RecordingProvider::default();

        let outcome = sign_up(
            &provider,
            &form("secret1", "secret1"),
            Some("https://planner.example"),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            SignUpOutcome::ConfirmationPending {
                email: "ana@example.com".into()
            }
        );
        assert_eq!(
            provider.calls.lock().unwrap().as_slice(),
            ["sign_up ana@example.com Some(\"https://planner.example\")"]
        );
    }

    #[tokio::test]
    async fn test_sign_in_reports_provider_error() {
        let provider = RecordingProvider::default();

        assert_eq!(
            sign_in(&provider, " ana@example.com ", "wrong").await,
            Err(AuthError::InvalidCredentials)
        );
        assert!(sign_in(&provider, "ana@example.com", "secret1").await.is_ok());
        assert_eq!(sign_in(&provider, "", "secret1").await, Err(AuthError::MissingEmail));
    }
}
