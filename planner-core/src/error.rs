//! Error types for the planner ecosystem.

use thiserror::Error;

/// Errors that can occur in planner operations.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Store request timed out after {0}s")]
    StoreTimeout(u64),

    #[error("Store returned no row for insert into '{0}'")]
    MissingRow(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for PlannerError {
    fn from(err: serde_json::Error) -> Self {
        PlannerError::Serialization(err.to_string())
    }
}

/// Identity failures, including validation that happens before the
/// identity provider is contacted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Email is required")]
    MissingEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Not signed in")]
    NoSession,

    #[error("{0}")]
    Provider(String),
}

/// Result type alias for planner operations.
pub type PlannerResult<T> = Result<T, PlannerError>;
