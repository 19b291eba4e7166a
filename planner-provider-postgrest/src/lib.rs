//! planner-provider-postgrest - hosted store and identity for planner
//!
//! Talks to a Supabase-style backend: collections through PostgREST
//! (`/rest/v1`) and email/password accounts through GoTrue (`/auth/v1`).
//!
//! The signed-in session is kept at:
//!   ~/.config/planner/session.toml

mod auth;
mod endpoint;
mod query;
mod rest;
mod session;

pub use auth::RestAuth;
pub use endpoint::Endpoint;
pub use rest::RestStore;
pub use session::SessionFile;
