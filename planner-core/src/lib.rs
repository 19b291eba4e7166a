//! Core types for the planner ecosystem.
//!
//! This crate holds everything shared by the CLI and store providers:
//! - `model` records (`Guest`, `Event`, `EventAttendee`) and the
//!   `EventWithAttendees` view
//! - `store` for the provider protocol and the `RemoteStore` seam
//! - `sync` for the optimistic `Synchronizer` that keeps the local
//!   projection in step with the store

pub mod agenda;
pub mod attendance;
pub mod auth;
pub mod config;
pub mod cost;
pub mod error;
pub mod invite;
pub mod model;
pub mod remote;
pub mod state;
pub mod store;
pub mod sync;

pub use config::PlannerConfig;
pub use error::{AuthError, PlannerError, PlannerResult};
pub use model::*;
pub use store::{MemoryStore, RemoteStore, Store};
pub use sync::{LoadReport, Synchronizer};
