pub mod attend;
pub mod auth;
pub mod config;
pub mod events;
pub mod guests;
