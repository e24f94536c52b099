//! Orgstore API Library
//!
//! This crate provides the HTTP surface over the storage orchestrator: the
//! organization and space context routes, bearer-token role extraction, error
//! rendering and application setup.

pub mod auth;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
