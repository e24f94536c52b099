//! HTTP handlers for the storage context routes.

pub mod health;
pub mod organization;
pub mod space;
