//! Domain models for organizations, spaces and their access roles.

mod organization;
mod role;
mod space;

pub use organization::*;
pub use role::*;
pub use space::*;
