//! Access policies of spaces.
//!
//! Policies are typed documents rendered from templates, persisted through a
//! [`PolicyStore`] and sequenced by the [`PolicyManager`].

pub mod document;
#[cfg(feature = "storage-s3")]
pub mod iam;
pub mod manager;
pub mod store;
pub mod templates;

pub use document::{parse_statements, PolicyDocument, Statement};
#[cfg(feature = "storage-s3")]
pub use iam::IamPolicyStore;
pub use manager::{PolicyManager, ScopedPolicies};
pub use store::PolicyStore;
pub use templates::{DirectoryTemplates, EmbeddedTemplates, PolicyTemplate, TemplateSource};
