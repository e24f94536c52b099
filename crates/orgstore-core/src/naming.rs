//! Resource naming scheme.
//!
//! Every backend derives its identifiers from organization and space names
//! through this module so key prefixes, directory names and policy names stay
//! consistent:
//!
//! - organization prefix: `{organization}/`
//! - space prefix: `{organization}/{space}/`
//! - scoped policy: `{organization}_{space}_{role}`

use std::path::{Path, PathBuf};

use crate::constants::{KEY_DELIMITER, POLICY_NAME_SEPARATOR};
use crate::models::ScopedRole;

/// Reasons a name is rejected before any backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("{kind} name must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} name '{name}' may only contain lowercase letters, digits and '-'")]
    Forbidden { kind: &'static str, name: String },
}

/// Names are lowercase ASCII letters, digits and `-`. Anything else could act as a
/// wildcard, a template placeholder or a JSON delimiter once rendered into a policy.
fn is_allowed(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

fn validate(kind: &'static str, name: &str) -> Result<(), NameError> {
    if name.trim().is_empty() {
        return Err(NameError::Empty { kind });
    }
    if !name.chars().all(is_allowed) {
        return Err(NameError::Forbidden {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

pub fn validate_organization_name(name: &str) -> Result<(), NameError> {
    validate("organization", name)
}

pub fn validate_space_name(name: &str) -> Result<(), NameError> {
    validate("space", name)
}

/// `acme` -> `acme/`
pub fn organization_prefix(organization: &str) -> String {
    format!("{}{}", organization, KEY_DELIMITER)
}

/// `acme`, `reports` -> `acme/reports/`
pub fn space_prefix(organization: &str, space: &str) -> String {
    format!(
        "{}{}{}{}",
        organization, KEY_DELIMITER, space, KEY_DELIMITER
    )
}

/// `acme`, `reports`, admin -> `acme_reports_admin`
pub fn scoped_policy_name(organization: &str, space: &str, role: ScopedRole) -> String {
    format!(
        "{org}{sep}{space}{sep}{role}",
        org = organization,
        space = space,
        role = role.as_str(),
        sep = POLICY_NAME_SEPARATOR
    )
}

/// Prefix shared by every scoped policy of an organization: `acme_`.
pub fn organization_policy_prefix(organization: &str) -> String {
    format!("{}{}", organization, POLICY_NAME_SEPARATOR)
}

pub fn organization_dir(root: &Path, organization: &str) -> PathBuf {
    root.join(organization)
}

pub fn space_dir(root: &Path, organization: &str, space: &str) -> PathBuf {
    organization_dir(root, organization).join(space)
}
