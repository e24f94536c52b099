use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::constants::LOADINGZONE;
use crate::models::Organization;

/// Confidentiality level of a space.
///
/// Only `Public` spaces contribute statements to the public access aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidentiality {
    Public,
    #[default]
    Internal,
    Private,
}

impl Confidentiality {
    pub fn is_public(self) -> bool {
        self == Confidentiality::Public
    }
}

impl FromStr for Confidentiality {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PUBLIC" => Ok(Confidentiality::Public),
            "INTERNAL" => Ok(Confidentiality::Internal),
            "PRIVATE" => Ok(Confidentiality::Private),
            _ => Err(anyhow::anyhow!("Invalid confidentiality: {}", s)),
        }
    }
}

impl Display for Confidentiality {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Confidentiality::Public => write!(f, "PUBLIC"),
            Confidentiality::Internal => write!(f, "INTERNAL"),
            Confidentiality::Private => write!(f, "PRIVATE"),
        }
    }
}

/// A named sub-scope of exactly one organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Space {
    pub organization: Organization,
    pub name: String,
    #[serde(default)]
    pub confidentiality: Confidentiality,
}

impl Space {
    pub fn new(
        organization: Organization,
        name: impl Into<String>,
        confidentiality: Confidentiality,
    ) -> Self {
        Self {
            organization,
            name: name.into(),
            confidentiality,
        }
    }

    /// The implicit space created alongside every organization.
    pub fn loadingzone(organization: Organization) -> Self {
        Self::new(organization, LOADINGZONE, Confidentiality::Internal)
    }

    pub fn organization_name(&self) -> &str {
        &self.organization.name
    }

    /// Loadingzone matching is case-insensitive.
    pub fn is_loadingzone(&self) -> bool {
        self.name.eq_ignore_ascii_case(LOADINGZONE)
    }

    pub fn is_public(&self) -> bool {
        self.confidentiality.is_public()
    }
}
