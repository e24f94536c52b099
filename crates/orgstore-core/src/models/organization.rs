use serde::{Deserialize, Serialize};

/// Top-level tenant unit. The name doubles as the backend resource name
/// (storage account, key prefix or directory).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
