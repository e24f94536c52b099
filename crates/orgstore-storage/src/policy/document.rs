//! Typed IAM-style policy documents.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::traits::{StorageError, StorageResult};

/// One access-control entry. Statements are opaque and compared by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statement(pub Value);

/// A named policy's document: a version tag and an ordered statement collection.
///
/// Unknown top-level fields (`Id` and friends) are kept as they are.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(rename = "Statement", default, deserialize_with = "one_or_many")]
    pub statements: Vec<Statement>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// IAM accepts a single statement object in place of an array.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Statement>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Statement>),
        One(Statement),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(statements) => statements,
        OneOrMany::One(statement) => vec![statement],
    })
}

impl PolicyDocument {
    pub fn parse(text: &str) -> StorageResult<Self> {
        serde_json::from_str(text).map_err(|e| StorageError::InvalidPolicy(e.to_string()))
    }

    pub fn to_json(&self) -> StorageResult<String> {
        serde_json::to_string(self).map_err(|e| StorageError::InvalidPolicy(e.to_string()))
    }

    /// Append every statement not already present. Returns how many were added.
    pub fn merge(&mut self, statements: &[Statement]) -> usize {
        let mut added = 0;
        for statement in statements {
            if !self.statements.contains(statement) {
                self.statements.push(statement.clone());
                added += 1;
            }
        }
        added
    }

    /// Remove every statement equal to one of `statements`. Returns how many were removed.
    pub fn subtract(&mut self, statements: &[Statement]) -> usize {
        let before = self.statements.len();
        self.statements.retain(|s| !statements.contains(s));
        before - self.statements.len()
    }

    /// True when every one of `statements` is present.
    pub fn contains_all(&self, statements: &[Statement]) -> bool {
        !statements.is_empty() && statements.iter().all(|s| self.statements.contains(s))
    }
}

/// Parse a statement fragment: either a bare array of statements or a full document.
pub fn parse_statements(text: &str) -> StorageResult<Vec<Statement>> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| StorageError::InvalidPolicy(e.to_string()))?;
    match value {
        Value::Array(items) => Ok(items.into_iter().map(Statement).collect()),
        Value::Object(_) => {
            let document: PolicyDocument = serde_json::from_value(value)
                .map_err(|e| StorageError::InvalidPolicy(e.to_string()))?;
            Ok(document.statements)
        }
        _ => Err(StorageError::InvalidPolicy(
            "statement fragment must be an array or a policy document".to_string(),
        )),
    }
}
