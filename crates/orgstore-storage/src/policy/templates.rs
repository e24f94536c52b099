//! Policy templates and their loaders.
//!
//! Templates are JSON text with the literal placeholders `${bucket}`,
//! `${organization}` and `${space}`, substituted verbatim before parsing.

use std::path::PathBuf;

use async_trait::async_trait;
use orgstore_core::{ScopedRole, Space};

use crate::traits::{StorageError, StorageResult};

/// The six named templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyTemplate {
    SpaceAdmin,
    SpaceTrustee,
    SpaceUser,
    SpaceSupplier,
    /// Statement fragment a public space contributes to the aggregate.
    SpacePublic,
    /// Skeleton of the aggregate, used when it does not exist yet.
    AllPublic,
}

impl PolicyTemplate {
    pub fn for_role(role: ScopedRole) -> Self {
        match role {
            ScopedRole::Admin => PolicyTemplate::SpaceAdmin,
            ScopedRole::Trustee => PolicyTemplate::SpaceTrustee,
            ScopedRole::User => PolicyTemplate::SpaceUser,
            ScopedRole::Supplier => PolicyTemplate::SpaceSupplier,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            PolicyTemplate::SpaceAdmin => "iam_policy_space_admin_tpl.json",
            PolicyTemplate::SpaceTrustee => "iam_policy_space_trustee_tpl.json",
            PolicyTemplate::SpaceUser => "iam_policy_space_user_tpl.json",
            PolicyTemplate::SpaceSupplier => "iam_policy_space_supplier_tpl.json",
            PolicyTemplate::SpacePublic => "iam_policy_space_public_tpl.json",
            PolicyTemplate::AllPublic => "iam_policy_space_all_public_tpl.json",
        }
    }

    fn embedded(self) -> &'static str {
        match self {
            PolicyTemplate::SpaceAdmin => {
                include_str!("../../templates/iam_policy_space_admin_tpl.json")
            }
            PolicyTemplate::SpaceTrustee => {
                include_str!("../../templates/iam_policy_space_trustee_tpl.json")
            }
            PolicyTemplate::SpaceUser => {
                include_str!("../../templates/iam_policy_space_user_tpl.json")
            }
            PolicyTemplate::SpaceSupplier => {
                include_str!("../../templates/iam_policy_space_supplier_tpl.json")
            }
            PolicyTemplate::SpacePublic => {
                include_str!("../../templates/iam_policy_space_public_tpl.json")
            }
            PolicyTemplate::AllPublic => {
                include_str!("../../templates/iam_policy_space_all_public_tpl.json")
            }
        }
    }
}

/// Substitute the placeholders of a template for one space.
pub fn render(template: &str, bucket: &str, space: &Space) -> String {
    template
        .replace("${bucket}", bucket)
        .replace("${organization}", space.organization_name())
        .replace("${space}", &space.name)
}

/// Returns the literal text of a named template.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn load(&self, template: PolicyTemplate) -> StorageResult<String>;
}

/// Templates compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTemplates;

#[async_trait]
impl TemplateSource for EmbeddedTemplates {
    async fn load(&self, template: PolicyTemplate) -> StorageResult<String> {
        Ok(template.embedded().to_string())
    }
}

/// Templates read from a directory at call time.
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    dir: PathBuf,
}

impl DirectoryTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TemplateSource for DirectoryTemplates {
    async fn load(&self, template: PolicyTemplate) -> StorageResult<String> {
        let path = self.dir.join(template.file_name());
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| StorageError::TemplateLoad {
                name: template.file_name().to_string(),
                reason: format!("{}: {}", path.display(), e),
            })
    }
}
