use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use orgstore_core::constants::LOADINGZONE;
use orgstore_core::naming::{organization_dir, space_dir};
use orgstore_core::{Organization, Space};
use tokio::fs;

use crate::traits::{StorageError, StorageProvider, StorageResult};
use crate::StorageBackend;

/// Local filesystem provider: one directory per organization, one subdirectory per space.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `root` - Directory holding one subdirectory per organization (e.g., "/var/lib/orgstore")
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(LocalStorage { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns whether the directory was created.
    async fn ensure_dir(&self, path: &Path) -> StorageResult<bool> {
        if fs::try_exists(path).await? {
            tracing::warn!(path = %path.display(), "Directory already exists");
            return Ok(false);
        }
        fs::create_dir_all(path).await?;
        tracing::info!(path = %path.display(), "Directory created");
        Ok(true)
    }

    async fn remove_dir(&self, path: &Path) -> StorageResult<()> {
        match fs::remove_dir_all(path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Directory deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Directory already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn create_organization_storage(&self, organization: &Organization) -> StorageResult<()> {
        self.ensure_dir(&organization_dir(&self.root, &organization.name))
            .await
            .map(|_| ())
    }

    async fn create_loadingzone(&self, organization: &Organization) -> StorageResult<()> {
        self.ensure_dir(&space_dir(&self.root, &organization.name, LOADINGZONE))
            .await
            .map(|_| ())
    }

    async fn create_space_storage(&self, space: &Space) -> StorageResult<bool> {
        // create_dir_all creates a missing organization directory first
        self.ensure_dir(&space_dir(
            &self.root,
            space.organization_name(),
            &space.name,
        ))
        .await
    }

    async fn delete_organization_storage(&self, organization: &Organization) -> StorageResult<()> {
        self.remove_dir(&organization_dir(&self.root, &organization.name))
            .await
    }

    async fn delete_space_storage(&self, space: &Space) -> StorageResult<()> {
        self.remove_dir(&space_dir(
            &self.root,
            space.organization_name(),
            &space.name,
        ))
        .await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgstore_core::Confidentiality;
    use tempfile::TempDir;

    async fn storage() -> (LocalStorage, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn test_space_creates_missing_organization_dir() {
        let (storage, dir) = storage().await;
        let space = Space::new(Organization::new("acme"), "reports", Confidentiality::Private);

        assert!(storage.create_space_storage(&space).await.unwrap());
        assert!(dir.path().join("acme").is_dir());
        assert!(dir.path().join("acme/reports").is_dir());
        assert!(!storage.create_space_storage(&space).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_twice_is_idempotent() {
        let (storage, dir) = storage().await;
        let acme = Organization::new("acme");
        storage.create_organization_storage(&acme).await.unwrap();
        storage.create_loadingzone(&acme).await.unwrap();
        tokio::fs::write(dir.path().join("acme/loadingzone/file.txt"), b"data")
            .await
            .unwrap();

        storage.create_organization_storage(&acme).await.unwrap();
        storage.create_loadingzone(&acme).await.unwrap();
        assert!(dir.path().join("acme/loadingzone/file.txt").is_file());
    }

    #[tokio::test]
    async fn test_delete_is_recursive_and_tolerates_absence() {
        let (storage, dir) = storage().await;
        let acme = Organization::new("acme");
        let space = Space::new(acme.clone(), "reports", Confidentiality::Internal);
        storage.create_space_storage(&space).await.unwrap();
        tokio::fs::write(dir.path().join("acme/reports/q1.csv"), b"1,2")
            .await
            .unwrap();

        storage.delete_space_storage(&space).await.unwrap();
        assert!(!dir.path().join("acme/reports").exists());
        storage.delete_space_storage(&space).await.unwrap();

        storage.delete_organization_storage(&acme).await.unwrap();
        assert!(!dir.path().join("acme").exists());
        storage.delete_organization_storage(&acme).await.unwrap();
    }
}
