//! Test helpers: build the application router over a temporary local backend.
//!
//! Run from workspace root: `cargo test -p orgstore-api`.

pub mod auth;

use axum_test::TestServer;
use orgstore_api::setup::initialize_app;
use orgstore_core::Config;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Context route path (e.g. `/v2.0/context/organization/acme`).
pub fn context_path(path: &str) -> String {
    format!("{}{}", orgstore_api::constants::ORGANIZATION_CONTEXT_PATH, path)
}

/// Test application: server plus the directory backing local storage.
pub struct TestApp {
    pub server: TestServer,
    pub root: PathBuf,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn storage_root(&self) -> &Path {
        &self.root
    }
}

fn test_config(root: &Path) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("JWT_SECRET", auth::TEST_JWT_SECRET.to_string()),
        ("STORAGE_BACKEND", "local".to_string()),
        ("LOCAL_STORAGE_ROOT", root.display().to_string()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).expect("Failed to build test config")
}

/// Setup test app with local storage in a fresh temp directory.
pub async fn setup_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let root = temp_dir.path().join("orgs");
    let config = test_config(&root);

    let (_state, router) = initialize_app(config, CancellationToken::new())
        .await
        .expect("Failed to initialize app");
    let server = TestServer::new(router.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        root,
        _temp_dir: temp_dir,
    }
}
