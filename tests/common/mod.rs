#![allow(dead_code)]

use axum_test::TestServer;
use std::sync::Arc;
use tempfile::TempDir;

use freight_pricing::build_router;
use freight_pricing::config::{EnvironmentConfig, PricingRules};
use freight_pricing::repositories::memory::MemoryStore;
use freight_pricing::state::{AppState, Repositories};

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub upload_dir: TempDir,
}

/// Router real sobre almacenamiento en memoria y sin proveedor de rutas
pub fn create_test_app() -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());

    let config = EnvironmentConfig {
        upload_dir: upload_dir.path().to_path_buf(),
        ..EnvironmentConfig::default()
    };
    let state = AppState::new(
        config,
        PricingRules::default(),
        Repositories::in_memory(store.clone()),
        None,
    );

    TestApp {
        server: TestServer::new(build_router(state)).unwrap(),
        store,
        upload_dir,
    }
}
