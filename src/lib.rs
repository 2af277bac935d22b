pub mod api;
pub mod config;
pub mod contract;
pub mod credentials;
pub mod executor;
pub mod generator;
pub mod inventory;
pub mod shell;

use std::path::PathBuf;

pub fn default_openapi_contract_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("openapi/backend-api.openapi.yaml")
}
