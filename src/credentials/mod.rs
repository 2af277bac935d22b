//! Storage for the single provider API key.
//!
//! The key lives in the operating system's secret store; the backend only
//! passes it through to the completion client and never writes it anywhere
//! else.

mod keychain;
mod memory;

use std::sync::Arc;

use thiserror::Error;

pub use keychain::KeychainCredentialStore;
pub use memory::MemoryCredentialStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("No API key provided")]
    EmptyValue,
    #[error("credential store unavailable: {0}")]
    Backend(String),
}

/// Set, read and clear one secret. Every call goes to the backing store;
/// implementations do not cache.
pub trait CredentialStore: Send + Sync + 'static {
    fn set(&self, value: &str) -> Result<(), CredentialError>;
    fn get(&self) -> Result<Option<String>, CredentialError>;
    /// Returns whether a value existed before the call.
    fn clear(&self) -> Result<bool, CredentialError>;
}

pub type SharedCredentialStore = Arc<dyn CredentialStore>;

fn normalize_secret(value: &str) -> Result<&str, CredentialError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::EmptyValue);
    }
    Ok(trimmed)
}
