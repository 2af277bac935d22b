use std::sync::{Mutex, MutexGuard};

use super::{normalize_secret, CredentialError, CredentialStore};

/// Process-local store for tests and for running without a keychain.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    value: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }

    fn slot(&self) -> Result<MutexGuard<'_, Option<String>>, CredentialError> {
        self.value
            .lock()
            .map_err(|_| CredentialError::Backend(String::from("credential lock poisoned")))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn set(&self, value: &str) -> Result<(), CredentialError> {
        let value = normalize_secret(value)?;
        *self.slot()? = Some(value.to_string());
        Ok(())
    }

    fn get(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.slot()?.clone())
    }

    fn clear(&self) -> Result<bool, CredentialError> {
        Ok(self.slot()?.take().is_some())
    }
}
