use keyring::Entry;
use tracing::debug;

use super::{normalize_secret, CredentialError, CredentialStore};

/// OS keychain entry addressed by a fixed `(service, account)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeychainCredentialStore {
    service: String,
    account: String,
}

impl KeychainCredentialStore {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    pub fn service(&self) -> &str {
        self.service.as_str()
    }

    pub fn account(&self) -> &str {
        self.account.as_str()
    }

    fn entry(&self) -> Result<Entry, CredentialError> {
        Entry::new(self.service.as_str(), self.account.as_str()).map_err(backend_error)
    }
}

impl CredentialStore for KeychainCredentialStore {
    fn set(&self, value: &str) -> Result<(), CredentialError> {
        let value = normalize_secret(value)?;
        self.entry()?.set_password(value).map_err(backend_error)?;
        debug!(service = %self.service, account = %self.account, "stored api key in keychain");
        Ok(())
    }

    fn get(&self) -> Result<Option<String>, CredentialError> {
        match self.entry()?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(backend_error(error)),
        }
    }

    fn clear(&self) -> Result<bool, CredentialError> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(error) => Err(backend_error(error)),
        }
    }
}

fn backend_error(error: keyring::Error) -> CredentialError {
    CredentialError::Backend(error.to_string())
}
