//! Keychain storage for publish tokens.
//!
//! Uses the system keychain (macOS Keychain, Linux Secret Service, Windows
//! Credential Manager) so tokens never live in config files.

use keyring::Entry;
use serde_json::Value;

use crate::error::{Error, ErrorCode, Result};

const SERVICE_NAME: &str = "tagship";

fn keyring_error(e: keyring::Error) -> Error {
    Error::new(
        ErrorCode::InternalUnexpected,
        format!("Keychain error: {}", e),
        Value::Null,
    )
}

/// Stores a value in the keychain for an app variable.
///
/// Key format: `<app-id>:<variable-name>`
pub fn store(app_id: &str, variable_name: &str, value: &str) -> Result<()> {
    let key = format!("{}:{}", app_id, variable_name);
    let entry = Entry::new(SERVICE_NAME, &key).map_err(keyring_error)?;
    entry.set_password(value).map_err(keyring_error)?;
    Ok(())
}

/// Retrieves a value from the keychain for an app variable.
///
/// Returns `None` if the key doesn't exist.
pub fn get(app_id: &str, variable_name: &str) -> Result<Option<String>> {
    let key = format!("{}:{}", app_id, variable_name);
    let entry = Entry::new(SERVICE_NAME, &key).map_err(keyring_error)?;

    match entry.get_password() {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(keyring_error(e)),
    }
}

/// Deletes a value from the keychain.
pub fn delete(app_id: &str, variable_name: &str) -> Result<()> {
    let key = format!("{}:{}", app_id, variable_name);
    let entry = Entry::new(SERVICE_NAME, &key).map_err(keyring_error)?;

    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
        Err(e) => Err(keyring_error(e)),
    }
}
