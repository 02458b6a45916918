//! Secret Bundle acquisition and keystore decoding.
//!
//! The three signing secrets arrive through the environment and exist only
//! for the lifetime of a run. Values are never logged, serialized, or echoed
//! back in error payloads.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{Error, Result};

pub const KEYSTORE_BASE64_VAR: &str = "ANDROID_KEYSTORE_BASE64";
pub const STORE_PASSWORD_VAR: &str = "ANDROID_STORE_PASSWORD";
pub const KEY_PASSWORD_VAR: &str = "ANDROID_KEY_PASSWORD";

#[derive(Clone)]
pub struct SecretBundle {
    pub keystore_base64: String,
    pub store_password: String,
    pub key_password: String,
}

impl std::fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBundle")
            .field("keystore_base64", &"<redacted>")
            .field("store_password", &"<redacted>")
            .field("key_password", &"<redacted>")
            .finish()
    }
}

impl SecretBundle {
    pub fn new(
        keystore_base64: impl Into<String>,
        store_password: impl Into<String>,
        key_password: impl Into<String>,
    ) -> Self {
        Self {
            keystore_base64: keystore_base64.into(),
            store_password: store_password.into(),
            key_password: key_password.into(),
        }
    }

    /// Read the bundle from the environment. All three variables must be set
    /// and non-empty; the error lists every absent name at once.
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();
        let mut read = |name: &str| match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Some(value),
            _ => {
                missing.push(name.to_string());
                None
            }
        };

        let keystore = read(KEYSTORE_BASE64_VAR);
        let store_password = read(STORE_PASSWORD_VAR);
        let key_password = read(KEY_PASSWORD_VAR);

        if !missing.is_empty() {
            return Err(Error::secrets_missing(missing));
        }

        // Unwraps cannot fail: missing is empty
        Ok(Self {
            keystore_base64: keystore.unwrap(),
            store_password: store_password.unwrap(),
            key_password: key_password.unwrap(),
        })
    }

    /// Decode the keystore blob. Whitespace is tolerated the same way a
    /// `base64 --decode` pipe tolerates it; anything else malformed is fatal.
    pub fn decode_keystore(&self) -> Result<Vec<u8>> {
        let compact: String = self
            .keystore_base64
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        BASE64
            .decode(compact.as_bytes())
            .map_err(|e| Error::secrets_decode_failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_with_keystore(encoded: &str) -> SecretBundle {
        SecretBundle::new(encoded, "store-pass", "key-pass")
    }

    #[test]
    fn decode_round_trips_original_bytes() {
        let original: Vec<u8> = (0u8..=255).collect();
        let encoded = BASE64.encode(&original);
        let decoded = bundle_with_keystore(&encoded).decode_keystore().unwrap();
        assert_eq!(decoded, original);
        assert_eq!(BASE64.encode(&decoded), encoded);
    }

    #[test]
    fn decode_tolerates_embedded_newlines() {
        let original = b"keystore binary contents";
        let mut encoded = BASE64.encode(original);
        encoded.insert(8, '\n');
        encoded.push('\n');
        let decoded = bundle_with_keystore(&encoded).decode_keystore().unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn malformed_base64_is_fatal() {
        let err = bundle_with_keystore("not*valid*base64!")
            .decode_keystore()
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::SecretsDecodeFailed);
    }

    #[test]
    fn truncated_payload_is_fatal() {
        let encoded = BASE64.encode(b"some keystore");
        let truncated = &encoded[..encoded.len() - 1];
        assert!(bundle_with_keystore(truncated).decode_keystore().is_err());
    }

    #[test]
    fn debug_never_exposes_values() {
        let bundle = SecretBundle::new("c2VjcmV0", "hunter2", "hunter3");
        let rendered = format!("{:?}", bundle);
        assert!(!rendered.contains("c2VjcmV0"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
