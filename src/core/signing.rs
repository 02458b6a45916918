//! Signing config materialization.
//!
//! Writes the decoded keystore and the `key.properties` record the build
//! reads implicitly. Both files live inside the app's android directory and
//! are scoped to the run: the guard removes them on drop.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::secrets::SecretBundle;

/// Key alias used by the upload signing config. Constant by contract.
pub const KEY_ALIAS: &str = "upload";

/// File name of the materialized keystore, relative to the android dir.
pub const KEYSTORE_FILE: &str = "upload-keystore.jks";

/// File name of the signing properties record.
pub const KEY_PROPERTIES_FILE: &str = "key.properties";

/// Render the exact four-line properties record the build expects.
///
/// Key order and spelling are part of the contract; output is byte-identical
/// across runs for a fixed bundle.
pub fn key_properties_contents(bundle: &SecretBundle) -> String {
    format!(
        "storePassword={}\nkeyPassword={}\nkeyAlias={}\nstoreFile={}\n",
        bundle.store_password, bundle.key_password, KEY_ALIAS, KEYSTORE_FILE
    )
}

/// Run-scoped signing material on disk.
///
/// Dropping the guard deletes both files. Removal is idempotent; files
/// already gone are not an error.
#[derive(Debug)]
pub struct SigningMaterials {
    keystore_path: PathBuf,
    properties_path: PathBuf,
    cleaned: bool,
}

impl SigningMaterials {
    /// Decode the keystore and write both signing files under `android_dir`.
    ///
    /// The keystore lands at `<android_dir>/app/upload-keystore.jks` and the
    /// properties file at `<android_dir>/key.properties`, matching the paths
    /// the build configuration resolves.
    pub fn materialize(android_dir: &Path, bundle: &SecretBundle) -> Result<Self> {
        let keystore = bundle.decode_keystore()?;

        let app_dir = android_dir.join("app");
        fs::create_dir_all(&app_dir).map_err(|e| {
            Error::internal_io(e.to_string(), Some("create android app dir".to_string()))
        })?;

        let keystore_path = app_dir.join(KEYSTORE_FILE);
        fs::write(&keystore_path, &keystore)
            .map_err(|e| Error::internal_io(e.to_string(), Some("write keystore".to_string())))?;

        let properties_path = android_dir.join(KEY_PROPERTIES_FILE);
        fs::write(&properties_path, key_properties_contents(bundle))
            .map_err(|e| Error::internal_io(e.to_string(), Some("write key.properties".to_string())))?;

        Ok(Self {
            keystore_path,
            properties_path,
            cleaned: false,
        })
    }

    pub fn keystore_path(&self) -> &Path {
        &self.keystore_path
    }

    pub fn properties_path(&self) -> &Path {
        &self.properties_path
    }

    /// Remove the materialized files now instead of waiting for drop.
    pub fn cleanup(&mut self) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for path in [&self.keystore_path, &self.properties_path] {
            match fs::remove_file(path) {
                Ok(()) => removed.push(path.display().to_string()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(Error::internal_io(
                        e.to_string(),
                        Some(format!("remove {}", path.display())),
                    ))
                }
            }
        }
        self.cleaned = true;
        Ok(removed)
    }
}

impl Drop for SigningMaterials {
    fn drop(&mut self) {
        if !self.cleaned {
            let _ = fs::remove_file(&self.keystore_path);
            let _ = fs::remove_file(&self.properties_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretBundle;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use tempfile::TempDir;

    fn bundle() -> SecretBundle {
        SecretBundle::new(BASE64.encode(b"fake keystore bytes"), "store-pass", "key-pass")
    }

    #[test]
    fn properties_record_is_exactly_four_lines() {
        let contents = key_properties_contents(&bundle());
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "storePassword=store-pass",
                "keyPassword=key-pass",
                "keyAlias=upload",
                "storeFile=upload-keystore.jks",
            ]
        );
    }

    #[test]
    fn properties_record_is_deterministic() {
        let bundle = bundle();
        assert_eq!(
            key_properties_contents(&bundle),
            key_properties_contents(&bundle)
        );
    }

    #[test]
    fn materialize_writes_keystore_and_properties() {
        let dir = TempDir::new().unwrap();
        let materials = SigningMaterials::materialize(dir.path(), &bundle()).unwrap();

        assert_eq!(
            fs::read(materials.keystore_path()).unwrap(),
            b"fake keystore bytes"
        );
        let properties = fs::read_to_string(materials.properties_path()).unwrap();
        assert!(properties.ends_with("storeFile=upload-keystore.jks\n"));
        assert_eq!(
            materials.keystore_path(),
            dir.path().join("app").join(KEYSTORE_FILE)
        );
        assert_eq!(
            materials.properties_path(),
            dir.path().join(KEY_PROPERTIES_FILE)
        );
    }

    #[test]
    fn drop_removes_both_files() {
        let dir = TempDir::new().unwrap();
        let keystore_path;
        let properties_path;
        {
            let materials = SigningMaterials::materialize(dir.path(), &bundle()).unwrap();
            keystore_path = materials.keystore_path().to_path_buf();
            properties_path = materials.properties_path().to_path_buf();
            assert!(keystore_path.exists());
            assert!(properties_path.exists());
        }
        assert!(!keystore_path.exists());
        assert!(!properties_path.exists());
    }

    #[test]
    fn cleanup_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut materials = SigningMaterials::materialize(dir.path(), &bundle()).unwrap();

        let removed = materials.cleanup().unwrap();
        assert_eq!(removed.len(), 2);

        let removed_again = materials.cleanup().unwrap();
        assert!(removed_again.is_empty());
    }

    #[test]
    fn invalid_bundle_fails_before_any_write() {
        let dir = TempDir::new().unwrap();
        let bad = SecretBundle::new("%%%", "a", "b");
        assert!(SigningMaterials::materialize(dir.path(), &bad).is_err());
        assert!(!dir.path().join(KEY_PROPERTIES_FILE).exists());
        assert!(!dir.path().join("app").join(KEYSTORE_FILE).exists());
    }
}
