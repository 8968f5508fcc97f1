//! Engine configuration.
//!
//! Picks the cipher provider and the storage provider once, at startup.
//! Stored as JSON, e.g.
//!
//! ```json
//! {
//!   "cipher": "aes-256-gcm",
//!   "storage": { "provider": "local", "options": { "root": "/home/me/.lockbox" } }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use lockbox_common::{Error, Result};
use lockbox_crypto::AES_256_GCM;

/// Default storage provider name.
pub const DEFAULT_STORAGE_PROVIDER: &str = "local";

/// Configuration file name looked up in the data directory.
pub const CONFIG_FILENAME: &str = "lockbox.json";

fn default_cipher() -> String {
    AES_256_GCM.to_string()
}

/// Storage provider selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Registered provider name (e.g., "local", "memory").
    pub provider: String,
    /// Provider-specific options.
    #[serde(default)]
    pub options: serde_json::Value,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_STORAGE_PROVIDER.to_string(),
            options: serde_json::Value::Object(Default::default()),
        }
    }
}

/// Which providers the engine runs on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cipher provider name (e.g., "aes-256-gcm").
    #[serde(default = "default_cipher")]
    pub cipher: String,
    /// Storage provider selection.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cipher: default_cipher(),
            storage: StorageConfig::default(),
        }
    }
}

impl EngineConfig {
    /// In-memory storage, mostly for tests.
    pub fn memory() -> Self {
        Self {
            storage: StorageConfig {
                provider: "memory".to_string(),
                options: serde_json::Value::Null,
            },
            ..Self::default()
        }
    }

    /// Local storage rooted at `root`.
    pub fn local(root: impl AsRef<Path>) -> Self {
        let mut config = Self::default();
        config.set_data_dir(root);
        config
    }

    /// Point the local provider at a different root directory.
    pub fn set_data_dir(&mut self, root: impl AsRef<Path>) {
        let root = root.as_ref().to_string_lossy().to_string();
        match &mut self.storage.options {
            serde_json::Value::Object(options) => {
                options.insert("root".to_string(), serde_json::Value::String(root));
            }
            other => *other = serde_json::json!({ "root": root }),
        }
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("Invalid configuration: {}", e)))
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidInput(format!("Invalid configuration: {}", e)))
    }

    /// Load configuration from a file.
    ///
    /// # Errors
    /// - I/O error if the file cannot be read
    /// - `Error::InvalidInput` if the contents are not a valid configuration
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cipher, "aes-256-gcm");
        assert_eq!(config.storage.provider, "local");
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"storage":{"provider":"memory"}}"#).unwrap();
        assert_eq!(config.cipher, "aes-256-gcm");
        assert_eq!(config.storage.provider, "memory");
        assert!(config.storage.options.is_null());
    }

    #[test]
    fn test_set_data_dir() {
        let config = EngineConfig::local("/tmp/lockbox");
        assert_eq!(config.storage.options["root"], "/tmp/lockbox");

        let mut memory = EngineConfig::memory();
        memory.set_data_dir("/srv/lockbox");
        assert_eq!(memory.storage.options["root"], "/srv/lockbox");
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILENAME);
        let config = EngineConfig {
            cipher: "xchacha20-poly1305".to_string(),
            ..EngineConfig::local(temp.path())
        };
        std::fs::write(&path, config.to_json().unwrap()).unwrap();

        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"cipher": 5}"#),
            Err(Error::InvalidInput(_))
        ));
    }
}
