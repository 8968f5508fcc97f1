//! Provider registry for dynamic provider resolution.

use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::local::LocalProvider;
use crate::memory::MemoryProvider;
use crate::provider::StorageProvider;
use lockbox_common::{Error, Result};

/// Factory function type for creating providers.
pub type ProviderFactory = Box<dyn Fn(Value) -> Result<Arc<dyn StorageProvider>> + Send + Sync>;

/// Registry for storage provider factories.
///
/// Allows dynamic registration and resolution of storage providers
/// by name and configuration.
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a provider factory.
    ///
    /// # Errors
    /// - Returns error if name is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: ProviderFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::AlreadyExists(format!(
                "Provider '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Resolve a provider by name and configuration.
    ///
    /// # Errors
    /// - Provider not found
    /// - Configuration invalid
    pub fn resolve(&self, name: &str, config: Value) -> Result<Arc<dyn StorageProvider>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Provider '{}' is not registered", name)))?;
        factory(config)
    }

    /// Get list of registered provider names.
    pub fn providers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Check if a provider is registered.
    pub fn has_provider(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn optional_path(config: &Value, key: &str) -> Result<Option<PathBuf>> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(PathBuf::from(s))),
        Some(_) => Err(Error::InvalidInput(format!(
            "Local provider option '{}' must be a string",
            key
        ))),
    }
}

fn local_factory(config: Value) -> Result<Arc<dyn StorageProvider>> {
    let root = match optional_path(&config, "root")? {
        Some(root) => root,
        None => LocalProvider::default_root()?,
    };

    let provider = match optional_path(&config, "export_dir")? {
        Some(export_dir) => LocalProvider::with_export_dir(root, export_dir)?,
        None => LocalProvider::new(root)?,
    };
    Ok(Arc::new(provider))
}

/// Create a registry with default providers.
///
/// - `memory`: ignores its configuration
/// - `local`: `{"root": <dir>, "export_dir": <dir>}`, both optional
pub fn create_default_registry() -> ProviderRegistry {
    let mut factories: HashMap<String, ProviderFactory> = HashMap::new();

    factories.insert(
        "memory".to_string(),
        Box::new(|_config| Ok(Arc::new(MemoryProvider::new()))),
    );
    factories.insert("local".to_string(), Box::new(local_factory));

    ProviderRegistry { factories }
}
