//! Vault manager for wiring sessions to providers.

use tracing::info;

use crate::config::EngineConfig;
use crate::session::VaultSession;
use lockbox_common::Result;
use lockbox_crypto::resolve_cipher;
use lockbox_storage::{create_default_registry, ProviderRegistry};

/// Vault manager for opening sessions.
pub struct VaultManager {
    registry: ProviderRegistry,
}

impl VaultManager {
    /// Create a new vault manager with default providers.
    pub fn new() -> Self {
        Self {
            registry: create_default_registry(),
        }
    }

    /// Create with custom registry.
    pub fn with_registry(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Get the provider registry.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Get mutable provider registry.
    pub fn registry_mut(&mut self) -> &mut ProviderRegistry {
        &mut self.registry
    }

    /// Open an empty session on the providers named in `config`.
    ///
    /// # Preconditions
    /// - Cipher and storage provider names must be known
    ///
    /// # Postconditions
    /// - Returns a session with no vault loaded
    ///
    /// # Errors
    /// - Provider not found
    /// - Invalid provider options
    /// - Storage root cannot be created
    pub fn open_session(&self, config: &EngineConfig) -> Result<VaultSession> {
        let cipher = resolve_cipher(&config.cipher)?;
        let storage = self
            .registry
            .resolve(&config.storage.provider, config.storage.options.clone())?;

        info!(
            cipher = cipher.name(),
            storage = storage.name(),
            "Opened vault session"
        );

        Ok(VaultSession::new(cipher, storage))
    }
}

impl Default for VaultManager {
    fn default() -> Self {
        Self::new()
    }
}
