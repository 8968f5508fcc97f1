//! Cipher provider capability.
//!
//! The vault engine never calls the primitives directly; it holds an
//! `Arc<dyn CipherProvider>` chosen once at startup by name. Every operation
//! runs on the blocking pool so async callers are suspended, not stalled.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::aead::{self, AeadAlgorithm};
use crate::hash::hash_passphrase;
use crate::kdf::{derive_key, KdfParams, APP_SALT};
use crate::keys::VaultKey;
use lockbox_common::{Envelope, Error, Handle, Passphrase, Result, SensitiveBytes};

/// Name of the AES-256-GCM / PBKDF2 provider.
pub const AES_256_GCM: &str = "aes-256-gcm";

/// Name of the XChaCha20-Poly1305 / Argon2id provider.
pub const XCHACHA20_POLY1305: &str = "xchacha20-poly1305";

/// Hashing, key derivation and authenticated encryption behind one interface.
#[async_trait]
pub trait CipherProvider: Send + Sync {
    /// Get the provider name (e.g., "aes-256-gcm").
    fn name(&self) -> &str;

    /// Hash a passphrase into its lookup handle.
    async fn hash(&self, passphrase: &Passphrase) -> Result<Handle>;

    /// Derive the symmetric key for a passphrase.
    ///
    /// # Postconditions
    /// - The same passphrase yields the same key on every call
    async fn derive_key(&self, passphrase: &Passphrase) -> Result<VaultKey>;

    /// Encrypt a payload under a fresh random nonce.
    async fn encrypt(&self, plaintext: &[u8], key: &VaultKey) -> Result<Envelope>;

    /// Decrypt an envelope.
    ///
    /// # Errors
    /// - `Error::Authentication` on wrong key or tampered data
    async fn decrypt(&self, envelope: &Envelope, key: &VaultKey) -> Result<SensitiveBytes>;
}

/// Provider backed by an AEAD construction and a passphrase KDF.
#[derive(Debug, Clone)]
pub struct AeadCipherProvider {
    name: &'static str,
    algorithm: AeadAlgorithm,
    kdf: KdfParams,
}

impl AeadCipherProvider {
    /// AES-256-GCM with PBKDF2-HMAC-SHA256 key derivation.
    pub fn aes_256_gcm() -> Self {
        Self {
            name: AES_256_GCM,
            algorithm: AeadAlgorithm::Aes256Gcm,
            kdf: KdfParams::pbkdf2(),
        }
    }

    /// XChaCha20-Poly1305 with Argon2id key derivation.
    pub fn xchacha20_poly1305() -> Self {
        Self::xchacha20_poly1305_with(KdfParams::argon2_moderate())
    }

    /// XChaCha20-Poly1305 with custom Argon2id parameters.
    pub fn xchacha20_poly1305_with(kdf: KdfParams) -> Self {
        Self {
            name: XCHACHA20_POLY1305,
            algorithm: AeadAlgorithm::XChaCha20Poly1305,
            kdf,
        }
    }

    /// The AEAD construction in use.
    pub fn algorithm(&self) -> AeadAlgorithm {
        self.algorithm
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| Error::Crypto(format!("Crypto worker failed: {}", e)))?
}

#[async_trait]
impl CipherProvider for AeadCipherProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn hash(&self, passphrase: &Passphrase) -> Result<Handle> {
        let passphrase = passphrase.clone();
        run_blocking(move || hash_passphrase(&passphrase)).await
    }

    async fn derive_key(&self, passphrase: &Passphrase) -> Result<VaultKey> {
        let passphrase = passphrase.clone();
        let kdf = self.kdf.clone();
        debug!(provider = self.name, "Deriving vault key");
        run_blocking(move || derive_key(passphrase.as_bytes(), APP_SALT, &kdf)).await
    }

    async fn encrypt(&self, plaintext: &[u8], key: &VaultKey) -> Result<Envelope> {
        let plaintext = SensitiveBytes::new(plaintext.to_vec());
        let key = key.clone();
        let algorithm = self.algorithm;
        run_blocking(move || aead::encrypt(algorithm, &key, plaintext.as_bytes())).await
    }

    async fn decrypt(&self, envelope: &Envelope, key: &VaultKey) -> Result<SensitiveBytes> {
        let envelope = envelope.clone();
        let key = key.clone();
        let algorithm = self.algorithm;
        run_blocking(move || aead::decrypt(algorithm, &key, &envelope)).await
    }
}

/// Resolve a cipher provider by its configured name.
///
/// # Errors
/// - `Error::NotFound` for an unknown name
pub fn resolve_cipher(name: &str) -> Result<Arc<dyn CipherProvider>> {
    match name {
        AES_256_GCM => Ok(Arc::new(AeadCipherProvider::aes_256_gcm())),
        XCHACHA20_POLY1305 => Ok(Arc::new(AeadCipherProvider::xchacha20_poly1305())),
        other => Err(Error::NotFound(format!(
            "Cipher provider '{}' is not available",
            other
        ))),
    }
}
