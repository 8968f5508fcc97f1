//! Cryptographic primitives for Lockbox.
//!
//! This module provides:
//! - Passphrase hashing into one-way lookup handles (SHA-256)
//! - Key derivation (PBKDF2-HMAC-SHA256, or Argon2id)
//! - Authenticated encryption (AES-256-GCM, or XChaCha20-Poly1305)
//! - The `CipherProvider` capability the vault engine is written against
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Decryption fails closed: a bad tag never yields partial plaintext

pub mod aead;
pub mod hash;
pub mod kdf;
pub mod keys;
pub mod provider;

pub use aead::{decrypt, encrypt, AeadAlgorithm};
pub use hash::{hash_passphrase, HANDLE_LENGTH};
pub use kdf::{derive_key, KdfParams, APP_SALT, PBKDF2_ITERATIONS};
pub use keys::{VaultKey, KEY_LENGTH};
pub use provider::{
    resolve_cipher, AeadCipherProvider, CipherProvider, AES_256_GCM, XCHACHA20_POLY1305,
};
