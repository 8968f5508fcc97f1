//! Common types used throughout Lockbox.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Error, Result};

/// One-way lookup handle derived from a passphrase.
///
/// Handles key the storage slots and are compared against the hash recorded
/// inside a decrypted vault. They are never used as key material.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// Create a new Handle from its textual encoding.
    ///
    /// # Errors
    /// - Returns error if the handle is empty
    pub fn new(handle: impl Into<String>) -> Result<Self> {
        let handle = handle.into();
        if handle.is_empty() {
            return Err(Error::InvalidInput("Handle cannot be empty".to_string()));
        }
        Ok(Self(handle))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user passphrase, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wrap a passphrase string.
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self(passphrase.into())
    }

    /// Get the passphrase text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the UTF-8 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in characters, which is what the passphrase policy counts.
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl PartialEq for Passphrase {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Passphrase {}

impl From<String> for Passphrase {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passphrase([REDACTED])")
    }
}

/// Nonce plus ciphertext: the only form of a vault that leaves memory.
///
/// Serialized as `{"cipherText": [u8...], "iv": [u8...]}` so that stored
/// slots and export files are plain text and byte-for-byte interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "cipherText")]
    pub cipher_text: Vec<u8>,
    pub iv: Vec<u8>,
}

impl Envelope {
    /// Create an envelope from its parts.
    pub fn new(cipher_text: Vec<u8>, iv: Vec<u8>) -> Self {
        Self { cipher_text, iv }
    }

    /// Serialize to the textual envelope format.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Format(e.to_string()))
    }

    /// Serialize to bytes for storage or export.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Format(e.to_string()))
    }

    /// Parse an envelope from stored or imported bytes.
    ///
    /// # Errors
    /// - `Error::Format` if the bytes are not an envelope document
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Format(format!("Invalid envelope: {}", e)))
    }
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Create new sensitive bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}
