//! Passphrase hashing for identity and storage lookup.
//!
//! The handle is the SHA-256 digest of the passphrase, base64 encoded. It is
//! fast by construction and must never feed key derivation.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

use lockbox_common::{Handle, Passphrase, Result};

/// Encoded handle length: 32 digest bytes in padded base64.
pub const HANDLE_LENGTH: usize = 44;

/// Hash a passphrase into its lookup handle.
///
/// # Postconditions
/// - Deterministic: the same passphrase always yields the same handle
/// - Always `HANDLE_LENGTH` characters long
pub fn hash_passphrase(passphrase: &Passphrase) -> Result<Handle> {
    let digest = Sha256::digest(passphrase.as_bytes());
    Handle::new(STANDARD.encode(digest))
}
