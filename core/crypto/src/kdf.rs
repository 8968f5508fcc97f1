//! Key derivation from a passphrase.
//!
//! Two derivations are available: PBKDF2-HMAC-SHA256, used with the
//! AES-256-GCM provider, and Argon2id, used with XChaCha20-Poly1305. Both run
//! against a single application-wide salt so the key can be re-derived on any
//! path from the passphrase alone, with no stored state.

use argon2::{Algorithm, Argon2, Params, Version};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::keys::{VaultKey, KEY_LENGTH};
use lockbox_common::{Error, Result};

/// Salt shared by every vault.
///
/// There is no per-vault salt. Changing this value makes every existing
/// stored slot and export undecryptable.
pub const APP_SALT: &[u8] = b"pAQoPLg8PTjsKuhpxGe8";

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 1000;

/// Parameters for key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum KdfParams {
    /// PBKDF2 with HMAC-SHA256.
    Pbkdf2Sha256 {
        /// Number of iterations.
        iterations: u32,
    },
    /// Argon2id.
    Argon2id {
        /// Memory cost in KiB (e.g., 32768 = 32 MiB).
        memory_cost: u32,
        /// Number of iterations.
        time_cost: u32,
        /// Degree of parallelism.
        parallelism: u32,
    },
}

impl KdfParams {
    /// The fixed PBKDF2 configuration.
    pub fn pbkdf2() -> Self {
        Self::Pbkdf2Sha256 {
            iterations: PBKDF2_ITERATIONS,
        }
    }

    /// Moderate Argon2id parameters, usable on mobile devices.
    pub fn argon2_moderate() -> Self {
        Self::Argon2id {
            memory_cost: 32768, // 32 MiB
            time_cost: 3,
            parallelism: 2,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::pbkdf2()
    }
}

/// Derive a vault key from a passphrase.
///
/// # Postconditions
/// - The derived key is deterministic given the same inputs
///
/// # Errors
/// - Returns error if the iteration count is zero
/// - Returns error if Argon2id parameters are invalid
///
/// # Security
/// - Passphrase is not stored or logged
pub fn derive_key(passphrase: &[u8], salt: &[u8], params: &KdfParams) -> Result<VaultKey> {
    let mut key_bytes = [0u8; KEY_LENGTH];

    match params {
        KdfParams::Pbkdf2Sha256 { iterations } => {
            if *iterations == 0 {
                return Err(Error::Crypto(
                    "PBKDF2 iteration count must be positive".to_string(),
                ));
            }
            pbkdf2_hmac::<Sha256>(passphrase, salt, *iterations, &mut key_bytes);
        }
        KdfParams::Argon2id {
            memory_cost,
            time_cost,
            parallelism,
        } => {
            let argon2_params =
                Params::new(*memory_cost, *time_cost, *parallelism, Some(KEY_LENGTH))
                    .map_err(|e| Error::Crypto(format!("Invalid KDF parameters: {}", e)))?;

            Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params)
                .hash_password_into(passphrase, salt, &mut key_bytes)
                .map_err(|e| Error::Crypto(format!("Key derivation failed: {}", e)))?;
        }
    }

    Ok(VaultKey::from_bytes(key_bytes))
}
