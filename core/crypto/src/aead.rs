//! Authenticated encryption of vault payloads.
//!
//! Every call to [`encrypt`] draws a fresh random nonce, which travels next to
//! the ciphertext in the [`Envelope`]. [`decrypt`] verifies the tag before
//! returning anything; any failure is reported as `Error::Authentication`.

use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm,
};
use chacha20poly1305::XChaCha20Poly1305;
use serde::{Deserialize, Serialize};

use crate::keys::VaultKey;
use lockbox_common::{Envelope, Error, Result, SensitiveBytes};

/// Authentication tag size (16 bytes) for both algorithms.
pub const TAG_SIZE: usize = 16;

/// Supported AEAD constructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AeadAlgorithm {
    /// AES-256 in GCM mode, 96-bit nonce.
    Aes256Gcm,
    /// XChaCha20-Poly1305, 192-bit nonce.
    XChaCha20Poly1305,
}

impl AeadAlgorithm {
    /// Nonce length in bytes.
    pub fn nonce_size(&self) -> usize {
        match self {
            AeadAlgorithm::Aes256Gcm => 12,
            AeadAlgorithm::XChaCha20Poly1305 => 24,
        }
    }
}

/// Encrypt a plaintext payload into an envelope.
///
/// # Postconditions
/// - `iv` is a freshly generated random nonce of `algorithm.nonce_size()` bytes
/// - `cipher_text` is the ciphertext followed by the authentication tag
///
/// # Errors
/// - Returns error if the underlying cipher fails
pub fn encrypt(algorithm: AeadAlgorithm, key: &VaultKey, plaintext: &[u8]) -> Result<Envelope> {
    let key = GenericArray::from_slice(key.as_bytes());

    let (iv, cipher_text) = match algorithm {
        AeadAlgorithm::Aes256Gcm => {
            let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
            let ct = Aes256Gcm::new(key)
                .encrypt(&nonce, plaintext)
                .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;
            (nonce.to_vec(), ct)
        }
        AeadAlgorithm::XChaCha20Poly1305 => {
            let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
            let ct = XChaCha20Poly1305::new(key)
                .encrypt(&nonce, plaintext)
                .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;
            (nonce.to_vec(), ct)
        }
    };

    Ok(Envelope::new(cipher_text, iv))
}

/// Decrypt an envelope back into its plaintext payload.
///
/// # Errors
/// - `Error::Authentication` if the tag does not verify, the nonce has the
///   wrong length, or the ciphertext is shorter than a tag. These cases are
///   not distinguished.
///
/// # Security
/// - Authenticates before returning; no partial output on failure
pub fn decrypt(algorithm: AeadAlgorithm, key: &VaultKey, envelope: &Envelope) -> Result<SensitiveBytes> {
    if envelope.iv.len() != algorithm.nonce_size() || envelope.cipher_text.len() < TAG_SIZE {
        return Err(Error::Authentication);
    }

    let key = GenericArray::from_slice(key.as_bytes());
    let nonce = envelope.iv.as_slice();
    let cipher_text = envelope.cipher_text.as_slice();

    let plaintext = match algorithm {
        AeadAlgorithm::Aes256Gcm => {
            Aes256Gcm::new(key).decrypt(GenericArray::from_slice(nonce), cipher_text)
        }
        AeadAlgorithm::XChaCha20Poly1305 => {
            XChaCha20Poly1305::new(key).decrypt(GenericArray::from_slice(nonce), cipher_text)
        }
    }
    .map_err(|_| Error::Authentication)?;

    Ok(SensitiveBytes::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_LENGTH;
    use proptest::prelude::*;

    const ALGORITHMS: [AeadAlgorithm; 2] =
        [AeadAlgorithm::Aes256Gcm, AeadAlgorithm::XChaCha20Poly1305];

    fn key(byte: u8) -> VaultKey {
        VaultKey::from_bytes([byte; KEY_LENGTH])
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        for algorithm in ALGORITHMS {
            let envelope = encrypt(algorithm, &key(42), b"Hello, World!").unwrap();
            let decrypted = decrypt(algorithm, &key(42), &envelope).unwrap();

            assert_eq!(decrypted.as_bytes(), b"Hello, World!");
        }
    }

    #[test]
    fn test_envelope_sizes() {
        let plaintext = b"Test message";
        for algorithm in ALGORITHMS {
            let envelope = encrypt(algorithm, &key(42), plaintext).unwrap();

            assert_eq!(envelope.iv.len(), algorithm.nonce_size());
            assert_eq!(envelope.cipher_text.len(), plaintext.len() + TAG_SIZE);
        }
    }

    #[test]
    fn test_aes_gcm_nonce_is_96_bits() {
        let envelope = encrypt(AeadAlgorithm::Aes256Gcm, &key(1), b"x").unwrap();
        assert_eq!(envelope.iv.len(), 12);
    }

    #[test]
    fn test_different_nonce_each_time() {
        for algorithm in ALGORITHMS {
            let e1 = encrypt(algorithm, &key(42), b"Same plaintext").unwrap();
            let e2 = encrypt(algorithm, &key(42), b"Same plaintext").unwrap();

            assert_ne!(e1.iv, e2.iv);
            assert_ne!(e1.cipher_text, e2.cipher_text);
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        for algorithm in ALGORITHMS {
            let envelope = encrypt(algorithm, &key(1), b"Secret data").unwrap();
            let result = decrypt(algorithm, &key(2), &envelope);

            assert!(matches!(result, Err(Error::Authentication)));
        }
    }

    #[test]
    fn test_wrong_algorithm_fails() {
        let envelope = encrypt(AeadAlgorithm::Aes256Gcm, &key(1), b"data").unwrap();
        let result = decrypt(AeadAlgorithm::XChaCha20Poly1305, &key(1), &envelope);

        assert!(matches!(result, Err(Error::Authentication)));
    }

    #[test]
    fn test_truncated_envelope_fails() {
        let mut envelope = encrypt(AeadAlgorithm::Aes256Gcm, &key(3), b"data").unwrap();
        envelope.iv.pop();
        assert!(matches!(
            decrypt(AeadAlgorithm::Aes256Gcm, &key(3), &envelope),
            Err(Error::Authentication)
        ));

        let short = Envelope::new(vec![0u8; TAG_SIZE - 1], vec![0u8; 12]);
        assert!(matches!(
            decrypt(AeadAlgorithm::Aes256Gcm, &key(3), &short),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn test_empty_plaintext() {
        let envelope = encrypt(AeadAlgorithm::Aes256Gcm, &key(42), b"").unwrap();
        let decrypted = decrypt(AeadAlgorithm::Aes256Gcm, &key(42), &envelope).unwrap();

        assert!(decrypted.is_empty());
    }

    proptest! {
        #[test]
        fn prop_roundtrip(plaintext in proptest::collection::vec(any::<u8>(), 0..512), k in any::<u8>()) {
            let envelope = encrypt(AeadAlgorithm::Aes256Gcm, &key(k), &plaintext).unwrap();
            let decrypted = decrypt(AeadAlgorithm::Aes256Gcm, &key(k), &envelope).unwrap();
            prop_assert_eq!(decrypted.as_bytes(), plaintext.as_slice());
        }

        #[test]
        fn prop_bit_flip_in_cipher_text_detected(
            plaintext in proptest::collection::vec(any::<u8>(), 0..256),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let mut envelope = encrypt(AeadAlgorithm::Aes256Gcm, &key(9), &plaintext).unwrap();
            let i = index.index(envelope.cipher_text.len());
            envelope.cipher_text[i] ^= 1 << bit;

            let result = decrypt(AeadAlgorithm::Aes256Gcm, &key(9), &envelope);
            prop_assert!(matches!(result, Err(Error::Authentication)));
        }

        #[test]
        fn prop_bit_flip_in_iv_detected(
            plaintext in proptest::collection::vec(any::<u8>(), 0..256),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let mut envelope = encrypt(AeadAlgorithm::Aes256Gcm, &key(9), &plaintext).unwrap();
            let i = index.index(envelope.iv.len());
            envelope.iv[i] ^= 1 << bit;

            let result = decrypt(AeadAlgorithm::Aes256Gcm, &key(9), &envelope);
            prop_assert!(matches!(result, Err(Error::Authentication)));
        }
    }
}
