//! Vault codec: the plaintext document inside an envelope.
//!
//! The document is JSON:
//!
//! ```json
//! {
//!   "passphraseHash": "...",
//!   "lastExport": 0,
//!   "credentials": [
//!     {
//!       "id": 1234,
//!       "lastUpdate": 1700000000000,
//!       "targetName": "Example",
//!       "description": "",
//!       "fields": [{ "name": "Password", "value": "p@ss", "hidden": true }]
//!     }
//!   ]
//! }
//! ```
//!
//! Timestamps are epoch milliseconds.

use std::collections::HashSet;

use crate::model::Vault;
use lockbox_common::{Error, Result, SensitiveBytes};

/// Serialize a vault into the plaintext payload for the cipher.
pub fn serialize(vault: &Vault) -> Result<SensitiveBytes> {
    serde_json::to_vec(vault)
        .map(SensitiveBytes::new)
        .map_err(|e| Error::Format(e.to_string()))
}

/// Parse a decrypted payload back into a vault.
///
/// # Errors
/// - `Error::Format` on malformed JSON, missing or mistyped fields, a zero
///   record id, or two records sharing an id
pub fn deserialize(bytes: &[u8]) -> Result<Vault> {
    let vault: Vault = serde_json::from_slice(bytes)
        .map_err(|e| Error::Format(format!("Invalid vault document: {}", e)))?;

    let mut seen = HashSet::with_capacity(vault.credentials.len());
    for record in &vault.credentials {
        if !seen.insert(record.id) {
            return Err(Error::Format(format!("Duplicate record id {}", record.id)));
        }
    }

    Ok(vault)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{now_millis, CredentialField, RecordDraft, RecordId};
    use lockbox_common::{Handle, Passphrase};
    use lockbox_crypto::{
        decrypt, derive_key, encrypt, hash_passphrase, AeadAlgorithm, KdfParams, APP_SALT,
    };
    use proptest::prelude::*;

    fn sample_vault() -> Vault {
        let mut vault = Vault::new(Handle::new("handle=").unwrap());
        vault.upsert(
            RecordDraft::new("Example", "Main login")
                .with_field(CredentialField::visible("Username", "alice"))
                .with_field(CredentialField::secret("Password", "p@ss"))
                .into_record(RecordId::new(12345).unwrap(), now_millis()),
        );
        vault
    }

    #[test]
    fn test_document_shape() {
        let bytes = serialize(&sample_vault()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(bytes.as_bytes()).unwrap();

        assert_eq!(value["passphraseHash"], "handle=");
        assert_eq!(value["lastExport"], 0);
        let record = &value["credentials"][0];
        assert_eq!(record["id"], 12345);
        assert!(record["lastUpdate"].is_i64());
        assert_eq!(record["targetName"], "Example");
        assert_eq!(record["fields"][1]["hidden"], true);
    }

    #[test]
    fn test_roundtrip() {
        let vault = sample_vault();
        let bytes = serialize(&vault).unwrap();
        assert_eq!(deserialize(bytes.as_bytes()).unwrap(), vault);
    }

    #[test]
    fn test_accepts_handwritten_document() {
        let json = br#"{
            "passphraseHash": "abc",
            "lastExport": 1700000000000,
            "credentials": [{
                "id": 9007199254740991,
                "lastUpdate": 1700000000123,
                "targetName": "Mail",
                "description": "",
                "fields": []
            }]
        }"#;

        let vault = deserialize(json).unwrap();
        assert_eq!(vault.credentials[0].id.get(), 9_007_199_254_740_991);
        assert_eq!(vault.last_export.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_rejects_malformed() {
        let cases: &[&[u8]] = &[
            b"",
            b"not json",
            br#"{"lastExport":0,"credentials":[]}"#,
            br#"{"passphraseHash":"a","lastExport":"yesterday","credentials":[]}"#,
            br#"{"passphraseHash":"a","lastExport":0,"credentials":{}}"#,
            br#"{"passphraseHash":"a","lastExport":0,"credentials":[{"id":1}]}"#,
            br#"{"passphraseHash":"a","lastExport":0,"credentials":[
                {"id":0,"lastUpdate":0,"targetName":"","description":"","fields":[]}]}"#,
            br#"{"passphraseHash":"a","lastExport":0,"credentials":[
                {"id":1,"lastUpdate":0,"targetName":"","description":"",
                 "fields":[{"name":"x","value":"y","hidden":"yes"}]}]}"#,
        ];

        for case in cases {
            assert!(
                matches!(deserialize(case), Err(Error::Format(_))),
                "accepted {:?}",
                String::from_utf8_lossy(case)
            );
        }
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let json = br#"{"passphraseHash":"a","lastExport":0,"credentials":[
            {"id":3,"lastUpdate":0,"targetName":"a","description":"","fields":[]},
            {"id":3,"lastUpdate":0,"targetName":"b","description":"","fields":[]}]}"#;

        let err = deserialize(json).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert!(err.to_string().contains("Duplicate"));
    }

    fn arb_field() -> impl Strategy<Value = CredentialField> {
        (".{0,12}", ".{0,24}", any::<bool>()).prop_map(|(n, v, h)| CredentialField::new(n, v, h))
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            titles in proptest::collection::vec((".{0,16}", ".{0,32}"), 0..6),
            fields in proptest::collection::vec(arb_field(), 0..4),
        ) {
            let mut vault = Vault::new(Handle::new("h").unwrap());
            for (i, (title, description)) in titles.into_iter().enumerate() {
                let mut draft = RecordDraft::new(title, description);
                draft.fields = fields.clone();
                vault.upsert(draft.into_record(RecordId::new(i as u64 + 1).unwrap(), now_millis()));
            }

            let bytes = serialize(&vault).unwrap();
            prop_assert_eq!(deserialize(bytes.as_bytes()).unwrap(), vault);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_sealed_roundtrip(
            passphrase in "[ -~]{5,64}",
            titles in proptest::collection::vec(".{0,16}", 0..4),
            fields in proptest::collection::vec(arb_field(), 0..4),
        ) {
            let passphrase = Passphrase::new(passphrase);
            let mut vault = Vault::new(hash_passphrase(&passphrase).unwrap());
            for (i, title) in titles.into_iter().enumerate() {
                let mut draft = RecordDraft::new(title, "");
                draft.fields = fields.clone();
                vault.upsert(draft.into_record(RecordId::new(i as u64 + 1).unwrap(), now_millis()));
            }

            let kdf = KdfParams::pbkdf2();
            let key = derive_key(passphrase.as_bytes(), APP_SALT, &kdf).unwrap();
            let plaintext = serialize(&vault).unwrap();
            let envelope = encrypt(AeadAlgorithm::Aes256Gcm, &key, plaintext.as_bytes()).unwrap();

            let key_again = derive_key(passphrase.as_bytes(), APP_SALT, &kdf).unwrap();
            let opened = decrypt(AeadAlgorithm::Aes256Gcm, &key_again, &envelope).unwrap();
            prop_assert_eq!(deserialize(opened.as_bytes()).unwrap(), vault);
        }
    }
}
