//! Vault session management.
//!
//! A session owns at most one decrypted vault together with the key derived
//! for it. Every operation the UI needs goes through here, and each one runs
//! derive → transform → persist in that order. Changes are staged on a copy
//! of the vault and committed only after the store succeeds, so a failed
//! operation leaves the session exactly as it was.

use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::codec;
use crate::ids::generate_record_id;
use crate::model::{now_millis, CredentialRecord, RecordDraft, RecordId, Vault};
use crate::validation::{validate_new_passphrase, validate_passphrase};
use lockbox_common::{Envelope, Error, Handle, Passphrase, PassphraseViolation, Result};
use lockbox_crypto::{CipherProvider, VaultKey};
use lockbox_storage::{export_file_name, ExportReceipt, StorageProvider};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No vault has been loaded yet.
    New,
    /// A vault is decrypted in memory.
    Loaded,
    /// The vault was cleared by logging out.
    Cleared,
}

/// Result of an export.
#[derive(Debug, Clone)]
pub struct VaultExport {
    /// The exported envelope, identical to the stored slot.
    pub envelope: Envelope,
    /// Where the storage provider put the file.
    pub receipt: ExportReceipt,
}

/// The decrypted vault and its key. Both wipe themselves on drop.
struct ActiveVault {
    vault: Vault,
    key: VaultKey,
}

fn handles_match(a: &Handle, b: &Handle) -> bool {
    a.as_str().as_bytes().ct_eq(b.as_str().as_bytes()).into()
}

/// Active vault session.
pub struct VaultSession {
    cipher: Arc<dyn CipherProvider>,
    storage: Arc<dyn StorageProvider>,
    active: Option<ActiveVault>,
    state: SessionState,
}

impl VaultSession {
    /// Create an empty session over the given providers.
    pub fn new(cipher: Arc<dyn CipherProvider>, storage: Arc<dyn StorageProvider>) -> Self {
        Self {
            cipher,
            storage,
            active: None,
            state: SessionState::New,
        }
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if a vault is loaded.
    pub fn is_loaded(&self) -> bool {
        self.state == SessionState::Loaded
    }

    /// Read view of the loaded vault.
    pub fn vault(&self) -> Option<&Vault> {
        self.active.as_ref().map(|a| &a.vault)
    }

    /// Copy of a record.
    pub fn record(&self, id: RecordId) -> Option<CredentialRecord> {
        self.vault()?.record(id).cloned()
    }

    /// Get the storage provider.
    pub fn storage(&self) -> Arc<dyn StorageProvider> {
        self.storage.clone()
    }

    /// Get the cipher provider.
    pub fn cipher(&self) -> Arc<dyn CipherProvider> {
        self.cipher.clone()
    }

    fn active(&self) -> Result<&ActiveVault> {
        self.active
            .as_ref()
            .ok_or_else(|| Error::NotPermitted("No vault is loaded".to_string()))
    }

    fn commit(&mut self, vault: Vault, key: VaultKey) {
        self.active = Some(ActiveVault { vault, key });
        self.state = SessionState::Loaded;
    }

    fn replace_vault(&mut self, vault: Vault) -> Result<()> {
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| Error::NotPermitted("No vault is loaded".to_string()))?;
        active.vault = vault;
        Ok(())
    }

    /// Serialize, encrypt and store a vault under its own handle.
    async fn persist(&self, vault: &Vault, key: &VaultKey) -> Result<Envelope> {
        let plaintext = codec::serialize(vault)?;
        let envelope = self.cipher.encrypt(plaintext.as_bytes(), key).await?;
        self.storage.store(&vault.passphrase_hash, &envelope).await?;
        debug!(
            records = vault.len(),
            provider = self.storage.name(),
            "Persisted vault"
        );
        Ok(envelope)
    }

    /// Decrypt an envelope and check it belongs to `handle`.
    async fn open(
        &self,
        envelope: &Envelope,
        passphrase: &Passphrase,
        handle: &Handle,
    ) -> Result<(Vault, VaultKey)> {
        let key = self.cipher.derive_key(passphrase).await?;
        let plaintext = self.cipher.decrypt(envelope, &key).await?;
        let vault = codec::deserialize(plaintext.as_bytes())?;

        if !handles_match(&vault.passphrase_hash, handle) {
            return Err(Error::Authentication);
        }
        Ok((vault, key))
    }

    /// Create and store a new, empty vault for a passphrase.
    ///
    /// # Errors
    /// - `Error::Validation` listing every broken rule
    /// - `Error::AlreadyExists` if a vault is already stored for the passphrase
    /// - `Error::StorageUnavailable` if the store fails
    pub async fn register(
        &mut self,
        passphrase: &Passphrase,
        confirmation: &Passphrase,
    ) -> Result<&Vault> {
        validate_new_passphrase(passphrase, confirmation).into_result()?;

        let handle = self.cipher.hash(passphrase).await?;
        if self.storage.has(&handle).await? {
            return Err(Error::AlreadyExists(
                "A vault already exists for this passphrase".to_string(),
            ));
        }

        let key = self.cipher.derive_key(passphrase).await?;
        let vault = Vault::new(handle);
        self.persist(&vault, &key).await?;

        info!(provider = self.storage.name(), "Registered new vault");
        self.commit(vault, key);
        self.active().map(|a| &a.vault)
    }

    /// Load the vault stored for a passphrase.
    ///
    /// # Errors
    /// - `Error::Authentication` if no vault exists for the passphrase or it
    ///   does not decrypt; the session is left unchanged
    pub async fn login(&mut self, passphrase: &Passphrase) -> Result<&Vault> {
        let handle = self.cipher.hash(passphrase).await?;

        let Some(envelope) = self.storage.load(&handle).await? else {
            warn!("Login failed: no vault for passphrase");
            return Err(Error::Authentication);
        };

        let (vault, key) = self.open(&envelope, passphrase, &handle).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            e
        })?;

        info!(records = vault.len(), "Vault unlocked");
        self.commit(vault, key);
        self.active().map(|a| &a.vault)
    }

    /// Save a record, assigning a fresh id to a new one.
    ///
    /// Blank fields are dropped and `last_update` is stamped.
    ///
    /// # Postconditions
    /// - The stored vault contains the returned record
    pub async fn save_record(&mut self, draft: RecordDraft) -> Result<CredentialRecord> {
        let active = self.active()?;
        let mut vault = active.vault.clone();

        let id = match draft.id {
            Some(id) => id,
            None => generate_record_id(&vault.ids())?,
        };
        let record = draft.into_record(id, now_millis());
        vault.upsert(record.clone());

        self.persist(&vault, &active.key).await?;
        self.replace_vault(vault)?;

        debug!(id = %id, fields = record.fields.len(), "Saved record");
        Ok(record)
    }

    /// Delete a record.
    ///
    /// # Returns
    /// `true` if the record existed and the vault was stored without it.
    pub async fn delete_record(&mut self, id: RecordId) -> Result<bool> {
        let active = self.active()?;
        let mut vault = active.vault.clone();

        if vault.remove(id).is_none() {
            return Ok(false);
        }

        self.persist(&vault, &active.key).await?;
        self.replace_vault(vault)?;

        debug!(id = %id, "Deleted record");
        Ok(true)
    }

    /// Re-key the vault under a new passphrase.
    ///
    /// The vault is stored under the new handle. The slot of the old
    /// passphrase is left in place.
    ///
    /// # Errors
    /// - `Error::Validation` listing every broken rule, including
    ///   `WrongOldPassphrase` and `ConfirmationMismatch`
    /// - `Error::AlreadyExists` if another vault is stored under the new passphrase
    pub async fn change_passphrase(
        &mut self,
        old: &Passphrase,
        new: &Passphrase,
        confirmation: &Passphrase,
    ) -> Result<()> {
        let active = self.active()?;

        let mut violations = validate_passphrase(new);
        let old_handle = self.cipher.hash(old).await?;
        if !handles_match(&old_handle, &active.vault.passphrase_hash) {
            violations.push(PassphraseViolation::WrongOldPassphrase);
        }
        if new != confirmation {
            violations.push(PassphraseViolation::ConfirmationMismatch);
        }
        violations.into_result()?;

        let new_handle = self.cipher.hash(new).await?;
        if !handles_match(&new_handle, &old_handle) && self.storage.has(&new_handle).await? {
            return Err(Error::AlreadyExists(
                "A vault already exists for the new passphrase".to_string(),
            ));
        }

        let key = self.cipher.derive_key(new).await?;
        let mut vault = active.vault.clone();
        vault.passphrase_hash = new_handle;

        self.persist(&vault, &key).await?;

        info!("Passphrase changed");
        self.commit(vault, key);
        Ok(())
    }

    /// Export the vault.
    ///
    /// Stamps `last_export`, stores the vault, then hands the very same
    /// envelope to the storage provider as `credentials-export-<millis>.bak`.
    pub async fn export(&mut self) -> Result<VaultExport> {
        let active = self.active()?;
        let mut vault = active.vault.clone();
        let now = now_millis();
        vault.last_export = now;

        let envelope = self.persist(&vault, &active.key).await?;
        self.replace_vault(vault)?;

        let receipt = self
            .storage
            .export(&envelope, &export_file_name(now.timestamp_millis()))
            .await?;

        info!(file = %receipt.file_name, "Vault exported");
        Ok(VaultExport { envelope, receipt })
    }

    /// Load a vault from the bytes of an export file.
    ///
    /// On success the imported vault replaces the loaded one and is stored
    /// under the passphrase's slot. A slot that already holds a vault is
    /// never overwritten; see [`VaultSession::import_replacing`].
    ///
    /// # Errors
    /// - `Error::Format` if the file is not an envelope or decrypts to an
    ///   invalid document
    /// - `Error::Authentication` on a wrong passphrase or tampered file
    /// - `Error::AlreadyExists` if a vault is already stored for the passphrase
    ///
    /// On any error the session and storage are left unchanged.
    pub async fn import(&mut self, file_bytes: &[u8], passphrase: &Passphrase) -> Result<&Vault> {
        self.import_with(file_bytes, passphrase, false).await
    }

    /// Like [`VaultSession::import`], but replaces a vault already stored
    /// for the passphrase.
    pub async fn import_replacing(
        &mut self,
        file_bytes: &[u8],
        passphrase: &Passphrase,
    ) -> Result<&Vault> {
        self.import_with(file_bytes, passphrase, true).await
    }

    async fn import_with(
        &mut self,
        file_bytes: &[u8],
        passphrase: &Passphrase,
        replace: bool,
    ) -> Result<&Vault> {
        let envelope = Envelope::from_bytes(file_bytes)?;
        let handle = self.cipher.hash(passphrase).await?;

        let (vault, key) = self.open(&envelope, passphrase, &handle).await.map_err(|e| {
            warn!(error = %e, "Import failed");
            e
        })?;

        if !replace && self.storage.has(&handle).await? {
            warn!("Import refused: a vault is already stored for this passphrase");
            return Err(Error::AlreadyExists(
                "A vault already exists for this passphrase".to_string(),
            ));
        }

        self.storage.store(&handle, &envelope).await?;

        info!(records = vault.len(), replaced = replace, "Vault imported");
        self.commit(vault, key);
        self.active().map(|a| &a.vault)
    }

    /// Clear the vault and key from memory.
    pub fn logout(&mut self) {
        if self.active.take().is_some() {
            debug!("Vault cleared from session");
        }
        self.state = SessionState::Cleared;
    }
}
