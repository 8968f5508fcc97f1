//! Credential records and the vault that owns them.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::generator::generate_passphrase;
use crate::ids::MAX_RECORD_ID;
use lockbox_common::{Error, Handle, Result};

/// Length of the password generated for a fresh template.
pub const TEMPLATE_PASSWORD_LENGTH: usize = 32;

/// Current time truncated to whole milliseconds, the precision of the
/// serialized timestamps.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.timestamp_subsec_millis() * 1_000_000)
        .unwrap_or(now)
}

/// Identifier of a stored record, in `[1, 2^53 - 1]`.
///
/// Zero is never a valid id; an unsaved record has no id at all
/// (see [`RecordDraft`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RecordId(u64);

impl RecordId {
    /// Create a record id.
    ///
    /// # Errors
    /// - Returns error if `id` is zero or above `MAX_RECORD_ID`
    pub fn new(id: u64) -> Result<Self> {
        if id == 0 || id > MAX_RECORD_ID {
            return Err(Error::InvalidInput(format!(
                "Record id must be in 1..={}, got {}",
                MAX_RECORD_ID, id
            )));
        }
        Ok(Self(id))
    }

    /// Get the numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for RecordId {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RecordId> for u64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named value inside a record.
///
/// `hidden` only tells the UI to mask the value by default; hidden and
/// visible fields are encrypted identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
pub struct CredentialField {
    pub name: String,
    pub value: String,
    pub hidden: bool,
}

impl CredentialField {
    /// Create a field.
    pub fn new(name: impl Into<String>, value: impl Into<String>, hidden: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            hidden,
        }
    }

    /// Create a field shown by default.
    pub fn visible(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, false)
    }

    /// Create a field masked by default.
    pub fn secret(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, true)
    }

    /// True when both name and value are empty.
    pub fn is_blank(&self) -> bool {
        self.name.is_empty() && self.value.is_empty()
    }
}

/// A stored credential. Wiped on drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    #[zeroize(skip)]
    pub id: RecordId,
    #[zeroize(skip)]
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_update: DateTime<Utc>,
    pub target_name: String,
    pub description: String,
    pub fields: Vec<CredentialField>,
}

impl CredentialRecord {
    /// Placeholder shown when the user starts a new record.
    ///
    /// Carries a freshly generated password in a hidden field.
    pub fn template() -> RecordDraft {
        RecordDraft {
            id: None,
            target_name: "Title".to_string(),
            description: "Description".to_string(),
            fields: vec![
                CredentialField::visible("Username", ""),
                CredentialField::secret("Password", generate_passphrase(TEMPLATE_PASSWORD_LENGTH)),
                CredentialField::visible("Login page", "https://example.com"),
            ],
        }
    }

    /// Editable copy of this record, keeping its id.
    pub fn to_draft(&self) -> RecordDraft {
        RecordDraft {
            id: Some(self.id),
            target_name: self.target_name.clone(),
            description: self.description.clone(),
            fields: self.fields.clone(),
        }
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&CredentialField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A record as submitted by the UI, before it has been saved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordDraft {
    /// `None` for a record that has never been saved.
    pub id: Option<RecordId>,
    pub target_name: String,
    pub description: String,
    pub fields: Vec<CredentialField>,
}

impl RecordDraft {
    /// Start a new, unsaved record.
    pub fn new(target_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            target_name: target_name.into(),
            description: description.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn with_field(mut self, field: CredentialField) -> Self {
        self.fields.push(field);
        self
    }

    /// Turn the draft into a stored record, dropping blank fields.
    pub fn into_record(self, id: RecordId, last_update: DateTime<Utc>) -> CredentialRecord {
        let fields = self.fields.into_iter().filter(|f| !f.is_blank()).collect();

        CredentialRecord {
            id,
            last_update,
            target_name: self.target_name,
            description: self.description,
            fields,
        }
    }
}

/// The decrypted credential collection plus session metadata.
///
/// Every copy wipes its records on drop, including staging copies that are
/// discarded after a failed store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    #[zeroize(skip)]
    pub passphrase_hash: Handle,
    #[zeroize(skip)]
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_export: DateTime<Utc>,
    pub credentials: Vec<CredentialRecord>,
}

impl Vault {
    /// Create an empty vault bound to a passphrase handle.
    pub fn new(passphrase_hash: Handle) -> Self {
        Self {
            passphrase_hash,
            last_export: DateTime::<Utc>::default(),
            credentials: Vec::new(),
        }
    }

    /// Ids of every record.
    pub fn ids(&self) -> HashSet<RecordId> {
        self.credentials.iter().map(|c| c.id).collect()
    }

    /// Look up a record by id.
    pub fn record(&self, id: RecordId) -> Option<&CredentialRecord> {
        self.credentials.iter().find(|c| c.id == id)
    }

    /// All records in display order.
    pub fn records(&self) -> &[CredentialRecord] {
        &self.credentials
    }

    /// Insert a record, replacing any record with the same id in place.
    pub fn upsert(&mut self, record: CredentialRecord) {
        match self.credentials.iter_mut().find(|c| c.id == record.id) {
            Some(existing) => *existing = record,
            None => self.credentials.push(record),
        }
    }

    /// Remove a record by id.
    pub fn remove(&mut self, id: RecordId) -> Option<CredentialRecord> {
        let index = self.credentials.iter().position(|c| c.id == id)?;
        Some(self.credentials.remove(index))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Check if the vault holds no records.
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> Handle {
        Handle::new("handle").unwrap()
    }

    fn record(id: u64, title: &str) -> CredentialRecord {
        RecordDraft::new(title, "")
            .with_field(CredentialField::secret("Password", "p@ss"))
            .into_record(RecordId::new(id).unwrap(), now_millis())
    }

    #[test]
    fn test_record_id_bounds() {
        assert!(RecordId::new(0).is_err());
        assert!(RecordId::new(1).is_ok());
        assert!(RecordId::new(MAX_RECORD_ID).is_ok());
        assert!(RecordId::new(MAX_RECORD_ID + 1).is_err());
    }

    #[test]
    fn test_now_millis_has_no_sub_millisecond_part() {
        assert_eq!(now_millis().nanosecond() % 1_000_000, 0);
    }

    #[test]
    fn test_template() {
        let template = CredentialRecord::template();
        assert!(template.id.is_none());
        assert_eq!(template.target_name, "Title");
        assert_eq!(template.fields.len(), 3);

        let password = &template.fields[1];
        assert_eq!(password.name, "Password");
        assert!(password.hidden);
        assert_eq!(password.value.chars().count(), TEMPLATE_PASSWORD_LENGTH);

        // Each template gets its own password.
        assert_ne!(CredentialRecord::template().fields[1].value, password.value);
    }

    #[test]
    fn test_into_record_drops_blank_fields() {
        let record = RecordDraft::new("Example", "")
            .with_field(CredentialField::visible("", ""))
            .with_field(CredentialField::visible("Note", ""))
            .with_field(CredentialField::visible("", "orphan value"))
            .into_record(RecordId::new(5).unwrap(), now_millis());

        assert_eq!(record.fields.len(), 2);
        assert!(record.field("Note").is_some());
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut vault = Vault::new(handle());
        vault.upsert(record(1, "first"));
        vault.upsert(record(2, "second"));
        vault.upsert(record(1, "renamed"));

        assert_eq!(vault.len(), 2);
        assert_eq!(vault.records()[0].target_name, "renamed");
        assert_eq!(vault.records()[1].target_name, "second");
    }

    #[test]
    fn test_remove() {
        let mut vault = Vault::new(handle());
        vault.upsert(record(1, "first"));

        let id = RecordId::new(1).unwrap();
        assert!(vault.remove(id).is_some());
        assert!(vault.remove(id).is_none());
        assert!(vault.is_empty());
    }

    #[test]
    fn test_to_draft_keeps_id() {
        let original = record(7, "Example");
        let draft = original.to_draft();

        assert_eq!(draft.id, Some(original.id));
        assert_eq!(draft.fields, original.fields);
    }

    #[test]
    fn test_plaintext_types_wipe_on_drop() {
        fn wipes_on_drop<T: ZeroizeOnDrop>() {}

        wipes_on_drop::<Vault>();
        wipes_on_drop::<CredentialRecord>();
    }

    #[test]
    fn test_zeroize_clears_secrets() {
        let mut vault = Vault::new(handle());
        vault.upsert(record(1, "Example"));

        vault.zeroize();
        assert!(vault.credentials.is_empty());
    }
}
