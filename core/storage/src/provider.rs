//! Storage provider trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lockbox_common::{Envelope, Handle, Result};

/// Where an export ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReceipt {
    /// File name the export was saved under.
    pub file_name: String,
    /// Provider-specific location (a path for the local provider).
    pub location: String,
}

/// Storage provider trait for different backends.
///
/// A provider is a key-value space of `Handle -> Envelope`. The stored
/// representation and the export file are the same JSON envelope document.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Get the provider name (e.g., "memory", "local").
    fn name(&self) -> &str;

    /// Check if a slot exists for the handle.
    async fn has(&self, handle: &Handle) -> Result<bool>;

    /// Load the envelope stored under a handle.
    ///
    /// # Postconditions
    /// - Returns `None` if the slot is absent
    ///
    /// # Errors
    /// - `Error::StorageUnavailable` if the medium cannot be read
    /// - `Error::Format` if the slot does not hold an envelope
    async fn load(&self, handle: &Handle) -> Result<Option<Envelope>>;

    /// Store an envelope under a handle, replacing any previous value.
    ///
    /// # Errors
    /// - `Error::StorageUnavailable` if the medium is missing or full
    async fn store(&self, handle: &Handle, envelope: &Envelope) -> Result<()>;

    /// Save an envelope as a user-facing export file.
    ///
    /// The file contents are exactly what `store` would persist.
    async fn export(&self, envelope: &Envelope, suggested_name: &str) -> Result<ExportReceipt>;
}

/// Export file name for a given epoch-millisecond timestamp.
pub fn export_file_name(epoch_millis: i64) -> String {
    format!("credentials-export-{}.bak", epoch_millis)
}
