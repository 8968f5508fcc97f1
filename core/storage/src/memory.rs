//! In-memory storage provider for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::provider::{ExportReceipt, StorageProvider};
use lockbox_common::{Envelope, Error, Handle, Result};

/// In-memory storage provider.
///
/// Useful for testing and development. Slots hold the serialized envelope
/// bytes, exactly as a persistent medium would. All data is lost on drop.
/// Clones share the same underlying storage.
#[derive(Clone)]
pub struct MemoryProvider {
    slots: Arc<RwLock<HashMap<Handle, Vec<u8>>>>,
    exports: Arc<RwLock<Vec<(String, Vec<u8>)>>>,
    capacity: Option<usize>,
    available: Arc<AtomicBool>,
}

impl MemoryProvider {
    /// Create a new empty memory provider.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            exports: Arc::new(RwLock::new(Vec::new())),
            capacity: None,
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Create a provider that refuses writes once `capacity` slots are used.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new()
        }
    }

    /// Simulate the medium going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Raw bytes stored under a handle.
    pub fn raw(&self, handle: &Handle) -> Option<Vec<u8>> {
        self.read_slots().ok()?.get(handle).cloned()
    }

    /// Overwrite the raw bytes of a slot, bypassing envelope serialization.
    pub fn put_raw(&self, handle: &Handle, bytes: Vec<u8>) -> Result<()> {
        self.write_slots()?.insert(handle.clone(), bytes);
        Ok(())
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.read_slots().map(|s| s.len()).unwrap_or(0)
    }

    /// Check if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Contents of a previous export, by file name.
    pub fn exported(&self, file_name: &str) -> Option<Vec<u8>> {
        let exports = self.exports.read().ok()?;
        exports
            .iter()
            .find(|(name, _)| name == file_name)
            .map(|(_, data)| data.clone())
    }

    /// File names of all exports, oldest first.
    pub fn export_names(&self) -> Vec<String> {
        self.exports
            .read()
            .map(|e| e.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::StorageUnavailable(
                "Memory storage is offline".to_string(),
            ))
        }
    }

    fn read_slots(&self) -> Result<RwLockReadGuard<'_, HashMap<Handle, Vec<u8>>>> {
        self.slots
            .read()
            .map_err(|_| Error::StorageUnavailable("Storage lock poisoned".to_string()))
    }

    fn write_slots(&self) -> Result<RwLockWriteGuard<'_, HashMap<Handle, Vec<u8>>>> {
        self.slots
            .write()
            .map_err(|_| Error::StorageUnavailable("Storage lock poisoned".to_string()))
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn has(&self, handle: &Handle) -> Result<bool> {
        self.check_available()?;
        Ok(self.read_slots()?.contains_key(handle))
    }

    async fn load(&self, handle: &Handle) -> Result<Option<Envelope>> {
        self.check_available()?;
        let slots = self.read_slots()?;
        match slots.get(handle) {
            Some(bytes) => Ok(Some(Envelope::from_bytes(bytes)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, handle: &Handle, envelope: &Envelope) -> Result<()> {
        self.check_available()?;
        let bytes = envelope.to_bytes()?;
        let mut slots = self.write_slots()?;

        if let Some(capacity) = self.capacity {
            if !slots.contains_key(handle) && slots.len() >= capacity {
                return Err(Error::StorageUnavailable("Memory storage is full".to_string()));
            }
        }

        debug!(size = bytes.len(), "Storing envelope in memory");
        slots.insert(handle.clone(), bytes);
        Ok(())
    }

    async fn export(&self, envelope: &Envelope, suggested_name: &str) -> Result<ExportReceipt> {
        self.check_available()?;
        let bytes = envelope.to_bytes()?;
        self.exports
            .write()
            .map_err(|_| Error::StorageUnavailable("Storage lock poisoned".to_string()))?
            .push((suggested_name.to_string(), bytes));

        Ok(ExportReceipt {
            file_name: suggested_name.to_string(),
            location: format!("memory:{}", suggested_name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str) -> Handle {
        Handle::new(name).unwrap()
    }

    fn envelope() -> Envelope {
        Envelope::new(vec![1, 2, 3], vec![9; 12])
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let provider = MemoryProvider::new();
        let h = handle("slot");

        assert!(!provider.has(&h).await.unwrap());
        assert!(provider.load(&h).await.unwrap().is_none());

        provider.store(&h, &envelope()).await.unwrap();

        assert!(provider.has(&h).await.unwrap());
        assert_eq!(provider.load(&h).await.unwrap(), Some(envelope()));
    }

    #[tokio::test]
    async fn test_store_overwrites() {
        let provider = MemoryProvider::new();
        let h = handle("slot");
        let replacement = Envelope::new(vec![4], vec![5; 12]);

        provider.store(&h, &envelope()).await.unwrap();
        provider.store(&h, &replacement).await.unwrap();

        assert_eq!(provider.load(&h).await.unwrap(), Some(replacement));
        assert_eq!(provider.len(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let provider = MemoryProvider::new();
        let clone = provider.clone();
        let h = handle("shared");

        provider.store(&h, &envelope()).await.unwrap();
        assert!(clone.has(&h).await.unwrap());
    }

    #[tokio::test]
    async fn test_capacity_exhausted() {
        let provider = MemoryProvider::with_capacity(1);
        provider.store(&handle("a"), &envelope()).await.unwrap();
        // Replacing an existing slot does not need more room.
        provider.store(&handle("a"), &envelope()).await.unwrap();

        let result = provider.store(&handle("b"), &envelope()).await;
        assert!(matches!(result, Err(Error::StorageUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unavailable() {
        let provider = MemoryProvider::new();
        provider.set_available(false);

        assert!(matches!(
            provider.store(&handle("a"), &envelope()).await,
            Err(Error::StorageUnavailable(_))
        ));
        assert!(matches!(
            provider.has(&handle("a")).await,
            Err(Error::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_slot_is_format_error() {
        let provider = MemoryProvider::new();
        let h = handle("slot");
        provider.put_raw(&h, b"{\"broken\":".to_vec()).unwrap();

        assert!(matches!(provider.load(&h).await, Err(Error::Format(_))));
    }

    #[tokio::test]
    async fn test_export_matches_stored_bytes() {
        let provider = MemoryProvider::new();
        let h = handle("slot");

        provider.store(&h, &envelope()).await.unwrap();
        let receipt = provider
            .export(&envelope(), "credentials-export-1.bak")
            .await
            .unwrap();

        assert_eq!(receipt.file_name, "credentials-export-1.bak");
        assert_eq!(provider.exported("credentials-export-1.bak"), provider.raw(&h));
        assert_eq!(provider.export_names(), vec!["credentials-export-1.bak"]);
    }
}
