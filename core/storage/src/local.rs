//! Local filesystem storage provider.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::provider::{ExportReceipt, StorageProvider};
use lockbox_common::{Envelope, Error, Handle, Result};

/// Directory under the root holding one file per slot.
pub const SLOTS_DIRNAME: &str = "slots";

/// Default export directory under the root.
pub const EXPORTS_DIRNAME: &str = "exports";

/// Local filesystem storage provider.
///
/// Each slot is a JSON envelope file under `<root>/slots/`. Exports are
/// written to the export directory with the same contents.
pub struct LocalProvider {
    root: PathBuf,
    export_dir: PathBuf,
}

impl LocalProvider {
    /// Create a new local provider with the given root directory.
    ///
    /// # Postconditions
    /// - Root and slot directories are created if they don't exist
    /// - Exports go to `<root>/exports`
    ///
    /// # Errors
    /// - `Error::StorageUnavailable` if the directories cannot be created
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let export_dir = root.join(EXPORTS_DIRNAME);
        Self::with_export_dir(root, export_dir)
    }

    /// Create a provider that writes exports to a specific directory.
    pub fn with_export_dir(root: impl AsRef<Path>, export_dir: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let export_dir = export_dir.as_ref().to_path_buf();

        // Sync for constructor
        std::fs::create_dir_all(root.join(SLOTS_DIRNAME)).map_err(|e| {
            Error::StorageUnavailable(format!(
                "Cannot create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root, export_dir })
    }

    /// Platform data directory for Lockbox (e.g. `~/.local/share/lockbox`).
    pub fn default_root() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join("lockbox"))
            .ok_or_else(|| {
                Error::StorageUnavailable("No data directory on this platform".to_string())
            })
    }

    /// Root directory of this provider.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where exports are written.
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Filesystem path of the slot for a handle.
    ///
    /// Handles are standard base64, so `/` and `+` are mapped to `_` and `-`.
    /// Neither replacement occurs in standard base64, so the mapping is
    /// injective.
    fn slot_path(&self, handle: &Handle) -> PathBuf {
        let stem: String = handle
            .as_str()
            .chars()
            .map(|c| match c {
                '/' => '_',
                '+' => '-',
                other => other,
            })
            .collect();
        self.root.join(SLOTS_DIRNAME).join(format!("{}.json", stem))
    }
}

fn unavailable(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::StorageUnavailable(format!("Failed to {} {}: {}", action, path.display(), e))
}

/// Write through a temporary file so a failed write never truncates the slot.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data)
        .await
        .map_err(|e| unavailable("write", &tmp, e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| unavailable("replace", path, e))
}

#[async_trait]
impl StorageProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn has(&self, handle: &Handle) -> Result<bool> {
        let path = self.slot_path(handle);
        fs::try_exists(&path)
            .await
            .map_err(|e| unavailable("inspect", &path, e))
    }

    async fn load(&self, handle: &Handle) -> Result<Option<Envelope>> {
        let path = self.slot_path(handle);

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(Envelope::from_bytes(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(unavailable("read", &path, e)),
        }
    }

    async fn store(&self, handle: &Handle, envelope: &Envelope) -> Result<()> {
        let path = self.slot_path(handle);
        let bytes = envelope.to_bytes()?;

        write_atomic(&path, &bytes).await?;

        debug!(size = bytes.len(), "Stored envelope on disk");
        Ok(())
    }

    async fn export(&self, envelope: &Envelope, suggested_name: &str) -> Result<ExportReceipt> {
        if suggested_name.is_empty()
            || suggested_name.contains('/')
            || suggested_name.contains('\\')
        {
            return Err(Error::InvalidInput(format!(
                "Invalid export file name: {:?}",
                suggested_name
            )));
        }

        fs::create_dir_all(&self.export_dir)
            .await
            .map_err(|e| unavailable("create", &self.export_dir, e))?;

        let path = self.export_dir.join(suggested_name);
        write_atomic(&path, &envelope.to_bytes()?).await?;

        info!(path = %path.display(), "Exported vault");
        Ok(ExportReceipt {
            file_name: suggested_name.to_string(),
            location: path.to_string_lossy().to_string(),
        })
    }
}
