//! Vault engine for Lockbox.
//!
//! This module provides:
//! - The credential record and vault model
//! - The plaintext vault codec
//! - Passphrase policy and generation
//! - Session handling with secure key management
//!
//! # Architecture
//! The vault module sits between the user interface and the cipher and
//! storage providers. A session turns UI requests into
//! derive → transform → persist cycles and never leaves the stored slot
//! and the in-memory vault out of step.

pub mod codec;
pub mod config;
pub mod generator;
pub mod ids;
pub mod manager;
pub mod model;
pub mod session;
pub mod validation;

pub use config::{EngineConfig, StorageConfig, CONFIG_FILENAME, DEFAULT_STORAGE_PROVIDER};
pub use generator::generate_passphrase;
pub use ids::{generate_record_id, generate_record_id_with, MAX_ID_ATTEMPTS, MAX_RECORD_ID};
pub use manager::VaultManager;
pub use model::{
    now_millis, CredentialField, CredentialRecord, RecordDraft, RecordId, Vault,
    TEMPLATE_PASSWORD_LENGTH,
};
pub use session::{SessionState, VaultExport, VaultSession};
pub use validation::{
    check_confirmation, validate_new_passphrase, validate_passphrase, MAX_PASSPHRASE_LENGTH,
    MIN_PASSPHRASE_LENGTH,
};
