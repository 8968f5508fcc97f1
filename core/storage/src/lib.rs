//! Storage provider abstraction for Lockbox.
//!
//! This module provides a trait-based interface over the medium that holds
//! ciphertext envelopes (memory, local filesystem) and a provider registry
//! for resolving a provider by name at startup.
//!
//! # Design Principles
//! - Provider isolation: No medium-specific logic in vault or crypto modules
//! - Async operations: All I/O operations are async
//! - Envelopes only: providers never see plaintext, passphrases or keys
//! - Unified error semantics: Consistent error types across providers

pub mod local;
pub mod memory;
pub mod provider;
pub mod registry;

pub use local::LocalProvider;
pub use memory::MemoryProvider;
pub use provider::{export_file_name, ExportReceipt, StorageProvider};
pub use registry::{create_default_registry, ProviderFactory, ProviderRegistry};
