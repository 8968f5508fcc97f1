//! Common error types for Lockbox.

use std::fmt;

use thiserror::Error;

/// Top-level error type for Lockbox operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The authentication tag did not verify.
    ///
    /// Covers both a wrong passphrase and tampered or corrupted ciphertext;
    /// the message deliberately does not say which.
    #[error("Incorrect passphrase or invalid data")]
    Authentication,

    /// Decrypted or imported bytes are not a valid vault or envelope.
    #[error("Format error: {0}")]
    Format(String),

    /// The backing medium is missing or a write failed.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A new passphrase broke one or more policy rules.
    #[error("Passphrase rejected: {0}")]
    Validation(PassphraseViolations),

    /// A cryptographic primitive failed for a reason other than authentication.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not permitted.
    #[error("Not permitted: {0}")]
    NotPermitted(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl Error {
    /// True for a failed integrity check.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication)
    }

    /// The collected policy violations, if this is a validation error.
    pub fn violations(&self) -> Option<&PassphraseViolations> {
        match self {
            Error::Validation(violations) => Some(violations),
            _ => None,
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

/// A single broken passphrase rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassphraseViolation {
    /// Shorter than the policy minimum.
    TooShort { min: usize, actual: usize },
    /// Longer than the policy maximum.
    TooLong { max: usize, actual: usize },
    /// Passphrase and its confirmation differ.
    ConfirmationMismatch,
    /// The current passphrase given for a change was wrong.
    WrongOldPassphrase,
}

impl fmt::Display for PassphraseViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassphraseViolation::TooShort { min, actual } => write!(
                f,
                "passphrase too short, minimum length is {} characters but entered passphrase was {} characters long",
                min, actual
            ),
            PassphraseViolation::TooLong { max, actual } => write!(
                f,
                "passphrase too long, maximum length is {} characters but entered passphrase was {} characters long",
                max, actual
            ),
            PassphraseViolation::ConfirmationMismatch => write!(f, "passphrases do not match"),
            PassphraseViolation::WrongOldPassphrase => write!(f, "incorrect current passphrase"),
        }
    }
}

/// Every rule a passphrase broke, in the order they were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassphraseViolations(Vec<PassphraseViolation>);

impl PassphraseViolations {
    /// Create an empty set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Record a violation.
    pub fn push(&mut self, violation: PassphraseViolation) {
        self.0.push(violation);
    }

    /// Append every violation from another set.
    pub fn extend(&mut self, other: PassphraseViolations) {
        self.0.extend(other.0);
    }

    /// Check if no rule was broken.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether a specific violation was recorded.
    pub fn contains(&self, violation: &PassphraseViolation) -> bool {
        self.0.contains(violation)
    }

    /// Iterate over the violations.
    pub fn iter(&self) -> impl Iterator<Item = &PassphraseViolation> {
        self.0.iter()
    }

    /// Turn a non-empty set into an error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for PassphraseViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}
