//! Passphrase policy.
//!
//! Every rule is checked and every violation reported, so the user sees all
//! problems with a new passphrase at once.

use lockbox_common::{Passphrase, PassphraseViolation, PassphraseViolations};

/// Minimum passphrase length in characters.
pub const MIN_PASSPHRASE_LENGTH: usize = 5;

/// Maximum passphrase length in characters.
pub const MAX_PASSPHRASE_LENGTH: usize = 64;

/// Check the length bounds of a passphrase.
pub fn validate_passphrase(passphrase: &Passphrase) -> PassphraseViolations {
    let length = passphrase.char_count();
    let mut violations = PassphraseViolations::new();

    if length > MAX_PASSPHRASE_LENGTH {
        violations.push(PassphraseViolation::TooLong {
            max: MAX_PASSPHRASE_LENGTH,
            actual: length,
        });
    }

    if length < MIN_PASSPHRASE_LENGTH {
        violations.push(PassphraseViolation::TooShort {
            min: MIN_PASSPHRASE_LENGTH,
            actual: length,
        });
    }

    violations
}

/// Check that a confirmation matches its passphrase.
pub fn check_confirmation(passphrase: &Passphrase, confirmation: &Passphrase) -> PassphraseViolations {
    let mut violations = PassphraseViolations::new();
    if passphrase != confirmation {
        violations.push(PassphraseViolation::ConfirmationMismatch);
    }
    violations
}

/// Check a passphrase being set, together with its confirmation.
pub fn validate_new_passphrase(
    passphrase: &Passphrase,
    confirmation: &Passphrase,
) -> PassphraseViolations {
    let mut violations = validate_passphrase(passphrase);
    violations.extend(check_confirmation(passphrase, confirmation));
    violations
}
