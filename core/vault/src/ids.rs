//! Record id generation.

use rand::Rng;
use std::collections::HashSet;
use tracing::debug;

use crate::model::RecordId;
use lockbox_common::{Error, Result};

/// Largest id handed out: 2^53 - 1, the largest integer a JSON number can
/// carry without loss in common readers.
pub const MAX_RECORD_ID: u64 = (1 << 53) - 1;

/// Draws before giving up on finding a free id.
pub const MAX_ID_ATTEMPTS: usize = 1024;

/// Generate a random record id that is not in `existing`.
///
/// # Errors
/// - Returns error if no free id was found within `MAX_ID_ATTEMPTS` draws
pub fn generate_record_id(existing: &HashSet<RecordId>) -> Result<RecordId> {
    let mut rng = rand::thread_rng();
    generate_record_id_with(existing, || rng.gen_range(1..=MAX_RECORD_ID))
}

/// Generate a record id from a caller-supplied source of candidates.
///
/// Candidates that are out of range or already taken are discarded and a new
/// one is drawn.
pub fn generate_record_id_with<F>(existing: &HashSet<RecordId>, mut draw: F) -> Result<RecordId>
where
    F: FnMut() -> u64,
{
    for attempt in 0..MAX_ID_ATTEMPTS {
        let Ok(candidate) = RecordId::new(draw()) else {
            continue;
        };

        if !existing.contains(&candidate) {
            if attempt > 0 {
                debug!(attempts = attempt + 1, "Resampled record id after collision");
            }
            return Ok(candidate);
        }
    }

    Err(Error::AlreadyExists(format!(
        "No free record id after {} attempts",
        MAX_ID_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> RecordId {
        RecordId::new(n).unwrap()
    }

    #[test]
    fn test_generated_ids_in_range() {
        let existing = HashSet::new();
        for _ in 0..100 {
            let generated = generate_record_id(&existing).unwrap();
            assert!(generated.get() >= 1 && generated.get() <= MAX_RECORD_ID);
        }
    }

    #[test]
    fn test_growing_set_never_duplicates() {
        let mut existing = HashSet::new();
        for _ in 0..1000 {
            let generated = generate_record_id(&existing).unwrap();
            assert!(existing.insert(generated));
        }
    }

    #[test]
    fn test_forced_collision_resamples() {
        let existing: HashSet<_> = [id(42)].into_iter().collect();
        let mut draws = vec![42u64, 42, 7].into_iter();
        let mut calls = 0;

        let generated = generate_record_id_with(&existing, || {
            calls += 1;
            draws.next().unwrap()
        })
        .unwrap();

        assert_eq!(generated, id(7));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_zero_candidate_is_resampled() {
        let existing = HashSet::new();
        let mut draws = vec![0u64, MAX_RECORD_ID + 1, 9].into_iter();

        let generated = generate_record_id_with(&existing, || draws.next().unwrap()).unwrap();
        assert_eq!(generated, id(9));
    }

    #[test]
    fn test_exhaustion_is_bounded() {
        let existing: HashSet<_> = [id(1)].into_iter().collect();
        let mut calls = 0;

        let result = generate_record_id_with(&existing, || {
            calls += 1;
            1
        });

        assert!(result.is_err());
        assert_eq!(calls, MAX_ID_ATTEMPTS);
    }
}
