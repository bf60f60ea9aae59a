//! Synchronization id generation.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of a synchronization id.
pub const SYNCHRONIZATION_ID_LENGTH: usize = 32;

/// Generate an opaque synchronization id: 32 uniform alphanumerics.
pub fn random_synchronization_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SYNCHRONIZATION_ID_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_length_and_charset() {
        let id = random_synchronization_id();
        assert_eq!(id.len(), SYNCHRONIZATION_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(random_synchronization_id(), random_synchronization_id());
    }
}
