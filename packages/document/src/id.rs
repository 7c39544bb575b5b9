//! Identifier generation (ULID)

use ulid::Ulid;

/// Length of a canonical ULID string
pub const ID_LENGTH: usize = 26;

/// Generate a new lexicographically-sortable identifier
pub fn new_id() -> String {
    Ulid::new().to_string()
}

/// Check that `id` is a canonical 26-character ULID
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LENGTH && Ulid::from_string(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_valid_and_unique() {
        let a = new_id();
        let b = new_id();

        assert!(is_valid_id(&a));
        assert!(is_valid_id(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_malformed_ids() {
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("hero"));
        // 'U' is outside the Crockford alphabet
        assert!(!is_valid_id("01ARZ3NDEKTSV4RRFFQ69G5FAU"));
        assert!(is_valid_id("01ARZ3NDEKTSV4RRFFQ69G5FAV"));
    }
}
