//! Temporary client-side identifiers.

use uuid::Uuid;

/// Prefix of every client-generated id.
///
/// A record whose id carries this prefix has never been confirmed by the
/// remote authority.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Generates a new temporary id (`tmp-<uuid v4>`).
#[must_use]
pub fn temporary_id() -> String {
    format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4())
}

/// Returns true if `id` was generated locally and not yet replaced by a
/// server-issued id.
#[must_use]
pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_ids_are_unique_and_marked() {
        let a = temporary_id();
        let b = temporary_id();
        assert_ne!(a, b);
        assert!(is_temporary_id(&a));
        assert!(is_temporary_id("tmp-1"));
    }

    #[test]
    fn server_ids_are_not_temporary() {
        assert!(!is_temporary_id("42"));
        assert!(!is_temporary_id("kw_tmp-1"));
    }
}
