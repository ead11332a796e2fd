use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = pomohub_common::id::prefixed_ulid("spc");
/// assert!(id.starts_with("spc_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Returns true if `raw` is `<prefix>_<ulid>` with a well-formed ULID body.
///
/// # Examples
/// ```
/// use pomohub_common::id::{is_prefixed_ulid, prefixed_ulid};
///
/// assert!(is_prefixed_ulid("spc", &prefixed_ulid("spc")));
/// assert!(!is_prefixed_ulid("spc", "spc_not-a-ulid"));
/// ```
pub fn is_prefixed_ulid(prefix: &str, raw: &str) -> bool {
    raw.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|body| Ulid::from_string(body).is_ok())
}

/// Marker trait for types that represent a prefixed ID.
pub trait PrefixedId {
    const PREFIX: &'static str;

    fn generate() -> String {
        prefixed_ulid(Self::PREFIX)
    }
}

/// Well-known ID prefixes.
pub mod prefix {
    pub const USER: &str = "usr";
    pub const SPACE: &str = "spc";
    pub const MESSAGE: &str = "msg";
    pub const CONNECTION: &str = "conn";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_ulid_format() {
        let id = prefixed_ulid("spc");
        assert!(id.starts_with("spc_"));
        // ULID is 26 chars, plus prefix + underscore
        assert_eq!(id.len(), 4 + 26);
    }

    #[test]
    fn test_uniqueness() {
        let a = prefixed_ulid("usr");
        let b = prefixed_ulid("usr");
        assert_ne!(a, b);
    }

    #[test]
    fn test_validation_rejects_wrong_prefix_and_body() {
        let id = prefixed_ulid(prefix::SPACE);
        assert!(is_prefixed_ulid(prefix::SPACE, &id));
        assert!(!is_prefixed_ulid(prefix::USER, &id));
        assert!(!is_prefixed_ulid(prefix::SPACE, "spc"));
        assert!(!is_prefixed_ulid(prefix::SPACE, "spc_"));
        assert!(!is_prefixed_ulid(prefix::SPACE, &format!("spc_{}", "@".repeat(26))));
        assert!(!is_prefixed_ulid(prefix::SPACE, "spcx01ARZ3NDEKTSV4RRFFQ69G5FAV"));
    }

    struct Space;

    impl PrefixedId for Space {
        const PREFIX: &'static str = prefix::SPACE;
    }

    #[test]
    fn test_prefixed_id_trait() {
        let id = Space::generate();
        assert!(id.starts_with("spc_"));
        assert!(is_prefixed_ulid(Space::PREFIX, &id));
    }
}
