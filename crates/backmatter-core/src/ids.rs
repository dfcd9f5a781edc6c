//! PMB identifier normalization.
//!
//! Letters refer to PMB entities in several spellings: `#pmb123`,
//! `person__123`, `#pmbperson__123`, bare `123`. All of them collapse to the
//! canonical `pmb123`.

/// Id of the edition's central subject (Arthur Schnitzler).
pub const CENTRAL_SUBJECT_ID: &str = "pmb2121";

const PREFIX: &str = "pmb";

/// Canonical form of a PMB identifier, `None` if nothing remains.
///
/// ```
/// use backmatter_core::normalize_pmb_id;
///
/// assert_eq!(normalize_pmb_id("#person__123").as_deref(), Some("pmb123"));
/// assert_eq!(normalize_pmb_id("pmbperson__123").as_deref(), Some("pmb123"));
/// assert_eq!(normalize_pmb_id(" #pmb5 ").as_deref(), Some("pmb5"));
/// assert_eq!(normalize_pmb_id("77").as_deref(), Some("pmb77"));
/// assert_eq!(normalize_pmb_id("#"), None);
/// assert_eq!(normalize_pmb_id("#pmb"), None);
/// ```
#[must_use]
pub fn normalize_pmb_id(raw: &str) -> Option<String> {
    let cleaned: String = raw.trim().chars().filter(|&c| c != '#').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    if let Some((_, suffix)) = cleaned.rsplit_once("__") {
        if suffix.is_empty() {
            return None;
        }
        return Some(format!("{PREFIX}{suffix}"));
    }

    if cleaned == PREFIX {
        None
    } else if cleaned.starts_with(PREFIX) {
        Some(cleaned.to_string())
    } else {
        Some(format!("{PREFIX}{cleaned}"))
    }
}

/// Numeric part of a canonical id, as used in API paths (`pmb123` → `123`).
#[must_use]
pub fn pmb_number(id: &str) -> &str {
    id.strip_prefix(PREFIX).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_variants() {
        assert_eq!(normalize_pmb_id("work__9001").as_deref(), Some("pmb9001"));
        assert_eq!(normalize_pmb_id("#pmb12345").as_deref(), Some("pmb12345"));
        assert_eq!(normalize_pmb_id("a__b__42").as_deref(), Some("pmb42"));
        assert_eq!(normalize_pmb_id("").as_deref(), None);
        assert_eq!(normalize_pmb_id("   ").as_deref(), None);
        assert_eq!(normalize_pmb_id("person__").as_deref(), None);
        assert_eq!(normalize_pmb_id("pmb").as_deref(), None);
        assert_eq!(normalize_pmb_id(" #pmb ").as_deref(), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["#person__1", "pmb7", "12", "#pmbplace__3"] {
            let once = normalize_pmb_id(raw).unwrap();
            assert_eq!(normalize_pmb_id(&once).as_deref(), Some(once.as_str()));
        }
    }

    proptest::proptest! {
        #[test]
        fn prop_normalized_ids_are_fixed_points(raw in "[#a-z0-9_ ]{0,24}") {
            if let Some(id) = normalize_pmb_id(&raw) {
                proptest::prop_assert!(id.starts_with("pmb") && id.len() > 3);
                proptest::prop_assert!(!id.contains('#'));
                proptest::prop_assert_eq!(normalize_pmb_id(&id), Some(id.clone()));
            }
        }
    }

    #[test]
    fn test_pmb_number() {
        assert_eq!(pmb_number("pmb2121"), "2121");
        assert_eq!(pmb_number("2121"), "2121");
    }
}
