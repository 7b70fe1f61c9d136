//! Slug normalisation.
//!
//! Every slug comparison and every slug written into a redirect goes through
//! [`normalize`], so `/About `, `/about` and `/ABOUT` name the same record.

/// Trims surrounding whitespace and lower-cases.
///
/// Returns `None` for input that is not text. Idempotent:
/// `normalize(normalize(s)) == normalize(s)`.
pub fn normalize<S: AsRef<str>>(slug: Option<S>) -> Option<String> {
    slug.map(|s| s.as_ref().trim().to_lowercase())
}

/// Shorthand for the common case of a plain `&str`.
pub fn normalize_str(slug: &str) -> String {
    slug.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_lowercases() {
        assert_eq!(normalize(Some("  Hello-World ")), Some("hello-world".to_owned()));
        assert_eq!(normalize_str("\tABOUT\n"), "about");
    }

    #[test]
    fn test_absent_input() {
        assert_eq!(normalize::<&str>(None), None);
    }

    #[test]
    fn test_idempotent() {
        for s in ["", "  ", "Mixed Case ", "ümlaut-Ä", "already-normal", " x=Y "] {
            let once = normalize_str(s);
            assert_eq!(normalize_str(&once), once, "input {s:?}");
            assert_eq!(normalize(normalize(Some(s))), normalize(Some(s)));
        }
    }
}
