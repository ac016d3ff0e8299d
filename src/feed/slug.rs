//! Slug generation
//!
//! Slugs are minted once at write time and persisted on the document, so
//! every read path addresses content by an indexed field instead of
//! re-deriving identifiers from titles. Collisions append a numeric
//! suffix starting at `-2`.

/// Lowercase, trim, and collapse a title into a URL-safe slug.
///
/// Alphanumerics are kept, everything else collapses into single hyphens.
/// Falls back to `"untitled"` when nothing survives.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Pick the first free slug given the set of already-taken candidates.
///
/// `taken` is the result of querying existing slugs with the base prefix;
/// the caller holds a unique index on the field as the real guarantee.
pub fn unique_slug(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|t| t == base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.iter().any(|t| t == &candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("BNPL Growth in LatAm"), "bnpl-growth-in-latam");
        assert_eq!(slugify("  Payments: 2026 Outlook!  "), "payments-2026-outlook");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("a --- b"), "a-b");
        assert_eq!(slugify("a&b/c"), "a-b-c");
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        assert_eq!(slugify("!!!"), "untitled");
        assert_eq!(slugify(""), "untitled");
    }

    #[test]
    fn test_unique_slug_suffixes_from_two() {
        assert_eq!(unique_slug("report", &[]), "report");

        let taken = vec!["report".to_string()];
        assert_eq!(unique_slug("report", &taken), "report-2");

        let taken = vec!["report".to_string(), "report-2".to_string()];
        assert_eq!(unique_slug("report", &taken), "report-3");
    }

    #[test]
    fn test_unique_slug_skips_holes() {
        // report-2 freed up by a delete; next mint still lands on the hole
        let taken = vec!["report".to_string(), "report-3".to_string()];
        assert_eq!(unique_slug("report", &taken), "report-2");
    }
}
