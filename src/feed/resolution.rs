//! Soft-miss resolution type
//!
//! Several read paths can come up empty without anything being wrong: a
//! feed page past the last day of content, a filter name nobody has used
//! yet, a context with no taxonomy pairs to match on. Handlers need to
//! tell those apart from real failures, so lookups return [`Resolution`]
//! instead of overloading `Option` or an error variant.

use serde::Serialize;

/// Why a lookup legitimately produced nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyReason {
    /// Requested page is beyond the last day of content
    PageOutOfRange,
    /// A filter name did not resolve to any taxonomy entity
    UnknownFilter,
    /// The source context has no (sub-sector, signal) pairs to match on
    NoPairs,
}

impl EmptyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyReason::PageOutOfRange => "page-out-of-range",
            EmptyReason::UnknownFilter => "unknown-filter",
            EmptyReason::NoPairs => "no-pairs",
        }
    }
}

/// Outcome of a lookup that can be legitimately empty.
///
/// `Empty` is a successful resolution, not an error; callers map it to an
/// empty 200 body, never a 4xx/5xx.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Found(T),
    Empty(EmptyReason),
}

impl<T> Resolution<T> {
    /// Extract the value, substituting a default on a soft miss.
    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        match self {
            Resolution::Found(value) => value,
            Resolution::Empty(_) => T::default(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Resolution::Found(value) => Resolution::Found(f(value)),
            Resolution::Empty(reason) => Resolution::Empty(reason),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Resolution::Empty(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_maps_to_default() {
        let r: Resolution<Vec<u32>> = Resolution::Empty(EmptyReason::NoPairs);
        assert!(r.is_empty());
        assert_eq!(r.unwrap_or_default(), Vec::<u32>::new());
    }

    #[test]
    fn test_map_preserves_reason() {
        let r: Resolution<u32> = Resolution::Empty(EmptyReason::UnknownFilter);
        let mapped = r.map(|n| n * 2);
        assert_eq!(mapped, Resolution::Empty(EmptyReason::UnknownFilter));

        let r = Resolution::Found(21).map(|n| n * 2);
        assert_eq!(r, Resolution::Found(42));
    }

    #[test]
    fn test_reason_wire_names() {
        let json = serde_json::to_string(&EmptyReason::PageOutOfRange).unwrap();
        assert_eq!(json, "\"page-out-of-range\"");
        assert_eq!(EmptyReason::PageOutOfRange.as_str(), "page-out-of-range");
    }
}
