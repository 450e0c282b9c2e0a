//! Path-prefix access filters.

use crate::path;

/// Caller-scoped visibility restrictions.
///
/// A path is allowed when it matches none of the denied prefixes and, if any
/// allowed prefixes are configured, at least one of them. No prefixes at all
/// means unrestricted. Matching is a plain case-insensitive string prefix test
/// against the normalized path, so a trailing delimiter matters: `/team1/`
/// does not admit `/team10/x`, while `/team1` does.
///
/// Several filter sets applied to one operation narrow each other (a path
/// must be allowed by every set), see [`allows_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathFilters {
    allowed_prefixes: Vec<String>,
    denied_prefixes: Vec<String>,
}
impl PathFilters {
    /// Filters allowing only the given prefixes.
    pub fn allowing(prefixes: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            allowed_prefixes: prefixes.into_iter().map(path::prefix_key).collect(),
            denied_prefixes: Vec::new(),
        }
    }

    pub fn allow_prefix(mut self, prefix: impl AsRef<str>) -> Self {
        self.allowed_prefixes.push(path::prefix_key(prefix));
        self
    }

    pub fn deny_prefix(mut self, prefix: impl AsRef<str>) -> Self {
        self.denied_prefixes.push(path::prefix_key(prefix));
        self
    }

    /// Normalized (lower-cased, rooted) allowed prefixes.
    pub fn allowed_prefixes(&self) -> &[String] {
        &self.allowed_prefixes
    }

    /// Normalized (lower-cased, rooted) denied prefixes.
    pub fn denied_prefixes(&self) -> &[String] {
        &self.denied_prefixes
    }

    pub fn is_unrestricted(&self) -> bool {
        self.allowed_prefixes.is_empty() && self.denied_prefixes.is_empty()
    }

    /// Whether a normalized path is visible through these filters.
    pub fn is_allowed(&self, path: &str) -> bool {
        let key = path::key(path);
        if self.denied_prefixes.iter().any(|prefix| key.starts_with(prefix.as_str())) {
            return false;
        }
        self.allowed_prefixes.is_empty() || self.allowed_prefixes.iter().any(|prefix| key.starts_with(prefix.as_str()))
    }
}

/// Whether a path passes every filter set.
pub fn allows_all(filters: &[PathFilters], path: &str) -> bool {
    filters.iter().all(|f| f.is_allowed(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_empty_filters_are_unrestricted() {
        let filters = PathFilters::default();
        assert!(filters.is_unrestricted());
        assert!(filters.is_allowed("/anything/at/all"));
    }

    #[rstest]
    #[case("/team1/report.txt", true)]
    #[case("/TEAM1/Report.txt", true)]
    #[case("/team2/secret", false)]
    #[case("/team10/x", false)]
    #[case("/team1", false)]
    fn test_allowed_prefix(#[case] path: &str, #[case] expected: bool) {
        let filters = PathFilters::allowing(["team1/"]);
        assert_eq!(filters.is_allowed(path), expected);
    }

    #[test]
    fn test_any_allowed_prefix_matches() {
        let filters = PathFilters::allowing(["/a/", "/b/"]);
        assert!(filters.is_allowed("/a/1"));
        assert!(filters.is_allowed("/b/2"));
        assert!(!filters.is_allowed("/c/3"));
    }

    #[test]
    fn test_denied_prefix_wins() {
        let filters = PathFilters::allowing(["/team1/"]).deny_prefix("/team1/private/");
        assert!(filters.is_allowed("/team1/public/a"));
        assert!(!filters.is_allowed("/team1/Private/a"));
        assert!(!filters.is_unrestricted());
    }

    #[test]
    fn test_multiple_sets_narrow() {
        let sets = [PathFilters::allowing(["/a/"]), PathFilters::allowing(["/a/b/"])];
        assert!(allows_all(&sets, "/a/b/c"));
        assert!(!allows_all(&sets, "/a/c"));
        assert!(allows_all(&[], "/anywhere"));
    }
}
