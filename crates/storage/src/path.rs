//! Path validation and decomposition utilities.
//!
//! Storage paths are plain strings: absolute, `/`-delimited, without a
//! trailing delimiter, and compared case-insensitively. The root folder is
//! `/`. Nothing here touches the record store; every lookup boundary derives
//! its identity key through [`key`] so that the store's own collation never
//! decides whether two paths are the same.

use crate::error::{ErrorKind, Result};
use std::iter;

/// Separator between path segments.
pub const DELIMITER: char = '/';
/// The root folder.
pub const ROOT: &str = "/";
/// Reserved final segment of a directory marker record.
pub const DIRECTORY_MARKER: &str = "__directory_marker__";
/// Longest accepted path, in bytes.
pub const MAX_PATH_LENGTH: usize = 1024;

/// Validates and normalizes a folder path. The root folder is accepted.
///
/// Empty segments and `.` are dropped, `..` pops the previous segment, and a
/// leading delimiter is added when missing. Paths that escape the root, contain
/// NUL or other control characters, use the reserved [`DIRECTORY_MARKER`]
/// segment, or exceed [`MAX_PATH_LENGTH`] are rejected.
///
/// # Examples
///
/// ```
/// use strata_storage::path::validate_folder;
/// assert_eq!(validate_folder("").unwrap(), "/");
/// assert_eq!(validate_folder("a//b/./c/").unwrap(), "/a/b/c");
/// assert_eq!(validate_folder("/a/b/..").unwrap(), "/a");
/// assert!(validate_folder("../etc").is_err());
/// ```
pub fn validate_folder(path: impl AsRef<str>) -> Result<String> {
    let path = path.as_ref();
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(DELIMITER) {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.to_string()));
                }
            },
            s => {
                // Null bytes truncate in C-based drivers; reject all control
                // characters along with them.
                if s.chars().any(char::is_control) || s.eq_ignore_ascii_case(DIRECTORY_MARKER) {
                    exn::bail!(ErrorKind::InvalidPath(path.to_string()));
                }
                segments.push(s);
            },
        }
    }
    let normalized = match segments.is_empty() {
        true => ROOT.to_string(),
        false => segments.iter().fold(String::with_capacity(path.len() + 1), |mut acc, s| {
            acc.push(DELIMITER);
            acc.push_str(s);
            acc
        }),
    };
    if normalized.len() > MAX_PATH_LENGTH {
        exn::bail!(ErrorKind::InvalidPath(path.to_string()));
    }
    Ok(normalized)
}

/// Validates and normalizes a file path.
///
/// Same rules as [`validate_folder`], except that the root cannot be a file.
///
/// ```
/// use strata_storage::path::validate_file;
/// assert_eq!(validate_file("a/b/c/file.txt").unwrap(), "/a/b/c/file.txt");
/// assert!(validate_file("/").is_err());
/// assert!(validate_file("/a/__directory_marker__").is_err());
/// ```
pub fn validate_file(path: impl AsRef<str>) -> Result<String> {
    let normalized = validate_folder(&path)?;
    if normalized == ROOT {
        exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_string()));
    }
    Ok(normalized)
}

/// Validates a single folder or file name (one segment, no delimiter).
pub fn validate_name(name: impl AsRef<str>) -> Result<String> {
    let name = name.as_ref();
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(DELIMITER)
        || name.chars().any(char::is_control)
        || name.eq_ignore_ascii_case(DIRECTORY_MARKER)
    {
        exn::bail!(ErrorKind::InvalidArgument(format!("invalid name: {name:?}")));
    }
    Ok(name.to_string())
}

/// Case-insensitive identity of a path.
pub fn key(path: impl AsRef<str>) -> String {
    path.as_ref().to_lowercase()
}

/// The parent folder of a normalized path; the root is its own parent.
///
/// ```
/// use strata_storage::path::parent;
/// assert_eq!(parent("/a/b/c.txt"), "/a/b");
/// assert_eq!(parent("/a"), "/");
/// assert_eq!(parent("/"), "/");
/// ```
pub fn parent(path: &str) -> &str {
    match path.rfind(DELIMITER) {
        Some(0) | None => ROOT,
        Some(idx) => &path[..idx],
    }
}

/// The final segment of a normalized path; empty for the root.
pub fn name(path: &str) -> &str {
    match path.rfind(DELIMITER) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Append a segment to a normalized folder path.
pub fn join(folder: &str, name: &str) -> String {
    match folder == ROOT {
        true => format!("{DELIMITER}{name}"),
        false => format!("{folder}{DELIMITER}{name}"),
    }
}

/// The directory marker record path of a folder.
pub fn marker(folder: &str) -> String {
    join(folder, DIRECTORY_MARKER)
}

/// Whether a path is a directory marker record.
pub fn is_marker(path: &str) -> bool {
    name(path).eq_ignore_ascii_case(DIRECTORY_MARKER)
}

/// Every folder on the way from the root to `path`, including `path` itself
/// and excluding the root.
///
/// ```
/// use strata_storage::path::ancestors;
/// let chain: Vec<_> = ancestors("/a/b/c").collect();
/// assert_eq!(chain, ["/a", "/a/b", "/a/b/c"]);
/// assert_eq!(ancestors("/").count(), 0);
/// ```
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices(DELIMITER)
        .map(|(idx, _)| idx)
        .filter(|idx| *idx > 0)
        .map(move |idx| &path[..idx])
        .chain(iter::once(path).filter(|p| *p != ROOT && !p.is_empty()))
}

/// Whether `path` lies strictly below `folder` (case-insensitive).
pub fn is_descendant(path: &str, folder: &str) -> bool {
    let (path, folder) = (key(path), key(folder));
    if folder == ROOT {
        return path != ROOT;
    }
    path.strip_prefix(&folder).is_some_and(|rest| rest.starts_with(DELIMITER) && rest.len() > 1)
}

/// Normalize a caller-supplied filter prefix: lower-cased with a leading
/// delimiter. A trailing delimiter is significant and kept as-is.
pub fn prefix_key(prefix: impl AsRef<str>) -> String {
    let prefix = key(prefix);
    match prefix.starts_with(DELIMITER) {
        true => prefix,
        false => format!("{DELIMITER}{prefix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a/b/c/file.txt", "/a/b/c/file.txt")]
    #[case("/a//b//c", "/a/b/c")]
    #[case("/a/./b/./c", "/a/b/c")]
    #[case("a/b/c/", "/a/b/c")]
    #[case("Fandom1///", "/Fandom1")]
    #[case("a/b/..", "/a")]
    fn test_valid_paths(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate_file(input).unwrap(), expected);
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("a/../../b")]
    #[case("..")]
    #[case("a\0b")]
    #[case("a/\tb")]
    #[case("a/__directory_marker__")]
    #[case("a/__DIRECTORY_MARKER__/b")]
    fn test_rejected_paths(#[case] input: &str) {
        let err = validate_folder(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_root_is_a_folder_but_not_a_file() {
        assert_eq!(validate_folder("").unwrap(), ROOT);
        assert_eq!(validate_folder("./").unwrap(), ROOT);
        assert_eq!(validate_folder("//").unwrap(), ROOT);
        assert!(validate_file("").is_err());
        assert!(validate_file("/.").is_err());
    }

    #[test]
    fn test_path_length_limit() {
        let long = "a".repeat(MAX_PATH_LENGTH);
        assert!(validate_file(&long).is_err());
        let fits = "a".repeat(MAX_PATH_LENGTH - 1);
        assert!(validate_file(&fits).is_ok());
    }

    #[rstest]
    #[case("docs")]
    #[case("with space")]
    fn test_valid_names(#[case] input: &str) {
        assert_eq!(validate_name(input).unwrap(), input);
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    #[case("a/b")]
    #[case("__directory_marker__")]
    fn test_rejected_names(#[case] input: &str) {
        let err = validate_name(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArgument(_)));
    }

    #[rstest]
    #[case("/a/b/c.txt", "/a/b", "c.txt")]
    #[case("/a", "/", "a")]
    #[case("/", "/", "")]
    fn test_decomposition(#[case] path: &str, #[case] expected_parent: &str, #[case] expected_name: &str) {
        assert_eq!(parent(path), expected_parent);
        assert_eq!(name(path), expected_name);
    }

    #[test]
    fn test_join_and_marker() {
        assert_eq!(join(ROOT, "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
        assert_eq!(marker("/a"), "/a/__directory_marker__");
        assert!(is_marker(&marker("/a")));
        assert!(is_marker("/a/__Directory_Marker__"));
        assert!(!is_marker("/a/b"));
    }

    #[test]
    fn test_descendants() {
        assert!(is_descendant("/a/b", "/a"));
        assert!(is_descendant("/A/b", "/a"));
        assert!(is_descendant("/a", ROOT));
        assert!(!is_descendant("/a", "/a"));
        assert!(!is_descendant("/ab", "/a"));
        assert!(!is_descendant(ROOT, ROOT));
    }

    #[test]
    fn test_prefix_key() {
        assert_eq!(prefix_key("Team1/"), "/team1/");
        assert_eq!(prefix_key("/team1"), "/team1");
    }
}
