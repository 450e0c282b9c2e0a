//! Folder synthesis.
//!
//! Folders have no rows of their own (beyond directory markers); they are
//! implied by the parent paths of the records below them. Given the distinct
//! parent paths found under a folder, every ancestor of every parent path is
//! a folder, and the ones strictly below the listed folder are reported.

use crate::file::Folder;
use crate::path;
use std::collections::HashSet;

/// Derive the folders below `folder` from the distinct parent paths of the
/// records in scope.
///
/// Parent paths are deduplicated case-insensitively (the first casing seen
/// wins), so feeding them in ascending order gives deterministic names. With
/// `recursive` unset only direct children of `folder` are reported. The result
/// is sorted by path.
///
/// ```
/// use strata_storage::folder::synthesize;
/// let folders = synthesize("/", ["/a/b/c"], true);
/// let paths: Vec<_> = folders.iter().map(|f| f.full_path.as_str()).collect();
/// assert_eq!(paths, ["/a", "/a/b", "/a/b/c"]);
/// ```
pub fn synthesize<I, S>(folder: &str, parents: I, recursive: bool) -> Vec<Folder>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let folder_key = path::key(folder);
    let mut visited = HashSet::new();
    let mut folders = Vec::new();
    for parent in parents {
        for ancestor in path::ancestors(parent.as_ref()) {
            // Lower-casing can change byte lengths, so only keys are compared.
            if !path::is_descendant(ancestor, folder) || !visited.insert(path::key(ancestor)) {
                continue;
            }
            if !recursive && path::key(path::parent(ancestor)) != folder_key {
                continue;
            }
            folders.push(Folder {
                full_path: ancestor.to_string(),
                name: path::name(ancestor).to_string(),
            });
        }
    }
    folders.sort();
    folders
}
