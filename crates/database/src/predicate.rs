//! Dynamic WHERE clauses over the `file` table.
//!
//! Every function appends one ` AND (...)` term to a query that already has a
//! `WHERE` clause. All comparisons are made against the lower-cased `*_key`
//! columns, so they never depend on the collation of the store.

use sqlx::{QueryBuilder, Sqlite};
use strata_storage::{PathFilters, path};

/// Escape the LIKE wildcards (and the escape character itself).
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// LIKE pattern matching every key that begins with `prefix`.
fn starts_with(prefix: &str) -> String {
    format!("{}%", escape_like(prefix))
}

/// Rows whose parent folder is `folder` or, when recursive, anywhere below it.
pub(crate) fn push_scope(qb: &mut QueryBuilder<'_, Sqlite>, folder: &str, recursive: bool) {
    let folder_key = path::key(folder);
    match (recursive, folder_key == path::ROOT) {
        (true, true) => {},
        (true, false) => {
            let below = starts_with(&format!("{folder_key}{}", path::DELIMITER));
            qb.push(" AND (parent_key = ");
            qb.push_bind(folder_key);
            qb.push(" OR parent_key LIKE ");
            qb.push_bind(below);
            qb.push(r" ESCAPE '\')");
        },
        (false, _) => {
            qb.push(" AND parent_key = ");
            qb.push_bind(folder_key);
        },
    }
}

/// Exclude directory marker records.
pub(crate) fn push_not_marker(qb: &mut QueryBuilder<'_, Sqlite>) {
    qb.push(" AND path_key NOT LIKE ");
    qb.push_bind(format!("%{}{}", path::DELIMITER, escape_like(&path::key(path::DIRECTORY_MARKER))));
    qb.push(r" ESCAPE '\'");
}

/// Keep only rows visible through every filter set.
pub(crate) fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: &[PathFilters]) {
    for set in filters {
        if !set.denied_prefixes().is_empty() {
            qb.push(" AND NOT (");
            push_any_prefix(qb, set.denied_prefixes());
            qb.push(")");
        }
        if !set.allowed_prefixes().is_empty() {
            qb.push(" AND (");
            push_any_prefix(qb, set.allowed_prefixes());
            qb.push(")");
        }
    }
}

fn push_any_prefix(qb: &mut QueryBuilder<'_, Sqlite>, prefixes: &[String]) {
    for (idx, prefix) in prefixes.iter().enumerate() {
        if idx > 0 {
            qb.push(" OR ");
        }
        qb.push("path_key LIKE ");
        qb.push_bind(starts_with(prefix));
        qb.push(r" ESCAPE '\'");
    }
}

/// Continue strictly after the cursor, in stored casing.
pub(crate) fn push_after(qb: &mut QueryBuilder<'_, Sqlite>, after: Option<&str>) {
    if let Some(after) = after {
        qb.push(" AND path > ");
        qb.push_bind(after.to_string());
    }
}
