//! File record store.
//!
//! Every function runs on the session it is handed (a pooled connection or a
//! transaction) and expects normalized paths.

use crate::error::{ErrorKind, Result};
use crate::models::{FileHeaderRow, FileRow, NewFileRow, to_millis};
use crate::predicate;
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use strata_storage::{PathFilters, path};
use time::UtcDateTime;

/// Case-insensitive exact match.
pub(crate) async fn get(conn: &mut SqliteConnection, path: &str) -> Result<Option<FileRow>> {
    sqlx::query_as(include_str!("../queries/get_file.sql"))
        .bind(path::key(path))
        .fetch_optional(conn)
        .await
        .or_raise(|| ErrorKind::Database)
}

pub(crate) async fn insert(conn: &mut SqliteConnection, row: &NewFileRow<'_>) -> Result<()> {
    sqlx::query(include_str!("../queries/insert_file.sql"))
        .bind(&row.path_key)
        .bind(row.path)
        .bind(&row.parent_key)
        .bind(row.parent_folder_path)
        .bind(row.contents)
        .bind(row.size)
        .bind(row.mime_type)
        .bind(row.created)
        .bind(row.created)
        .execute(conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    Ok(())
}

/// Replace the contents of an existing file; returns the number of rows changed.
pub(crate) async fn update_contents(
    conn: &mut SqliteConnection,
    path: &str,
    contents: &[u8],
    mime_type: &str,
    now: UtcDateTime,
) -> Result<u64> {
    let size = i64::try_from(contents.len()).or_raise(|| ErrorKind::InvalidData("file size"))?;
    let result = sqlx::query(include_str!("../queries/update_file_contents.sql"))
        .bind(contents)
        .bind(size)
        .bind(mime_type)
        .bind(to_millis(now))
        .bind(path::key(path))
        .execute(conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    Ok(result.rows_affected())
}

/// Bump the modification time of an existing file; returns the number of rows changed.
pub(crate) async fn touch(conn: &mut SqliteConnection, path: &str, now: UtcDateTime) -> Result<u64> {
    let result = sqlx::query(include_str!("../queries/touch_file.sql"))
        .bind(to_millis(now))
        .bind(path::key(path))
        .execute(conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete(conn: &mut SqliteConnection, path: &str) -> Result<u64> {
    let result = sqlx::query(include_str!("../queries/delete_file.sql"))
        .bind(path::key(path))
        .execute(conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    Ok(result.rows_affected())
}

/// Insert the directory marker of `folder` unless it already exists.
pub(crate) async fn insert_marker(conn: &mut SqliteConnection, folder: &str, now: UtcDateTime) -> Result<u64> {
    let marker = path::marker(folder);
    let now = to_millis(now);
    let result = sqlx::query(include_str!("../queries/insert_marker.sql"))
        .bind(path::key(&marker))
        .bind(&marker)
        .bind(path::key(folder))
        .bind(folder)
        .bind(now)
        .bind(now)
        .execute(conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    Ok(result.rows_affected())
}

/// One listing query, ordered by path and limited to `limit` rows.
pub(crate) struct ListQuery<'a> {
    pub(crate) folder: &'a str,
    pub(crate) recursive: bool,
    pub(crate) filters: &'a [PathFilters],
    pub(crate) after: Option<&'a str>,
    pub(crate) limit: usize,
}

pub(crate) async fn list(conn: &mut SqliteConnection, query: &ListQuery<'_>) -> Result<Vec<FileHeaderRow>> {
    let limit = i64::try_from(query.limit).or_raise(|| ErrorKind::InvalidData("page size"))?;
    let mut qb: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("SELECT path, size, mime_type, created, updated FROM file WHERE 1 = 1");
    predicate::push_scope(&mut qb, query.folder, query.recursive);
    predicate::push_not_marker(&mut qb);
    predicate::push_filters(&mut qb, query.filters);
    predicate::push_after(&mut qb, query.after);
    qb.push(" ORDER BY path LIMIT ");
    qb.push_bind(limit);
    qb.build_query_as().fetch_all(conn).await.or_raise(|| ErrorKind::Database)
}

/// Distinct parent folders of every visible record below `folder`, markers
/// included, in ascending order.
pub(crate) async fn distinct_parents(
    conn: &mut SqliteConnection,
    folder: &str,
    filters: &[PathFilters],
) -> Result<Vec<String>> {
    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT DISTINCT parent_folder_path FROM file WHERE 1 = 1");
    predicate::push_scope(&mut qb, folder, true);
    predicate::push_filters(&mut qb, filters);
    qb.push(" ORDER BY parent_folder_path");
    qb.build_query_scalar().fetch_all(conn).await.or_raise(|| ErrorKind::Database)
}

/// Counts of what a forced folder deletion removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeletedTree {
    pub(crate) files: u64,
    pub(crate) properties: u64,
}

/// Delete every visible record below `folder` and their properties.
pub(crate) async fn delete_tree(
    conn: &mut SqliteConnection,
    folder: &str,
    filters: &[PathFilters],
) -> Result<DeletedTree> {
    let mut qb: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("DELETE FROM file_meta WHERE path IN (SELECT path_key FROM file WHERE 1 = 1");
    predicate::push_scope(&mut qb, folder, true);
    predicate::push_filters(&mut qb, filters);
    qb.push(")");
    let properties = qb.build().execute(&mut *conn).await.or_raise(|| ErrorKind::Database)?.rows_affected();

    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("DELETE FROM file WHERE 1 = 1");
    predicate::push_scope(&mut qb, folder, true);
    predicate::push_filters(&mut qb, filters);
    let files = qb.build().execute(&mut *conn).await.or_raise(|| ErrorKind::Database)?.rows_affected();
    Ok(DeletedTree { files, properties })
}
