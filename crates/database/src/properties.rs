//! Property store: key/value pairs attached to a file's path key.

use crate::error::{ErrorKind, Result};
use crate::models::{PropertyRow, to_millis};
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use time::UtcDateTime;

/// Keys per `IN (...)` lookup, well below SQLite's bound-parameter limit.
const CHUNK_SIZE: usize = 500;

pub(crate) type Properties = HashMap<String, String>;

/// Fetch the properties of many files at once, keyed by path key.
///
/// Files without properties have no entry in the result.
pub(crate) async fn get_all(conn: &mut SqliteConnection, keys: &[String]) -> Result<HashMap<String, Properties>> {
    let mut found: HashMap<String, Properties> = HashMap::new();
    for chunk in keys.chunks(CHUNK_SIZE) {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(r#"SELECT path, "key", value FROM file_meta WHERE path IN ("#);
        let mut separated = qb.separated(", ");
        for key in chunk {
            separated.push_bind(key.as_str());
        }
        separated.push_unseparated(")");
        let rows: Vec<PropertyRow> = qb.build_query_as().fetch_all(&mut *conn).await.or_raise(|| ErrorKind::Database)?;
        for row in rows {
            found.entry(row.path).or_default().insert(row.key, row.value);
        }
    }
    Ok(found)
}

/// Insert or update every property of one file.
pub(crate) async fn upsert_all(
    conn: &mut SqliteConnection,
    key: &str,
    properties: &Properties,
    now: UtcDateTime,
) -> Result<()> {
    let now = to_millis(now);
    for (name, value) in properties {
        sqlx::query(include_str!("../queries/upsert_property.sql"))
            .bind(key)
            .bind(name)
            .bind(value)
            .bind(now)
            .bind(now)
            .execute(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
    }
    Ok(())
}

/// Remove every property of one file; returns the number of rows removed.
pub(crate) async fn delete_all(conn: &mut SqliteConnection, key: &str) -> Result<u64> {
    let result = sqlx::query(include_str!("../queries/delete_properties.sql"))
        .bind(key)
        .execute(conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    Ok(result.rows_affected())
}
