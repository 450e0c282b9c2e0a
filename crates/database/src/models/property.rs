/// One key/value property of a file.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PropertyRow {
    pub(crate) path: String,
    pub(crate) key: String,
    pub(crate) value: String,
}
