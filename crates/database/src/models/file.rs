use super::{from_millis, to_millis};
use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use std::collections::HashMap;
use strata_storage::{File, FileMetadata, path};
use time::UtcDateTime;

/// A file row without its contents, as returned by listings.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FileHeaderRow {
    pub(crate) path: String,
    pub(crate) size: i64,
    pub(crate) mime_type: String,
    pub(crate) created: i64,
    pub(crate) updated: i64,
}
impl TryFrom<FileHeaderRow> for FileMetadata {
    type Error = Error;
    fn try_from(row: FileHeaderRow) -> Result<Self, Self::Error> {
        Ok(FileMetadata {
            name: path::name(&row.path).to_string(),
            created: from_millis(row.created, "created")?,
            modified: from_millis(row.updated, "updated")?,
            size: u64::try_from(row.size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            mime_type: row.mime_type,
            properties: HashMap::new(),
            full_path: row.path,
        })
    }
}

/// A complete file row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FileRow {
    #[sqlx(flatten)]
    pub(crate) header: FileHeaderRow,
    pub(crate) contents: Vec<u8>,
}
impl FileRow {
    pub(crate) fn into_file(self, properties: HashMap<String, String>) -> Result<File, Error> {
        let meta = FileMetadata { properties, ..FileMetadata::try_from(self.header)? };
        Ok(File::new(meta, self.contents))
    }
}

/// Every column needed to insert a file row for a normalized path.
#[derive(Debug)]
pub(crate) struct NewFileRow<'a> {
    pub(crate) path_key: String,
    pub(crate) path: &'a str,
    pub(crate) parent_key: String,
    pub(crate) parent_folder_path: &'a str,
    pub(crate) contents: &'a [u8],
    pub(crate) size: i64,
    pub(crate) mime_type: &'a str,
    pub(crate) created: i64,
}
impl<'a> NewFileRow<'a> {
    pub(crate) fn new(path: &'a str, contents: &'a [u8], mime_type: &'a str, now: UtcDateTime) -> Result<Self, Error> {
        let parent = path::parent(path);
        Ok(Self {
            path_key: path::key(path),
            path,
            parent_key: path::key(parent),
            parent_folder_path: parent,
            contents,
            size: i64::try_from(contents.len()).or_raise(|| ErrorKind::InvalidData("file size"))?,
            mime_type,
            created: to_millis(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_model() {
        let row = FileRow {
            header: FileHeaderRow {
                path: "/Docs/Report.PDF".to_string(),
                size: 3,
                mime_type: "application/pdf".to_string(),
                created: 1_700_000_000_000,
                updated: 1_700_000_000_500,
            },
            contents: b"pdf".to_vec(),
        };
        let properties = HashMap::from([("k".to_string(), "v".to_string())]);
        let file = row.into_file(properties).unwrap();
        assert_eq!(file.name, "Report.PDF");
        assert_eq!(file.full_path, "/Docs/Report.PDF");
        assert_eq!(file.size, 3);
        assert_eq!(file.contents, b"pdf");
        assert_eq!(file.properties["k"], "v");
        assert_eq!(file.modified - file.created, time::Duration::milliseconds(500));
    }

    #[test]
    fn test_negative_size_is_invalid_data() {
        let row = FileHeaderRow {
            path: "/a".to_string(),
            size: -1,
            mime_type: String::new(),
            created: 0,
            updated: 0,
        };
        let err = FileMetadata::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("file size")));
    }

    #[test]
    fn test_new_row_derives_parent_and_keys() {
        let row = NewFileRow::new("/A/b/C.txt", b"abc", "text/plain", UtcDateTime::now()).unwrap();
        assert_eq!(row.path_key, "/a/b/c.txt");
        assert_eq!(row.parent_folder_path, "/A/b");
        assert_eq!(row.parent_key, "/a/b");
        assert_eq!(row.size, 3);

        let row = NewFileRow::new("/top.txt", b"", "", UtcDateTime::now()).unwrap();
        assert_eq!(row.parent_folder_path, "/");
        assert_eq!(row.size, 0);
    }
}
