//! Flat CSV export of the post and comment stores.

use std::path::Path;

use feedwatch_core::{Comment, Post};
use serde::Serialize;

use crate::error::SyncError;

/// Column order of the post export; mirrors the serialized field order of [`Post`].
pub const POST_COLUMNS: [&str; 8] = [
    "source_id",
    "id",
    "created_time",
    "updated_time",
    "likes",
    "comments",
    "shares",
    "message",
];

/// Column order of the comment export; mirrors the serialized field order of [`Comment`].
pub const COMMENT_COLUMNS: [&str; 6] = [
    "post_id",
    "id",
    "created_time",
    "from_id",
    "likes",
    "message",
];

/// Writes one row per post. An empty store still produces the header row.
///
/// # Errors
///
/// Returns [`SyncError::Export`] if the file cannot be created or written.
pub fn write_posts_csv<'a>(
    path: &Path,
    posts: impl IntoIterator<Item = &'a Post>,
) -> Result<usize, SyncError> {
    write_csv(path, &POST_COLUMNS, posts)
}

/// Writes one row per comment. An empty store still produces the header row.
///
/// # Errors
///
/// Returns [`SyncError::Export`] if the file cannot be created or written.
pub fn write_comments_csv<'a>(
    path: &Path,
    comments: impl IntoIterator<Item = &'a Comment>,
) -> Result<usize, SyncError> {
    write_csv(path, &COMMENT_COLUMNS, comments)
}

fn write_csv<'a, T>(
    path: &Path,
    header: &[&str],
    rows: impl IntoIterator<Item = &'a T>,
) -> Result<usize, SyncError>
where
    T: Serialize + 'a,
{
    let export_err = |e: csv::Error| SyncError::Export {
        path: path.to_path_buf(),
        source: e,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(export_err)?;
    writer.write_record(header).map_err(export_err)?;

    let mut count = 0usize;
    for row in rows {
        writer.serialize(row).map_err(export_err)?;
        count += 1;
    }
    writer
        .flush()
        .map_err(|e| export_err(csv::Error::from(e)))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn post() -> Post {
        Post {
            source_id: "nytimes".to_string(),
            id: "1_2".to_string(),
            created_time: Utc.with_ymd_and_hms(2016, 3, 1, 8, 0, 0).unwrap(),
            updated_time: Utc.with_ymd_and_hms(2016, 3, 1, 9, 0, 0).unwrap(),
            likes: Some(10),
            comment_count: None,
            shares: 3,
            message: Some("Hello, \"world\"".to_string()),
        }
    }

    fn comment() -> Comment {
        Comment {
            post_id: "1_2".to_string(),
            id: "2_3".to_string(),
            created_time: Utc.with_ymd_and_hms(2016, 3, 1, 8, 30, 0).unwrap(),
            from_id: None,
            likes: Some(0),
            message: Some("multi\nline".to_string()),
        }
    }

    /// The fixed column lists must match what serde would emit as a header.
    fn serde_header<T: Serialize>(value: &T) -> Vec<String> {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(value).unwrap();
        let bytes = writer.into_inner().unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        reader
            .headers()
            .unwrap()
            .iter()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn post_columns_match_serialized_fields() {
        assert_eq!(serde_header(&post()), POST_COLUMNS);
    }

    #[test]
    fn comment_columns_match_serialized_fields() {
        assert_eq!(serde_header(&comment()), COMMENT_COLUMNS);
    }

    #[test]
    fn writes_rows_with_quoting_and_empty_optionals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.csv");
        let p = post();
        let written = write_posts_csv(&path, [&p]).unwrap();
        assert_eq!(written, 1);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "nytimes");
        assert_eq!(&rows[0][2], "2016-03-01T08:00:00Z");
        assert_eq!(&rows[0][5], "", "absent comment count exports as empty");
        assert_eq!(&rows[0][7], "Hello, \"world\"");
    }

    #[test]
    fn comment_rows_round_trip_multiline_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comments.csv");
        let c = comment();
        write_comments_csv(&path, [&c]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[5], "multi\nline");
        assert_eq!(&row[3], "");
    }

    #[test]
    fn empty_store_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comments.csv");
        let written = write_comments_csv(&path, std::iter::empty()).unwrap();
        assert_eq!(written, 0);
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "post_id,id,created_time,from_id,likes,message\n");
    }

    #[test]
    fn unwritable_path_is_export_error() {
        let err = write_posts_csv(Path::new("/nonexistent/dir/posts.csv"), std::iter::empty())
            .unwrap_err();
        assert!(matches!(err, SyncError::Export { .. }), "got: {err:?}");
    }
}
