use std::path::Path;

use ndarray::Array2;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use crate::error::{Result, TrainError};

/// Table holding the labeled messages
pub const MESSAGES_TABLE: &str = "messages";

/// Columns that are not categories
pub const NON_CATEGORY_COLUMNS: [&str; 4] = ["id", "message", "genre", "original"];

/// One row of the messages table
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub id: i64,
    pub message: String,
    pub genre: String,
    pub original: Option<String>,
    /// One 0/1 flag per category, in category-name order
    pub categories: Vec<u8>,
}

/// Features, targets and category names, row aligned
#[derive(Debug, Clone)]
pub struct Dataset {
    pub messages: Vec<String>,
    pub targets: Array2<u8>,
    pub category_names: Vec<String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Reads every record of the messages table together with the category names
/// in table order.
pub fn load_messages(database_path: &Path) -> Result<(Vec<MessageRecord>, Vec<String>)> {
    log::info!("Opening database {}", database_path.display());
    let conn = Connection::open_with_flags(
        database_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", MESSAGES_TABLE))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();

    let position = |name: &str| -> Result<usize> {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TrainError::Schema(format!("table '{}' has no column '{}'", MESSAGES_TABLE, name)))
    };
    let id_col = position("id")?;
    let message_col = position("message")?;
    let genre_col = position("genre")?;
    let original_col = position("original")?;

    let category_cols: Vec<(usize, String)> = columns
        .iter()
        .enumerate()
        .filter(|(_, name)| !NON_CATEGORY_COLUMNS.contains(&name.as_str()))
        .map(|(i, name)| (i, name.clone()))
        .collect();
    log::debug!("Found {} category columns", category_cols.len());

    let mut records = Vec::new();
    let mut rows = stmt.query([])?;
    let mut row_number = 0usize;
    while let Some(row) = rows.next()? {
        row_number += 1;
        let id = match row.get_ref(id_col)? {
            ValueRef::Integer(v) => v,
            other => return Err(cell_error(row_number, "id", "an integer", other)),
        };
        let message = text_cell(row.get_ref(message_col)?, row_number, "message")?;
        let genre = text_cell(row.get_ref(genre_col)?, row_number, "genre")?;
        let original = match row.get_ref(original_col)? {
            ValueRef::Null => None,
            other => Some(text_cell(other, row_number, "original")?),
        };

        let mut categories = Vec::with_capacity(category_cols.len());
        for (col, name) in &category_cols {
            categories.push(flag_cell(row.get_ref(*col)?, row_number, name)?);
        }

        records.push(MessageRecord {
            id,
            message,
            genre,
            original,
            categories,
        });
    }

    let category_names = category_cols.into_iter().map(|(_, name)| name).collect();
    Ok((records, category_names))
}

/// Loads the messages table as features (message text), a binary target
/// matrix and the category names.
pub fn load_data(database_path: &Path) -> Result<Dataset> {
    let (records, category_names) = load_messages(database_path)?;
    let n_categories: usize = category_names.len();

    let mut flat = Vec::with_capacity(records.len() * n_categories);
    let mut messages = Vec::with_capacity(records.len());
    for record in records {
        flat.extend_from_slice(&record.categories);
        messages.push(record.message);
    }
    let targets = Array2::from_shape_vec((messages.len(), n_categories), flat)
        .map_err(|e| TrainError::Schema(format!("inconsistent category columns: {}", e)))?;

    log::info!(
        "Loaded {} messages with {} categories",
        messages.len(),
        n_categories
    );
    Ok(Dataset {
        messages,
        targets,
        category_names,
    })
}

fn text_cell(value: ValueRef<'_>, row: usize, column: &str) -> Result<String> {
    match value {
        ValueRef::Text(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        other => Err(cell_error(row, column, "text", other)),
    }
}

fn flag_cell(value: ValueRef<'_>, row: usize, column: &str) -> Result<u8> {
    match value {
        ValueRef::Integer(0) => Ok(0),
        ValueRef::Integer(1) => Ok(1),
        ValueRef::Real(v) if v == 0.0 => Ok(0),
        ValueRef::Real(v) if v == 1.0 => Ok(1),
        other => Err(cell_error(row, column, "0 or 1", other)),
    }
}

fn cell_error(row: usize, column: &str, expected: &str, found: ValueRef<'_>) -> TrainError {
    TrainError::Schema(format!(
        "row {} column '{}': expected {}, found {:?}",
        row,
        column,
        expected,
        found.data_type()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_db(dir: &Path, rows: &[(i64, &str, Option<&str>, i64, i64)]) -> std::path::PathBuf {
        let path = dir.join("messages.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE messages (id INTEGER, message TEXT, original TEXT, genre TEXT, related INTEGER, water INTEGER);",
        )
        .unwrap();
        for (id, message, original, related, water) in rows {
            conn.execute(
                "INSERT INTO messages VALUES (?1, ?2, ?3, 'direct', ?4, ?5)",
                rusqlite::params![id, message, original, related, water],
            )
            .unwrap();
        }
        path
    }

    #[test]
    fn test_load_data_shapes_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_db(
            dir.path(),
            &[(1, "flood water rising", None, 1, 1), (2, "ok thanks", Some("merci"), 0, 0), (3, "need help", None, 1, 0)],
        );

        let data = load_data(&path).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.targets.dim(), (3, 2));
        assert_eq!(data.category_names, vec!["related", "water"]);
        assert_eq!(data.messages[1], "ok thanks");
        assert_eq!(data.targets.row(0).to_vec(), vec![1, 1]);
        assert_eq!(data.targets.row(2).to_vec(), vec![1, 0]);
    }

    #[test]
    fn test_load_messages_keeps_record_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_db(dir.path(), &[(7, "ok thanks", Some("merci"), 0, 1)]);

        let (records, names) = load_messages(&path).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(
            records[0],
            MessageRecord {
                id: 7,
                message: "ok thanks".to_string(),
                genre: "direct".to_string(),
                original: Some("merci".to_string()),
                categories: vec![0, 1],
            }
        );
    }

    #[test]
    fn test_missing_file_is_data_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_data(&dir.path().join("absent.db"));
        assert!(matches!(result, Err(TrainError::DataAccess(_))));
    }

    #[test]
    fn test_missing_table_is_data_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        Connection::open(&path).unwrap().execute_batch("CREATE TABLE other (x INTEGER);").unwrap();

        assert!(matches!(load_data(&path), Err(TrainError::DataAccess(_))));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE messages (id INTEGER, message TEXT, genre TEXT, water INTEGER);")
            .unwrap();

        match load_data(&path) {
            Err(TrainError::Schema(msg)) => assert!(msg.contains("original")),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_binary_flag_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_db(dir.path(), &[(1, "flood", None, 2, 0)]);

        match load_data(&path) {
            Err(TrainError::Schema(msg)) => assert!(msg.contains("related")),
            other => panic!("expected schema error, got {:?}", other),
        }
    }
}
