#![allow(dead_code)]

use std::path::Path;

use disaster_classifier::{Lexicon, StopwordList, WordNetLemmatizer};
use env_logger::{Builder, Env};
use rusqlite::{params_from_iter, Connection};

// Initialize test logger
pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn")).try_init();
}

pub struct Row<'a> {
    pub message: &'a str,
    pub genre: &'a str,
    pub original: Option<&'a str>,
    pub categories: &'a [u8],
}

/// Writes a `messages` table with the given category columns
pub fn create_database(path: &Path, categories: &[&str], rows: &[Row<'_>]) -> rusqlite::Result<()> {
    let conn = Connection::open(path)?;
    let category_columns: String = categories.iter().map(|c| format!(", {} INTEGER", c)).collect();
    conn.execute(
        &format!(
            "CREATE TABLE messages (id INTEGER, message TEXT, original TEXT, genre TEXT{})",
            category_columns
        ),
        [],
    )?;

    let placeholders = vec!["?"; 4 + categories.len()].join(", ");
    let insert = format!("INSERT INTO messages VALUES ({})", placeholders);
    for (i, row) in rows.iter().enumerate() {
        let mut values: Vec<rusqlite::types::Value> = vec![
            (i as i64 + 1).into(),
            row.message.to_string().into(),
            row.original.map(str::to_string).into(),
            row.genre.to_string().into(),
        ];
        values.extend(row.categories.iter().map(|&c| rusqlite::types::Value::from(c as i64)));
        conn.execute(&insert, params_from_iter(values))?;
    }
    Ok(())
}

/// The four-message fixture with `related` and `request` categories
pub fn sample_rows() -> Vec<Row<'static>> {
    vec![
        Row { message: "flood water rising", genre: "direct", original: None, categories: &[1, 0] },
        Row { message: "need food and water", genre: "direct", original: Some("necesitamos comida"), categories: &[1, 1] },
        Row { message: "earthquake damage reported", genre: "news", original: None, categories: &[1, 0] },
        Row { message: "ok thanks", genre: "social", original: None, categories: &[0, 0] },
    ]
}

/// A small in-memory lexicon standing in for the downloaded NLTK data
pub fn lexicon() -> Lexicon {
    let stopwords = StopwordList::parse("i\nme\nwe\nthe\nand\na\nan\nof\nto\nin\nis\nare\nour\n");
    let lemmatizer = WordNetLemmatizer::parse(
        "  1 This software and database is being provided\n\
         flood n 2 1 @ 2 0 07367708\n\
         water n 6 3 @ ~ + 6 5 14845743\n\
         food n 3 2 @ ~ 3 3 07555863\n\
         earthquake n 2 1 @ 2 1 07428954\n\
         damage n 4 2 @ ~ 4 1 07296428\n\
         house n 12 3 @ ~ 12 7 03544360\n\
         child n 4 2 @ ~ 4 3 09917593\n",
        "children child\n",
    );
    Lexicon::new(stopwords, lemmatizer)
}
