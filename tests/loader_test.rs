mod common;

use common::Row;
use disaster_classifier::{load_data, load_messages, train_test_split, TrainError};
use tempfile::tempdir;

#[test]
fn test_load_preserves_rows_and_category_order() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("messages.db");
    let categories = ["related", "request", "offer", "aid_related"];
    let rows = vec![
        Row { message: "we need tents", genre: "direct", original: None, categories: &[1, 1, 0, 1] },
        Row { message: "all is fine", genre: "social", original: None, categories: &[0, 0, 0, 0] },
        Row { message: "offering water", genre: "news", original: Some("ofrecemos agua"), categories: &[1, 0, 1, 1] },
    ];
    common::create_database(&path, &categories, &rows)?;

    let dataset = load_data(&path)?;
    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.messages[2], "offering water");
    assert_eq!(dataset.targets.dim(), (3, 4));
    assert_eq!(dataset.targets.row(0).to_vec(), vec![1, 1, 0, 1]);
    assert_eq!(dataset.category_names, categories);

    let (records, names) = load_messages(&path)?;
    assert_eq!(names, categories);
    assert_eq!(records[2].original.as_deref(), Some("ofrecemos agua"));
    assert_eq!(records[1].genre, "social");
    Ok(())
}

#[test]
fn test_split_keeps_alignment() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("messages.db");
    common::create_database(&path, &["related", "request"], &common::sample_rows())?;

    let dataset = load_data(&path)?;
    let split = train_test_split(&dataset.messages, &dataset.targets, 0.2, Some(7))?;
    assert_eq!(split.x_test.len(), 1);
    assert_eq!(split.x_train.len(), 3);
    assert_eq!(split.y_train.ncols(), split.y_test.ncols());

    for (i, message) in split.x_train.iter().chain(&split.x_test).enumerate() {
        let original = dataset.messages.iter().position(|m| m == message).unwrap();
        let row = if i < 3 { split.y_train.row(i) } else { split.y_test.row(i - 3) };
        assert_eq!(row, dataset.targets.row(original));
    }
    Ok(())
}

#[test]
fn test_schema_errors() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("messages.db");
    let rows = vec![Row { message: "hello", genre: "direct", original: None, categories: &[2] }];
    common::create_database(&path, &["related"], &rows)?;

    let result = load_data(&path);
    assert!(matches!(result, Err(TrainError::Schema(msg)) if msg.contains("related")));
    Ok(())
}
