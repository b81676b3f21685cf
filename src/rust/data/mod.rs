/// Reads the messages table from SQLite
pub mod loader;

/// Shuffled train/test split
pub mod split;

pub use loader::{load_data, load_messages, Dataset, MessageRecord};
pub use split::{train_test_split, TrainTestSplit};
