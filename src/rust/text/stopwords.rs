use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TrainError;

/// Set of words dropped from the token stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopwordList {
    words: HashSet<String>,
}

impl StopwordList {
    pub fn new(words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads a one-word-per-line list such as `stopwords/english`
    pub fn from_file(path: &Path) -> Result<Self, TrainError> {
        let text = fs::read_to_string(path)
            .map_err(|e| TrainError::Lexicon(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        Self::new(text.lines().map(str::trim).filter(|w| !w.is_empty()))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
