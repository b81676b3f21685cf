use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::lemmatizer::WordNetLemmatizer;
use super::stopwords::StopwordList;
use super::word_tokenize::word_tokenize;
use crate::error::TrainError;
use crate::resource_manager::{ResourceError, ResourceManager};
use crate::resources::LanguageResource;

lazy_static! {
    static ref STRIPPED_PUNCTUATION: Regex = Regex::new(r"[,.;@#?!&$]+\s*").unwrap();
}

/// Language data the tokenizer needs: stopwords and the noun lemma index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lexicon {
    pub stopwords: StopwordList,
    pub lemmatizer: WordNetLemmatizer,
}

impl Lexicon {
    pub fn new(stopwords: StopwordList, lemmatizer: WordNetLemmatizer) -> Self {
        Self { stopwords, lemmatizer }
    }

    /// Loads the lexicon from resources previously fetched by the manager
    pub fn load(manager: &ResourceManager) -> Result<Self, TrainError> {
        for resource in LanguageResource::REQUIRED {
            if !manager.is_resource_downloaded(resource) {
                return Err(ResourceError::NotDownloaded(format!(
                    "{:?} in {}",
                    resource,
                    manager.resources_dir().display()
                ))
                .into());
            }
        }
        let lexicon = Self::from_dirs(
            &manager.get_resource_dir(LanguageResource::Stopwords).join("english"),
            &manager.get_resource_dir(LanguageResource::WordNet),
        )?;
        log::info!(
            "Lexicon loaded: {} stopwords, {} noun lemmas",
            lexicon.stopwords.len(),
            lexicon.lemmatizer.len()
        );
        Ok(lexicon)
    }

    /// Reads a stopword list file and a WordNet directory holding `index.noun` and `noun.exc`
    pub fn from_dirs(stopwords_file: &Path, wordnet_dir: &Path) -> Result<Self, TrainError> {
        Ok(Self::new(
            StopwordList::from_file(stopwords_file)?,
            WordNetLemmatizer::from_dir(wordnet_dir)?,
        ))
    }
}

/// Turns a message into cleaned word tokens.
///
/// Steps, in order: punctuation runs `, . ; @ # ? ! & $` (and the whitespace
/// after them) become one space; the text is split into words; each word is
/// lemmatized as a noun, lowercased and trimmed; stopwords and empty tokens
/// are dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tokenizer {
    lexicon: Lexicon,
}

impl Tokenizer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let text = STRIPPED_PUNCTUATION.replace_all(text, " ");

        word_tokenize(&text)
            .into_iter()
            .map(|tok| self.lexicon.lemmatizer.lemmatize(&tok).to_lowercase().trim().to_string())
            .filter(|tok| !tok.is_empty() && !self.lexicon.stopwords.contains(tok))
            .collect()
    }
}
