use std::collections::BTreeMap;
use std::sync::Arc;

use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::sparse::SparseMatrix;
use super::{FittedStage, Stage};
use crate::text::Tokenizer;

/// Converts documents into token-count vectors.
///
/// Documents are lowercased, then split by the [`Tokenizer`]. The vocabulary
/// is learned from the training corpus and sorted by term. With
/// `max_features` only the most frequent terms across the corpus are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountVectorizer {
    tokenizer: Arc<Tokenizer>,
    max_features: Option<usize>,
}

/// A vectorizer with a learned vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedCountVectorizer {
    tokenizer: Arc<Tokenizer>,
    vocabulary: BTreeMap<String, usize>,
}

impl CountVectorizer {
    pub fn new(tokenizer: Arc<Tokenizer>) -> Self {
        Self {
            tokenizer,
            max_features: None,
        }
    }

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }
}

fn analyze(tokenizer: &Tokenizer, doc: &str) -> Vec<String> {
    tokenizer.tokenize(&doc.to_lowercase())
}

impl Stage<[String]> for CountVectorizer {
    type Fitted = FittedCountVectorizer;

    fn fit(&self, docs: &[String], _targets: ArrayView2<'_, u8>) -> Result<Self::Fitted, PipelineError> {
        if docs.is_empty() {
            return Err(PipelineError::EmptyTrainingSet("vectorizer received no documents".into()));
        }
        if self.max_features == Some(0) {
            return Err(PipelineError::InvalidParameter("max_features must be positive".into()));
        }

        let analyzed: Vec<Vec<String>> = docs
            .par_iter()
            .map(|doc| analyze(&self.tokenizer, doc))
            .collect();

        let mut term_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &analyzed {
            for token in tokens {
                *term_counts.entry(token.as_str()).or_insert(0) += 1;
            }
        }
        if term_counts.is_empty() {
            return Err(PipelineError::EmptyVocabulary);
        }

        let mut terms: Vec<(&str, usize)> = term_counts.into_iter().collect();
        if let Some(limit) = self.max_features {
            if limit < terms.len() {
                // Stable sort keeps term order among equal counts
                terms.sort_by(|a, b| b.1.cmp(&a.1));
                terms.truncate(limit);
                terms.sort_by(|a, b| a.0.cmp(b.0));
            }
        }

        let vocabulary: BTreeMap<String, usize> = terms
            .into_iter()
            .enumerate()
            .map(|(idx, (term, _))| (term.to_string(), idx))
            .collect();
        log::debug!("Vocabulary learned: {} terms", vocabulary.len());

        Ok(FittedCountVectorizer {
            tokenizer: Arc::clone(&self.tokenizer),
            vocabulary,
        })
    }
}

impl FittedCountVectorizer {
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Terms in column order
    pub fn feature_names(&self) -> Vec<&str> {
        let mut names = vec![""; self.vocabulary.len()];
        for (term, &idx) in &self.vocabulary {
            names[idx] = term.as_str();
        }
        names
    }
}

impl FittedStage<[String]> for FittedCountVectorizer {
    type Output = SparseMatrix;

    fn apply(&self, docs: &[String]) -> Result<SparseMatrix, PipelineError> {
        let rows: Vec<Vec<(usize, f64)>> = docs
            .par_iter()
            .map(|doc| {
                let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
                for token in analyze(&self.tokenizer, doc) {
                    if let Some(&idx) = self.vocabulary.get(&token) {
                        *counts.entry(idx).or_insert(0.0) += 1.0;
                    }
                }
                counts.into_iter().collect()
            })
            .collect();

        let mut matrix = SparseMatrix::new(self.vocabulary.len());
        for row in rows {
            matrix.push_row(row)?;
        }
        Ok(matrix)
    }
}
