use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::forest::ForestParams;
use super::multi_output::{FittedMultiOutputForest, MultiOutputForest};
use super::tfidf::{FittedTfidf, TfidfTransformer};
use super::vectorizer::{CountVectorizer, FittedCountVectorizer};
use super::{FittedStage, Stage};
use crate::text::Tokenizer;

/// Hyperparameters that the grid search varies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Vocabulary size limit of the vectorizer; `None` keeps every term
    pub max_features: Option<usize>,
    /// Number of trees in each per-category forest
    pub n_estimators: usize,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            max_features: None,
            n_estimators: 100,
        }
    }
}

impl std::fmt::Display for PipelineParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max_features {
            Some(limit) => write!(f, "max_features={}, n_estimators={}", limit, self.n_estimators),
            None => write!(f, "max_features=None, n_estimators={}", self.n_estimators),
        }
    }
}

/// Count vectorizer, TF-IDF and multi-output forest applied in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    vect: CountVectorizer,
    tfidf: TfidfTransformer,
    clf: MultiOutputForest,
}

/// A pipeline whose three stages have been fitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    vect: FittedCountVectorizer,
    tfidf: FittedTfidf,
    clf: FittedMultiOutputForest,
}

impl Pipeline {
    pub fn new(tokenizer: Arc<Tokenizer>, params: PipelineParams, seed: Option<u64>) -> Self {
        Self {
            vect: CountVectorizer::new(tokenizer).with_max_features(params.max_features),
            tfidf: TfidfTransformer::new(),
            clf: MultiOutputForest::new(ForestParams {
                n_estimators: params.n_estimators,
                ..ForestParams::default()
            })
            .with_seed(seed),
        }
    }

    pub fn params(&self) -> PipelineParams {
        PipelineParams {
            max_features: self.vect.max_features(),
            n_estimators: self.clf.params().n_estimators,
        }
    }
}

impl Stage<[String]> for Pipeline {
    type Fitted = FittedPipeline;

    fn fit(&self, docs: &[String], targets: ArrayView2<'_, u8>) -> Result<FittedPipeline, PipelineError> {
        if docs.len() != targets.nrows() {
            return Err(PipelineError::ShapeMismatch(format!(
                "{} documents for {} target rows",
                docs.len(),
                targets.nrows()
            )));
        }
        let vect = self.vect.fit(docs, targets)?;
        let counts = vect.apply(docs)?;
        let tfidf = self.tfidf.fit(&counts, targets)?;
        let features = tfidf.apply(&counts)?;
        let clf = self.clf.fit(&features, targets)?;
        log::debug!(
            "Pipeline fitted: {} documents, {} terms, {} outputs",
            docs.len(),
            vect.vocabulary_size(),
            clf.n_outputs()
        );
        Ok(FittedPipeline { vect, tfidf, clf })
    }
}

impl FittedStage<[String]> for FittedPipeline {
    type Output = Array2<u8>;

    fn apply(&self, docs: &[String]) -> Result<Array2<u8>, PipelineError> {
        let counts = self.vect.apply(docs)?;
        let features = self.tfidf.apply(&counts)?;
        self.clf.apply(&features)
    }
}

impl FittedPipeline {
    pub fn predict(&self, docs: &[String]) -> Result<Array2<u8>, PipelineError> {
        self.apply(docs)
    }

    pub fn vectorizer(&self) -> &FittedCountVectorizer {
        &self.vect
    }

    pub fn tfidf(&self) -> &FittedTfidf {
        &self.tfidf
    }

    pub fn classifier(&self) -> &FittedMultiOutputForest {
        &self.clf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{Lexicon, StopwordList, WordNetLemmatizer};
    use ndarray::array;

    fn pipeline(params: PipelineParams) -> Pipeline {
        let lexicon = Lexicon::new(StopwordList::parse("and\n"), WordNetLemmatizer::default());
        Pipeline::new(Arc::new(Tokenizer::new(lexicon)), params, Some(7))
    }

    fn docs() -> Vec<String> {
        ["flood water rising", "need food and water", "earthquake damage", "ok thanks"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_fit_and_predict() {
        let y = array![[1u8, 0], [1, 1], [0, 0], [0, 0]];
        let params = PipelineParams {
            max_features: None,
            n_estimators: 5,
        };
        let fitted = pipeline(params).fit(&docs(), y.view()).unwrap();
        let pred = fitted.predict(&docs()).unwrap();
        assert_eq!(pred.dim(), (4, 2));
        assert!(pred.iter().all(|&v| v <= 1));
        assert_eq!(fitted.vectorizer().vocabulary_size(), fitted.tfidf().idf().len());
    }

    #[test]
    fn test_params_round_trip() {
        let params = PipelineParams {
            max_features: Some(5000),
            n_estimators: 10,
        };
        assert_eq!(pipeline(params).params(), params);
        assert_eq!(params.to_string(), "max_features=5000, n_estimators=10");
    }

    #[test]
    fn test_mismatched_targets() {
        let y = array![[1u8], [0]];
        assert!(pipeline(PipelineParams::default()).fit(&docs(), y.view()).is_err());
    }
}
