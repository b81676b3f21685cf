use ndarray::ArrayView2;

mod error;
mod sparse;
mod vectorizer;
mod tfidf;
pub mod forest;
mod multi_output;
mod model;
pub mod search;
pub mod builder;

pub use error::PipelineError;
pub use sparse::{ColumnIndex, SparseMatrix};
pub use vectorizer::{CountVectorizer, FittedCountVectorizer};
pub use tfidf::{FittedTfidf, TfidfTransformer};
pub use forest::{DecisionTree, FittedForest, ForestParams, RandomForest};
pub use multi_output::{FittedMultiOutputForest, MultiOutputForest};
pub use model::{FittedPipeline, Pipeline, PipelineParams};
pub use search::{subset_accuracy, CandidateResult, FittedGridSearch, GridSearch, KFold, ParamGrid};
pub use builder::{build_model, PipelineBuilder};

/// A pipeline stage that learns from training data
pub trait Stage<I: ?Sized> {
    type Fitted: FittedStage<I>;

    /// Fits the stage; `targets` has one row per input sample
    fn fit(&self, input: &I, targets: ArrayView2<'_, u8>) -> Result<Self::Fitted, PipelineError>;
}

/// A fitted stage that transforms or predicts
pub trait FittedStage<I: ?Sized> {
    type Output;

    fn apply(&self, input: &I) -> Result<Self::Output, PipelineError>;
}

/// Summary of a fitted search
#[derive(Debug, Clone)]
pub struct PipelineInfo {
    /// Parameters of the refit pipeline
    pub best_params: PipelineParams,
    /// Mean cross-validated subset accuracy of the best candidate
    pub best_score: f64,
    /// Number of candidates scored
    pub num_candidates: usize,
    /// Size of the learned vocabulary
    pub vocabulary_size: usize,
    /// Number of category outputs
    pub num_outputs: usize,
}

impl FittedGridSearch {
    pub fn info(&self) -> PipelineInfo {
        let best = self.best_pipeline();
        PipelineInfo {
            best_params: self.best_params(),
            best_score: self.best_score(),
            num_candidates: self.cv_results().len(),
            vocabulary_size: best.vectorizer().vocabulary_size(),
            num_outputs: best.classifier().n_outputs(),
        }
    }
}
