use std::sync::Arc;

use log::info;

use super::error::PipelineError;
use super::search::{GridSearch, ParamGrid, DEFAULT_FOLDS};
use crate::text::{Lexicon, Tokenizer};

/// A builder for constructing a [`GridSearch`] with a fluent interface.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    tokenizer: Option<Arc<Tokenizer>>,
    grid: ParamGrid,
    folds: usize,
    seed: Option<u64>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Creates a builder with the default parameter grid and 5 folds
    ///
    /// # Example
    /// ```
    /// use disaster_classifier::PipelineBuilder;
    ///
    /// let builder = PipelineBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            tokenizer: None,
            grid: ParamGrid::default(),
            folds: DEFAULT_FOLDS,
            seed: None,
        }
    }

    /// Sets the tokenizer shared by every candidate pipeline
    pub fn with_tokenizer(mut self, tokenizer: Arc<Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Builds the tokenizer from a loaded lexicon
    ///
    /// # Example
    /// ```
    /// use disaster_classifier::{Lexicon, PipelineBuilder, StopwordList, WordNetLemmatizer};
    ///
    /// let lexicon = Lexicon::new(StopwordList::parse("the\n"), WordNetLemmatizer::default());
    /// let search = PipelineBuilder::new().with_lexicon(lexicon).build();
    /// assert!(search.is_ok());
    /// ```
    pub fn with_lexicon(self, lexicon: Lexicon) -> Self {
        self.with_tokenizer(Arc::new(Tokenizer::new(lexicon)))
    }

    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Sets the number of cross-validation folds.
    /// The search lowers it to the number of samples when there are fewer.
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    /// Fixes the seed of every forest fitted by the search
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the grid settings:
    /// - at least one value per parameter
    /// - every `n_estimators` positive
    /// - every `max_features` limit positive
    /// - at least 2 folds
    fn validate(&self) -> Result<(), PipelineError> {
        if self.grid.is_empty() {
            return Err(PipelineError::BuildError("Parameter grid has no candidates".into()));
        }
        if self.grid.n_estimators.contains(&0) {
            return Err(PipelineError::BuildError("n_estimators values must be positive".into()));
        }
        if self.grid.max_features.contains(&Some(0)) {
            return Err(PipelineError::BuildError("max_features limits must be positive".into()));
        }
        if self.folds < 2 {
            return Err(PipelineError::BuildError(format!(
                "At least 2 folds are required, got {}",
                self.folds
            )));
        }
        Ok(())
    }

    /// Builds the unfitted search
    ///
    /// # Returns
    /// * `Result<GridSearch, PipelineError>` - The search, or an error if:
    ///   - No tokenizer or lexicon was set
    ///   - The grid or fold count is invalid
    pub fn build(self) -> Result<GridSearch, PipelineError> {
        self.validate()?;
        let tokenizer = self
            .tokenizer
            .ok_or_else(|| PipelineError::BuildError("A tokenizer must be set".into()))?;
        info!(
            "Grid search built: {} candidates, {} folds",
            self.grid.len(),
            self.folds
        );
        Ok(GridSearch::new(tokenizer, self.grid)
            .with_folds(self.folds)
            .with_seed(self.seed))
    }
}

/// The default search: count vectorizer, TF-IDF and multi-output forest over
/// `max_features` in {None, 5000} and `n_estimators` in {5, 10, 20}
pub fn build_model(tokenizer: Arc<Tokenizer>, folds: usize, seed: Option<u64>) -> Result<GridSearch, PipelineError> {
    PipelineBuilder::new()
        .with_tokenizer(tokenizer)
        .with_folds(folds)
        .with_seed(seed)
        .build()
}
