use std::sync::Arc;

use log::{debug, info};
use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::model::{FittedPipeline, Pipeline, PipelineParams};
use super::{FittedStage, Stage};
use crate::text::Tokenizer;

pub const DEFAULT_FOLDS: usize = 5;

/// Cartesian product of vectorizer and forest settings.
///
/// Candidates are enumerated with `n_estimators` as the outer loop and
/// `max_features` as the inner loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub max_features: Vec<Option<usize>>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![5, 10, 20],
            max_features: vec![None, Some(5000)],
        }
    }
}

impl ParamGrid {
    pub fn candidates(&self) -> Vec<PipelineParams> {
        self.n_estimators
            .iter()
            .flat_map(|&n_estimators| {
                self.max_features.iter().map(move |&max_features| PipelineParams {
                    max_features,
                    n_estimators,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.n_estimators.len() * self.max_features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Contiguous k-fold splitter without shuffling.
///
/// The first `n % k` folds hold one extra sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    n_splits: usize,
}

impl KFold {
    pub fn new(n_splits: usize) -> Result<Self, PipelineError> {
        if n_splits < 2 {
            return Err(PipelineError::InvalidParameter(format!(
                "k-fold needs at least 2 splits, got {}",
                n_splits
            )));
        }
        Ok(Self { n_splits })
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Train and test indices of each fold
    pub fn split(&self, n_samples: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>, PipelineError> {
        if n_samples < self.n_splits {
            return Err(PipelineError::InvalidParameter(format!(
                "cannot split {} samples into {} folds",
                n_samples, self.n_splits
            )));
        }
        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;
        let mut start = 0;
        let mut folds = Vec::with_capacity(self.n_splits);
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < extra);
            let end = start + size;
            let test: Vec<usize> = (start..end).collect();
            let train: Vec<usize> = (0..start).chain(end..n_samples).collect();
            folds.push((train, test));
            start = end;
        }
        Ok(folds)
    }
}

/// Fraction of rows whose labels all match
pub fn subset_accuracy(truth: ArrayView2<'_, u8>, predicted: ArrayView2<'_, u8>) -> Result<f64, PipelineError> {
    if truth.dim() != predicted.dim() {
        return Err(PipelineError::ShapeMismatch(format!(
            "targets {:?} vs predictions {:?}",
            truth.dim(),
            predicted.dim()
        )));
    }
    if truth.nrows() == 0 {
        return Ok(0.0);
    }
    let matching = truth
        .outer_iter()
        .zip(predicted.outer_iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(matching as f64 / truth.nrows() as f64)
}

/// Cross-validation outcome of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub params: PipelineParams,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

impl CandidateResult {
    fn new(params: PipelineParams, fold_scores: Vec<f64>) -> Self {
        let n = fold_scores.len() as f64;
        let mean_score = fold_scores.iter().sum::<f64>() / n;
        let variance = fold_scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n;
        Self {
            params,
            fold_scores,
            mean_score,
            std_score: variance.sqrt(),
        }
    }
}

/// Exhaustive search over a [`ParamGrid`] scored by k-fold cross-validation
#[derive(Debug, Clone)]
pub struct GridSearch {
    tokenizer: Arc<Tokenizer>,
    grid: ParamGrid,
    folds: usize,
    seed: Option<u64>,
}

/// The search outcome with the best pipeline refit on all training data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedGridSearch {
    cv_results: Vec<CandidateResult>,
    best_index: usize,
    best_pipeline: FittedPipeline,
}

impl GridSearch {
    pub fn new(tokenizer: Arc<Tokenizer>, grid: ParamGrid) -> Self {
        Self {
            tokenizer,
            grid,
            folds: DEFAULT_FOLDS,
            seed: None,
        }
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn grid(&self) -> &ParamGrid {
        &self.grid
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    fn pipeline(&self, params: PipelineParams) -> Pipeline {
        Pipeline::new(Arc::clone(&self.tokenizer), params, self.seed)
    }

    fn score_fold(
        &self,
        params: PipelineParams,
        docs: &[String],
        targets: ArrayView2<'_, u8>,
        train: &[usize],
        test: &[usize],
    ) -> Result<f64, PipelineError> {
        let train_docs: Vec<String> = train.iter().map(|&i| docs[i].clone()).collect();
        let test_docs: Vec<String> = test.iter().map(|&i| docs[i].clone()).collect();
        let train_targets = targets.select(Axis(0), train);
        let test_targets = targets.select(Axis(0), test);

        let fitted = self.pipeline(params).fit(&train_docs, train_targets.view())?;
        let predicted = fitted.apply(&test_docs)?;
        subset_accuracy(test_targets.view(), predicted.view())
    }

    /// Scores every candidate on `pool`, then refits the best one.
    pub fn fit(
        &self,
        docs: &[String],
        targets: ArrayView2<'_, u8>,
        pool: &ThreadPool,
    ) -> Result<FittedGridSearch, PipelineError> {
        if docs.len() != targets.nrows() {
            return Err(PipelineError::ShapeMismatch(format!(
                "{} documents for {} target rows",
                docs.len(),
                targets.nrows()
            )));
        }
        if docs.len() < 2 {
            return Err(PipelineError::EmptyTrainingSet(format!(
                "cross-validation needs at least 2 samples, got {}",
                docs.len()
            )));
        }
        if self.grid.is_empty() {
            return Err(PipelineError::InvalidParameter("parameter grid is empty".into()));
        }

        let kfold = KFold::new(self.folds.min(docs.len()))?;
        let splits = kfold.split(docs.len())?;
        let candidates = self.grid.candidates();
        info!(
            "Fitting {} folds for each of {} candidates, totalling {} fits",
            splits.len(),
            candidates.len(),
            splits.len() * candidates.len()
        );

        let tasks: Vec<(usize, usize)> = (0..candidates.len())
            .flat_map(|c| (0..splits.len()).map(move |f| (c, f)))
            .collect();

        let scores: Vec<f64> = pool.install(|| {
            tasks
                .par_iter()
                .map(|&(c, f)| {
                    let (train, test) = &splits[f];
                    let score = self.score_fold(candidates[c], docs, targets, train, test)?;
                    info!(
                        "[CV {}/{}] {}; score={:.3}",
                        f + 1,
                        splits.len(),
                        candidates[c],
                        score
                    );
                    Ok(score)
                })
                .collect::<Result<Vec<f64>, PipelineError>>()
        })?;

        let cv_results: Vec<CandidateResult> = candidates
            .iter()
            .zip(scores.chunks(splits.len()))
            .map(|(&params, fold_scores)| CandidateResult::new(params, fold_scores.to_vec()))
            .collect();

        let mut best_index = 0;
        for (i, result) in cv_results.iter().enumerate() {
            debug!(
                "{}: mean={:.4} std={:.4}",
                result.params, result.mean_score, result.std_score
            );
            if result.mean_score > cv_results[best_index].mean_score {
                best_index = i;
            }
        }
        let best = &cv_results[best_index];
        info!("Best parameters: {} (score {:.3})", best.params, best.mean_score);

        let best_pipeline = pool.install(|| self.pipeline(best.params).fit(docs, targets))?;

        Ok(FittedGridSearch {
            cv_results,
            best_index,
            best_pipeline,
        })
    }
}

impl FittedGridSearch {
    pub fn cv_results(&self) -> &[CandidateResult] {
        &self.cv_results
    }

    pub fn best_index(&self) -> usize {
        self.best_index
    }

    pub fn best_params(&self) -> PipelineParams {
        self.cv_results[self.best_index].params
    }

    pub fn best_score(&self) -> f64 {
        self.cv_results[self.best_index].mean_score
    }

    pub fn best_pipeline(&self) -> &FittedPipeline {
        &self.best_pipeline
    }

    /// Predicts with the refit best pipeline
    pub fn predict(&self, docs: &[String]) -> Result<Array2<u8>, PipelineError> {
        self.best_pipeline.predict(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{Lexicon, StopwordList, WordNetLemmatizer};
    use ndarray::array;
    use rayon::ThreadPoolBuilder;

    fn tokenizer() -> Arc<Tokenizer> {
        Arc::new(Tokenizer::new(Lexicon::new(
            StopwordList::parse("and\nthe\n"),
            WordNetLemmatizer::default(),
        )))
    }

    fn pool() -> ThreadPool {
        ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    #[test]
    fn test_default_grid_order() {
        let candidates = ParamGrid::default().candidates();
        assert_eq!(candidates.len(), 6);
        assert_eq!(
            candidates[0],
            PipelineParams {
                max_features: None,
                n_estimators: 5
            }
        );
        assert_eq!(
            candidates[1],
            PipelineParams {
                max_features: Some(5000),
                n_estimators: 5
            }
        );
        assert_eq!(candidates[5].n_estimators, 20);
    }

    #[test]
    fn test_kfold_contiguous() {
        let folds = KFold::new(3).unwrap().split(7).unwrap();
        assert_eq!(folds[0].1, vec![0, 1, 2]);
        assert_eq!(folds[1].1, vec![3, 4]);
        assert_eq!(folds[2].1, vec![5, 6]);
        assert_eq!(folds[1].0, vec![0, 1, 2, 5, 6]);
        assert!(KFold::new(1).is_err());
        assert!(KFold::new(3).unwrap().split(2).is_err());
    }

    #[test]
    fn test_subset_accuracy() {
        let truth = array![[1u8, 0], [0, 1], [1, 1]];
        let pred = array![[1u8, 0], [0, 0], [1, 1]];
        let score = subset_accuracy(truth.view(), pred.view()).unwrap();
        assert!((score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_search_picks_and_refits() {
        let docs: Vec<String> = [
            "flood water rising",
            "need food and water",
            "the river flood",
            "earthquake damage",
            "need shelter",
            "ok thanks",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let y = array![[1u8, 0], [1, 1], [1, 0], [0, 0], [0, 1], [0, 0]];
        let grid = ParamGrid {
            n_estimators: vec![3, 5],
            max_features: vec![None, Some(2)],
        };
        let search = GridSearch::new(tokenizer(), grid).with_folds(3).with_seed(Some(1));
        let fitted = search.fit(&docs, y.view(), &pool()).unwrap();

        assert_eq!(fitted.cv_results().len(), 4);
        assert!(fitted.cv_results().iter().all(|r| r.fold_scores.len() == 3));
        let best = fitted.best_score();
        assert!(fitted.cv_results().iter().all(|r| r.mean_score <= best));
        // Ties keep the earliest candidate
        let first_best = fitted.cv_results().iter().position(|r| r.mean_score == best).unwrap();
        assert_eq!(fitted.best_index(), first_best);

        let pred = fitted.predict(&docs).unwrap();
        assert_eq!(pred.dim(), (6, 2));
    }

    #[test]
    fn test_folds_capped_by_samples() {
        let docs: Vec<String> = ["flood water", "food need", "ok thanks"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let y = array![[1u8], [0], [0]];
        let grid = ParamGrid {
            n_estimators: vec![2],
            max_features: vec![None],
        };
        let fitted = GridSearch::new(tokenizer(), grid)
            .with_seed(Some(3))
            .fit(&docs, y.view(), &pool())
            .unwrap();
        assert_eq!(fitted.cv_results()[0].fold_scores.len(), 3);
    }

    #[test]
    fn test_too_few_samples() {
        let docs = vec!["flood".to_string()];
        let y = array![[1u8]];
        let result = GridSearch::new(tokenizer(), ParamGrid::default()).fit(&docs, y.view(), &pool());
        assert!(matches!(result, Err(PipelineError::EmptyTrainingSet(_))));
    }
}
