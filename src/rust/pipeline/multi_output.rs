use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::forest::{FittedForest, ForestParams, RandomForest};
use super::sparse::SparseMatrix;
use super::{FittedStage, Stage};

/// Fits one independent random forest per target column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiOutputForest {
    forest: RandomForest,
    seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedMultiOutputForest {
    estimators: Vec<FittedForest>,
    n_features: usize,
}

impl MultiOutputForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            forest: RandomForest::new(params),
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn params(&self) -> &ForestParams {
        self.forest.params()
    }
}

impl Stage<SparseMatrix> for MultiOutputForest {
    type Fitted = FittedMultiOutputForest;

    fn fit(&self, x: &SparseMatrix, targets: ArrayView2<'_, u8>) -> Result<Self::Fitted, PipelineError> {
        if x.n_rows() != targets.nrows() {
            return Err(PipelineError::ShapeMismatch(format!(
                "{} feature rows for {} target rows",
                x.n_rows(),
                targets.nrows()
            )));
        }
        if targets.ncols() == 0 {
            return Err(PipelineError::InvalidParameter("no target columns to fit".into()));
        }

        let columns = x.to_columns();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut estimators = Vec::with_capacity(targets.ncols());
        for target in targets.columns() {
            let labels = target.to_vec();
            estimators.push(self.forest.fit_columns(&columns, &labels, rng.gen())?);
        }

        Ok(FittedMultiOutputForest {
            estimators,
            n_features: x.n_cols(),
        })
    }
}

impl FittedMultiOutputForest {
    pub fn estimators(&self) -> &[FittedForest] {
        &self.estimators
    }

    pub fn n_outputs(&self) -> usize {
        self.estimators.len()
    }
}

impl FittedStage<SparseMatrix> for FittedMultiOutputForest {
    type Output = Array2<u8>;

    fn apply(&self, x: &SparseMatrix) -> Result<Array2<u8>, PipelineError> {
        if x.n_cols() != self.n_features {
            return Err(PipelineError::ShapeMismatch(format!(
                "forest fitted on {} features, got {}",
                self.n_features,
                x.n_cols()
            )));
        }
        let mut out = Array2::zeros((x.n_rows(), self.estimators.len()));
        for (j, forest) in self.estimators.iter().enumerate() {
            for (i, label) in forest.predict(x).into_iter().enumerate() {
                out[[i, j]] = label;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn features() -> SparseMatrix {
        SparseMatrix::from_dense(&[
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![1.0, 1.0, 0.0],
        ])
        .unwrap()
    }

    fn model() -> MultiOutputForest {
        MultiOutputForest::new(ForestParams {
            n_estimators: 8,
            ..ForestParams::default()
        })
        .with_seed(Some(42))
    }

    #[test]
    fn test_one_forest_per_column() {
        let y = array![[1u8, 0, 0], [0, 1, 0], [0, 0, 0], [1, 1, 0]];
        let fitted = model().fit(&features(), y.view()).unwrap();
        assert_eq!(fitted.n_outputs(), 3);

        let pred = fitted.apply(&features()).unwrap();
        assert_eq!(pred.dim(), (4, 3));
        assert!(pred.iter().all(|&v| v <= 1));
        // A column that is all zeros can only predict zero
        assert!(pred.column(2).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_seeded_fit_is_reproducible() {
        let y = array![[1u8], [0], [1], [0]];
        let a = model().fit(&features(), y.view()).unwrap();
        let b = model().fit(&features(), y.view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shape_errors() {
        let y = array![[1u8], [0]];
        assert!(matches!(
            model().fit(&features(), y.view()),
            Err(PipelineError::ShapeMismatch(_))
        ));

        let y = array![[1u8], [0], [1], [0]];
        let fitted = model().fit(&features(), y.view()).unwrap();
        assert!(fitted.apply(&SparseMatrix::new(2)).is_err());
    }
}
