use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::sparse::SparseMatrix;
use super::{FittedStage, Stage};

/// Reweights count vectors by smoothed inverse document frequency and
/// normalizes each row to unit length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TfidfTransformer;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedTfidf {
    idf: Vec<f64>,
}

impl TfidfTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl Stage<SparseMatrix> for TfidfTransformer {
    type Fitted = FittedTfidf;

    fn fit(&self, counts: &SparseMatrix, _targets: ArrayView2<'_, u8>) -> Result<FittedTfidf, PipelineError> {
        if counts.n_rows() == 0 {
            return Err(PipelineError::EmptyTrainingSet("tf-idf received no rows".into()));
        }
        let n = counts.n_rows() as f64;
        // idf = ln((1 + n) / (1 + df)) + 1
        let idf = counts
            .column_document_frequency()
            .into_iter()
            .map(|df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();
        Ok(FittedTfidf { idf })
    }
}

impl FittedTfidf {
    pub fn idf(&self) -> &[f64] {
        &self.idf
    }
}

impl FittedStage<SparseMatrix> for FittedTfidf {
    type Output = SparseMatrix;

    fn apply(&self, counts: &SparseMatrix) -> Result<SparseMatrix, PipelineError> {
        if counts.n_cols() != self.idf.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "tf-idf fitted on {} features, got {}",
                self.idf.len(),
                counts.n_cols()
            )));
        }
        let mut weighted = counts.clone();
        weighted.map_values(|col, v| v * self.idf[col]);
        weighted.normalize_rows();
        Ok(weighted)
    }
}
