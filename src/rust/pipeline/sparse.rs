use serde::{Deserialize, Serialize};

use super::error::PipelineError;

/// Row-major (CSR) sparse matrix of `f64`.
///
/// Column indices within a row are strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
}

/// Column-major copy of a [`SparseMatrix`], used by tree induction
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    n_rows: usize,
    indptr: Vec<usize>,
    rows: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    pub fn new(n_cols: usize) -> Self {
        Self {
            n_cols,
            indptr: vec![0],
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Appends a row; entries are sorted by column and zeros are dropped.
    pub fn push_row(&mut self, mut entries: Vec<(usize, f64)>) -> Result<(), PipelineError> {
        entries.sort_by_key(|(col, _)| *col);
        let mut last: Option<usize> = None;
        for &(col, _) in &entries {
            if col >= self.n_cols {
                return Err(PipelineError::ShapeMismatch(format!(
                    "column {} out of range for {} columns",
                    col, self.n_cols
                )));
            }
            if last == Some(col) {
                return Err(PipelineError::ShapeMismatch(format!("duplicate column {} in row", col)));
            }
            last = Some(col);
        }
        for (col, value) in entries {
            if value != 0.0 {
                self.indices.push(col);
                self.values.push(value);
            }
        }
        self.indptr.push(self.indices.len());
        Ok(())
    }

    pub fn from_dense(rows: &[Vec<f64>]) -> Result<Self, PipelineError> {
        let n_cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut matrix = Self::new(n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(PipelineError::ShapeMismatch("ragged dense rows".into()));
            }
            matrix.push_row(row.iter().copied().enumerate().collect())?;
        }
        Ok(matrix)
    }

    pub fn n_rows(&self) -> usize {
        self.indptr.len() - 1
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of one row
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        (&self.indices[start..end], &self.values[start..end])
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        let (cols, vals) = self.row(i);
        match cols.binary_search(&j) {
            Ok(pos) => vals[pos],
            Err(_) => 0.0,
        }
    }

    pub fn select_rows(&self, rows: &[usize]) -> SparseMatrix {
        let mut out = SparseMatrix::new(self.n_cols);
        for &r in rows {
            let (cols, vals) = self.row(r);
            out.indices.extend_from_slice(cols);
            out.values.extend_from_slice(vals);
            out.indptr.push(out.indices.len());
        }
        out
    }

    /// Applies `f(column, value)` to every stored value
    pub fn map_values(&mut self, f: impl Fn(usize, f64) -> f64) {
        for (value, &col) in self.values.iter_mut().zip(&self.indices) {
            *value = f(col, *value);
        }
    }

    /// Scales each row to unit euclidean length; empty rows stay empty
    pub fn normalize_rows(&mut self) {
        for i in 0..self.n_rows() {
            let (start, end) = (self.indptr[i], self.indptr[i + 1]);
            let norm: f64 = self.values[start..end].iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 1e-12 {
                for v in &mut self.values[start..end] {
                    *v /= norm;
                }
            }
        }
    }

    /// Number of rows with a stored value in each column
    pub fn column_document_frequency(&self) -> Vec<usize> {
        let mut df = vec![0; self.n_cols];
        for &col in &self.indices {
            df[col] += 1;
        }
        df
    }

    pub fn to_columns(&self) -> ColumnIndex {
        let mut counts = vec![0usize; self.n_cols + 1];
        for &col in &self.indices {
            counts[col + 1] += 1;
        }
        for c in 0..self.n_cols {
            counts[c + 1] += counts[c];
        }
        let indptr = counts.clone();
        let mut next = counts;
        let mut rows = vec![0; self.nnz()];
        let mut values = vec![0.0; self.nnz()];
        for i in 0..self.n_rows() {
            let (cols, vals) = self.row(i);
            for (&col, &val) in cols.iter().zip(vals) {
                let slot = next[col];
                rows[slot] = i;
                values[slot] = val;
                next[col] += 1;
            }
        }
        ColumnIndex {
            n_rows: self.n_rows(),
            indptr,
            rows,
            values,
        }
    }
}

impl ColumnIndex {
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.indptr.len() - 1
    }

    /// Row indices (ascending) and values stored in column `j`
    pub fn column(&self, j: usize) -> (&[usize], &[f64]) {
        let (start, end) = (self.indptr[j], self.indptr[j + 1]);
        (&self.rows[start..end], &self.values[start..end])
    }
}
