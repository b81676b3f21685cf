//! Random forests of CART classification trees over sparse features.
//!
//! Trees are grown on bootstrap samples (expressed as per-row weights) until
//! their leaves are pure. At each node `sqrt(n_features)` features are drawn
//! without replacement; drawing continues past that number while every drawn
//! feature was constant on the node. Splits minimise weighted Gini impurity.
//! A forest predicts class 1 when the mean of the trees' leaf probabilities
//! for class 1 is strictly greater than for class 0.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::sparse::{ColumnIndex, SparseMatrix};

const IMPURITY_EPSILON: f64 = 1e-7;
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Hyperparameters of a random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.n_estimators == 0 {
            return Err(PipelineError::InvalidParameter("n_estimators must be positive".into()));
        }
        if self.min_samples_split < 2 {
            return Err(PipelineError::InvalidParameter("min_samples_split must be at least 2".into()));
        }
        if self.min_samples_leaf == 0 {
            return Err(PipelineError::InvalidParameter("min_samples_leaf must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        proba: [f64; 2],
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Node::Split { left, right, .. } = &self.nodes[node] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }

    /// Class probabilities of the leaf reached by `features` (a sparse row)
    pub fn predict_proba_row(&self, indices: &[usize], values: &[f64]) -> [f64; 2] {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = match indices.binary_search(feature) {
                        Ok(pos) => values[pos],
                        Err(_) => 0.0,
                    };
                    node = if value <= *threshold { *left } else { *right };
                }
                Node::Leaf { proba } => return *proba,
            }
        }
    }
}

struct Candidate {
    feature: usize,
    threshold: f64,
    proxy: f64,
}

/// Sorted run of equal feature values on a node
struct Run {
    value: f64,
    weights: [f64; 2],
    count: usize,
}

struct Task {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
}

struct TreeBuilder<'a> {
    columns: &'a ColumnIndex,
    labels: &'a [u8],
    weights: Vec<f64>,
    params: &'a ForestParams,
    max_features: usize,
    rng: StdRng,
    features: Vec<usize>,
    in_node: Vec<bool>,
    scratch: Vec<f64>,
    nodes: Vec<Node>,
}

fn gini(weights: [f64; 2]) -> f64 {
    let total = weights[0] + weights[1];
    if total <= 0.0 {
        return 0.0;
    }
    let p0 = weights[0] / total;
    let p1 = weights[1] / total;
    1.0 - p0 * p0 - p1 * p1
}

impl<'a> TreeBuilder<'a> {
    fn new(
        columns: &'a ColumnIndex,
        labels: &'a [u8],
        params: &'a ForestParams,
        max_features: usize,
        seed: u64,
    ) -> Self {
        let n_rows = columns.n_rows();
        let mut rng = StdRng::seed_from_u64(seed);
        let weights = if params.bootstrap {
            let mut weights = vec![0.0; n_rows];
            for _ in 0..n_rows {
                weights[rng.gen_range(0..n_rows)] += 1.0;
            }
            weights
        } else {
            vec![1.0; n_rows]
        };
        Self {
            columns,
            labels,
            weights,
            params,
            max_features,
            rng,
            features: (0..columns.n_cols()).collect(),
            in_node: vec![false; n_rows],
            scratch: vec![0.0; n_rows],
            nodes: Vec::new(),
        }
    }

    fn placeholder(&mut self) -> usize {
        self.nodes.push(Node::Leaf { proba: [0.0, 0.0] });
        self.nodes.len() - 1
    }

    fn class_weights(&self, rows: &[usize]) -> [f64; 2] {
        let mut w = [0.0; 2];
        for &r in rows {
            w[self.labels[r] as usize] += self.weights[r];
        }
        w
    }

    fn build(mut self) -> DecisionTree {
        let rows: Vec<usize> = (0..self.columns.n_rows()).filter(|&r| self.weights[r] > 0.0).collect();
        let root = self.placeholder();
        let mut stack = vec![Task { node: root, rows, depth: 0 }];

        while let Some(Task { node, rows, depth }) = stack.pop() {
            let class_weights = self.class_weights(&rows);
            let impurity = gini(class_weights);
            let is_leaf = rows.len() < self.params.min_samples_split
                || rows.len() < 2 * self.params.min_samples_leaf
                || self.params.max_depth.map_or(false, |max| depth >= max)
                || impurity <= IMPURITY_EPSILON;

            if !is_leaf {
                if let Some(split) = self.best_split(&rows, class_weights) {
                    let (left_rows, right_rows) = self.partition(&rows, split.feature, split.threshold);
                    let left = self.placeholder();
                    let right = self.placeholder();
                    self.nodes[node] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left,
                        right,
                    };
                    stack.push(Task { node: right, rows: right_rows, depth: depth + 1 });
                    stack.push(Task { node: left, rows: left_rows, depth: depth + 1 });
                    continue;
                }
            }

            let total = class_weights[0] + class_weights[1];
            self.nodes[node] = Node::Leaf {
                proba: [class_weights[0] / total, class_weights[1] / total],
            };
        }

        DecisionTree { nodes: self.nodes }
    }

    /// Runs of node values for one feature in ascending order, zeros pooled
    fn runs(&self, rows: &[usize], class_weights: [f64; 2], feature: usize) -> Vec<Run> {
        let (col_rows, col_vals) = self.columns.column(feature);
        let mut entries: Vec<(f64, usize)> = col_rows
            .iter()
            .zip(col_vals)
            .filter(|(r, _)| self.in_node[**r])
            .map(|(&r, &v)| (v, r))
            .collect();
        entries.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut zero_weights = class_weights;
        for &(_, r) in &entries {
            zero_weights[self.labels[r] as usize] -= self.weights[r];
        }
        let n_zero = rows.len() - entries.len();

        let mut runs: Vec<Run> = Vec::new();
        let mut zero_pending = n_zero > 0;
        for (value, r) in entries {
            if zero_pending && value > 0.0 {
                runs.push(Run { value: 0.0, weights: zero_weights, count: n_zero });
                zero_pending = false;
            }
            let label = self.labels[r] as usize;
            match runs.last_mut() {
                Some(run) if value <= run.value + FEATURE_THRESHOLD => {
                    run.weights[label] += self.weights[r];
                    run.count += 1;
                }
                _ => {
                    let mut weights = [0.0; 2];
                    weights[label] = self.weights[r];
                    runs.push(Run { value, weights, count: 1 });
                }
            }
        }
        if zero_pending {
            runs.push(Run { value: 0.0, weights: zero_weights, count: n_zero });
        }
        runs
    }

    fn best_split(&mut self, rows: &[usize], class_weights: [f64; 2]) -> Option<Candidate> {
        for &r in rows {
            self.in_node[r] = true;
        }

        let n_features = self.features.len();
        let min_leaf = self.params.min_samples_leaf;
        let mut best: Option<Candidate> = None;
        let mut visited = 0;
        let mut constants = 0;
        let mut i = 0;

        while i < n_features && (visited < self.max_features || visited <= constants) {
            let j = self.rng.gen_range(i..n_features);
            self.features.swap(i, j);
            let feature = self.features[i];
            i += 1;
            visited += 1;

            let runs = self.runs(rows, class_weights, feature);
            if runs.len() < 2 {
                constants += 1;
                continue;
            }

            let mut left_w = [0.0; 2];
            let mut left_n = 0;
            for k in 0..runs.len() - 1 {
                left_w[0] += runs[k].weights[0];
                left_w[1] += runs[k].weights[1];
                left_n += runs[k].count;
                let right_n = rows.len() - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }
                let right_w = [class_weights[0] - left_w[0], class_weights[1] - left_w[1]];
                let proxy = -(left_w[0] + left_w[1]) * gini(left_w) - (right_w[0] + right_w[1]) * gini(right_w);

                if best.as_ref().map_or(true, |b| proxy > b.proxy) {
                    let (lo, hi) = (runs[k].value, runs[k + 1].value);
                    let mut threshold = lo / 2.0 + hi / 2.0;
                    if threshold >= hi || !threshold.is_finite() {
                        threshold = lo;
                    }
                    best = Some(Candidate { feature, threshold, proxy });
                }
            }
        }

        for &r in rows {
            self.in_node[r] = false;
        }
        best
    }

    fn partition(&mut self, rows: &[usize], feature: usize, threshold: f64) -> (Vec<usize>, Vec<usize>) {
        for &r in rows {
            self.in_node[r] = true;
        }
        let (col_rows, col_vals) = self.columns.column(feature);
        for (&r, &v) in col_rows.iter().zip(col_vals) {
            if self.in_node[r] {
                self.scratch[r] = v;
            }
        }

        let (left, right): (Vec<usize>, Vec<usize>) = rows.iter().partition(|&&r| self.scratch[r] <= threshold);

        for &r in rows {
            self.in_node[r] = false;
            self.scratch[r] = 0.0;
        }
        (left, right)
    }
}

/// Unfitted random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
}

/// A trained ensemble of trees for one binary target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Fits the forest on column-major features and 0/1 labels
    pub fn fit_columns(&self, columns: &ColumnIndex, labels: &[u8], seed: u64) -> Result<FittedForest, PipelineError> {
        self.params.validate()?;
        if columns.n_rows() == 0 {
            return Err(PipelineError::EmptyTrainingSet("forest received no rows".into()));
        }
        if labels.len() != columns.n_rows() {
            return Err(PipelineError::ShapeMismatch(format!(
                "{} labels for {} rows",
                labels.len(),
                columns.n_rows()
            )));
        }
        if let Some(bad) = labels.iter().find(|&&l| l > 1) {
            return Err(PipelineError::InvalidParameter(format!("label {} is not binary", bad)));
        }

        let n_features = columns.n_cols();
        let max_features = ((n_features as f64).sqrt() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(seed);
        let tree_seeds: Vec<u64> = (0..self.params.n_estimators).map(|_| rng.gen()).collect();

        let trees = tree_seeds
            .into_par_iter()
            .map(|tree_seed| TreeBuilder::new(columns, labels, &self.params, max_features, tree_seed).build())
            .collect();

        Ok(FittedForest { trees, n_features })
    }

    pub fn fit(&self, x: &SparseMatrix, labels: &[u8], seed: u64) -> Result<FittedForest, PipelineError> {
        self.fit_columns(&x.to_columns(), labels, seed)
    }
}

impl FittedForest {
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean class probabilities over the trees for each row
    pub fn predict_proba(&self, x: &SparseMatrix) -> Vec<[f64; 2]> {
        (0..x.n_rows())
            .map(|i| {
                let (indices, values) = x.row(i);
                let mut sum = [0.0; 2];
                for tree in &self.trees {
                    let p = tree.predict_proba_row(indices, values);
                    sum[0] += p[0];
                    sum[1] += p[1];
                }
                let n = self.trees.len() as f64;
                [sum[0] / n, sum[1] / n]
            })
            .collect()
    }

    pub fn predict(&self, x: &SparseMatrix) -> Vec<u8> {
        self.predict_proba(x)
            .into_iter()
            .map(|p| if p[1] > p[0] { 1 } else { 0 })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (SparseMatrix, Vec<u8>) {
        // Feature 0 marks the positive class, feature 1 is noise
        let x = SparseMatrix::from_dense(&[
            vec![1.0, 0.0],
            vec![0.9, 1.0],
            vec![0.8, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 0.0],
            vec![0.0, 1.0],
        ])
        .unwrap();
        (x, vec![1, 1, 1, 0, 0, 0])
    }

    fn params(n_estimators: usize, bootstrap: bool) -> ForestParams {
        ForestParams {
            n_estimators,
            bootstrap,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_single_tree_fits_training_data() {
        let (x, y) = separable();
        let forest = RandomForest::new(params(1, false)).fit(&x, &y, 3).unwrap();
        assert_eq!(forest.predict(&x), y);
        assert!(forest.trees()[0].depth() >= 1);
        assert!(forest.trees()[0].node_count() >= 3);
    }

    #[test]
    fn test_forest_predictions_are_binary() {
        let (x, y) = separable();
        let forest = RandomForest::new(params(10, true)).fit(&x, &y, 11).unwrap();
        let pred = forest.predict(&x);
        assert_eq!(pred.len(), 6);
        assert!(pred.iter().all(|&p| p <= 1));
        for p in forest.predict_proba(&x) {
            assert!((p[0] + p[1] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = separable();
        let model = RandomForest::new(params(5, true));
        assert_eq!(model.fit(&x, &y, 99).unwrap(), model.fit(&x, &y, 99).unwrap());
    }

    #[test]
    fn test_single_class_predicts_that_class() {
        let (x, _) = separable();
        let forest = RandomForest::new(params(3, true)).fit(&x, &[0; 6], 1).unwrap();
        assert_eq!(forest.predict(&x), vec![0; 6]);
        let forest = RandomForest::new(params(3, true)).fit(&x, &[1; 6], 1).unwrap();
        assert_eq!(forest.predict(&x), vec![1; 6]);
    }

    #[test]
    fn test_invalid_inputs() {
        let (x, y) = separable();
        assert!(RandomForest::new(params(0, true)).fit(&x, &y, 0).is_err());
        assert!(RandomForest::new(params(2, true)).fit(&x, &y[..3], 0).is_err());
        assert!(RandomForest::new(params(2, true)).fit(&x, &[2, 0, 0, 0, 0, 0], 0).is_err());
        assert!(RandomForest::new(params(2, true)).fit(&SparseMatrix::new(2), &[], 0).is_err());
    }

    #[test]
    fn test_negative_values_split() {
        let x = SparseMatrix::from_dense(&[vec![-1.0], vec![-2.0], vec![0.0], vec![1.0]]).unwrap();
        let y = vec![1, 1, 0, 0];
        let forest = RandomForest::new(params(1, false)).fit(&x, &y, 5).unwrap();
        assert_eq!(forest.predict(&x), y);
    }
}
