use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Result, TrainError};

/// Output of [`train_test_split`]
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Vec<String>,
    pub x_test: Vec<String>,
    pub y_train: Array2<u8>,
    pub y_test: Array2<u8>,
}

/// Shuffles the rows and holds out `ceil(test_size * n)` of them for testing.
///
/// Messages and target rows stay aligned. With a seed the split is
/// reproducible; without one the shuffle uses fresh entropy.
pub fn train_test_split(
    messages: &[String],
    targets: &Array2<u8>,
    test_size: f64,
    seed: Option<u64>,
) -> Result<TrainTestSplit> {
    let n = messages.len();
    if targets.nrows() != n {
        return Err(TrainError::InvalidArgument(format!(
            "{} messages but {} target rows",
            n,
            targets.nrows()
        )));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(TrainError::InvalidArgument(format!(
            "test size must be between 0 and 1, got {}",
            test_size
        )));
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(TrainError::InvalidArgument(format!(
            "cannot split {} samples with test size {}: one side would be empty",
            n, test_size
        )));
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    let (test_idx, train_idx) = indices.split_at(n_test);

    log::debug!("Dataset split: {} training, {} test", n_train, n_test);

    Ok(TrainTestSplit {
        x_train: train_idx.iter().map(|&i| messages[i].clone()).collect(),
        x_test: test_idx.iter().map(|&i| messages[i].clone()).collect(),
        y_train: targets.select(Axis(0), train_idx),
        y_test: targets.select(Axis(0), test_idx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample(n: usize) -> (Vec<String>, Array2<u8>) {
        let messages = (0..n).map(|i| format!("message {}", i)).collect();
        let targets = Array2::from_shape_fn((n, 2), |(i, j)| ((i + j) % 2) as u8);
        (messages, targets)
    }

    #[test]
    fn test_split_sizes() {
        let (x, y) = sample(100);
        let split = train_test_split(&x, &y, 0.2, Some(1)).unwrap();
        assert_eq!(split.x_train.len(), 80);
        assert_eq!(split.x_test.len(), 20);
        assert_eq!(split.y_train.dim(), (80, 2));
        assert_eq!(split.y_test.dim(), (20, 2));
    }

    #[test]
    fn test_test_size_rounds_up() {
        let (x, y) = sample(4);
        let split = train_test_split(&x, &y, 0.2, Some(3)).unwrap();
        assert_eq!(split.x_test.len(), 1);
        assert_eq!(split.x_train.len(), 3);
    }

    #[test]
    fn test_rows_stay_aligned() {
        let x: Vec<String> = vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()];
        let y = array![[0u8, 0], [0, 1], [1, 0], [1, 1], [0, 0]];
        let split = train_test_split(&x, &y, 0.4, Some(42)).unwrap();

        let position = |m: &str| x.iter().position(|s| s == m).unwrap();
        for (i, m) in split.x_train.iter().enumerate() {
            assert_eq!(split.y_train.row(i), y.row(position(m)));
        }
        for (i, m) in split.x_test.iter().enumerate() {
            assert_eq!(split.y_test.row(i), y.row(position(m)));
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let (x, y) = sample(30);
        let a = train_test_split(&x, &y, 0.3, Some(7)).unwrap();
        let b = train_test_split(&x, &y, 0.3, Some(7)).unwrap();
        assert_eq!(a.x_test, b.x_test);
        assert_eq!(a.y_train, b.y_train);
    }

    #[test]
    fn test_invalid_arguments() {
        let (x, y) = sample(1);
        assert!(matches!(train_test_split(&x, &y, 0.2, None), Err(TrainError::InvalidArgument(_))));
        let (x, y) = sample(10);
        assert!(train_test_split(&x, &y, 0.0, None).is_err());
        assert!(train_test_split(&x, &y, 1.0, None).is_err());
        assert!(train_test_split(&x[..5], &y, 0.2, None).is_err());
    }
}
