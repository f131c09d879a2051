use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::dataset::{Frame, Labels};
use crate::error::{Error, Result};

/// Training and held-out partitions of a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub x_train: Frame,
    pub x_test: Frame,
    pub y_train: Labels,
    pub y_test: Labels,
}

/// Shuffles row positions with `seed` and holds out `ceil(test_size * n)` of them.
pub fn train_test_split(x: &Frame, y: &Labels, test_size: f64, seed: u64) -> Result<Split> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::InvalidSplit(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }
    if x.len() != y.len() {
        return Err(Error::ShapeMismatch {
            a: "labels",
            b: "features",
            got: y.len(),
            expected: x.len(),
        });
    }

    let n = x.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(Error::InvalidSplit(format!(
            "{n} rows cannot be split with test_size {test_size}"
        )));
    }

    let mut permutation: Vec<usize> = (0..n).collect();
    permutation.shuffle(&mut StdRng::seed_from_u64(seed));
    let (test, train) = permutation.split_at(n_test);

    info!(train = train.len(), test = test.len(), seed, "Split dataset");

    Ok(Split {
        x_train: x.take(train),
        x_test: x.take(test),
        y_train: y.take(train),
        y_test: y.take(test),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::read_csv;
    use std::collections::HashSet;

    fn sample(rows: usize) -> (Frame, Labels) {
        let mut csv = String::from("a,b,class\n");
        for i in 0..rows {
            csv.push_str(&format!("{},{},{}\n", i, i * 2, i % 3));
        }
        let mut frame = read_csv(csv.as_bytes()).unwrap();
        let labels = frame.pop("class").unwrap();
        (frame, labels)
    }

    #[test]
    fn test_split_is_deterministic() {
        let (x, y) = sample(50);

        let a = train_test_split(&x, &y, 0.2, 42).unwrap();
        let b = train_test_split(&x, &y, 0.2, 42).unwrap();
        let c = train_test_split(&x, &y, 0.2, 7).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.x_test.index(), c.x_test.index());
    }

    #[test]
    fn test_split_is_complete_and_disjoint() {
        let (x, y) = sample(51);
        let split = train_test_split(&x, &y, 0.2, 42).unwrap();

        assert_eq!(split.x_test.len(), 11);
        assert_eq!(split.x_train.len(), 40);
        assert_eq!(split.x_train.len() + split.x_test.len(), x.len());

        let train: HashSet<_> = split.x_train.index().iter().collect();
        let test: HashSet<_> = split.x_test.index().iter().collect();
        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), 51);
    }

    #[test]
    fn test_labels_follow_their_rows() {
        let (x, y) = sample(30);
        let split = train_test_split(&x, &y, 0.2, 42).unwrap();

        assert_eq!(split.x_train.index(), split.y_train.index());
        for (row, &label) in split.x_train.index().iter().zip(split.y_train.values()) {
            assert_eq!(label, row % 3);
        }
    }

    #[test]
    fn test_invalid_splits() {
        let (x, y) = sample(3);

        assert!(train_test_split(&x, &y, 0.0, 42).is_err());
        assert!(train_test_split(&x, &y, 1.0, 42).is_err());
        assert!(train_test_split(&x, &y, 0.99, 42).is_err());
        assert!(train_test_split(&x, &y.take(&[0, 1]), 0.2, 42).is_err());
    }
}
