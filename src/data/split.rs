use log::info;
use ndarray::{Array2, Axis};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::Table;
use crate::{PipelineErr, Result};

/// The rows of a `Table` split into a training and a test subset.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub x_train: Array2<f32>,
    pub y_train: Vec<u8>,
    pub x_test: Array2<f32>,
    pub y_test: Vec<u8>,
}

impl Split {
    pub fn train_len(&self) -> usize {
        self.y_train.len()
    }

    pub fn test_len(&self) -> usize {
        self.y_test.len()
    }
}

/// Splits a table keeping the class ratio in both subsets.
///
/// Each class sends `round(n_class * test_size)` of its rows, picked at random, to the test set
/// and the rest to training. Rows inside each subset are shuffled so that classes interleave.
///
/// # Arguments
/// * `table` - The rows to split.
/// * `test_size` - The fraction of rows to hold out, in `(0, 1)`.
/// * `seed` - Makes the split reproducible.
///
/// # Errors
/// If a class has fewer than 2 rows or if either subset would end up empty.
pub fn stratified_split(table: &Table, test_size: f32, seed: u64) -> Result<Split> {
    if !(test_size > 0. && test_size < 1.) {
        return Err(PipelineErr::Split(format!(
            "test size must be in (0, 1), got {test_size}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::with_capacity(table.len());
    let mut test_idx = Vec::new();

    for class in [0u8, 1] {
        let mut idx: Vec<_> = (0..table.len())
            .filter(|&i| table.y()[i] == class)
            .collect();

        if idx.len() < 2 {
            return Err(PipelineErr::Split(format!(
                "class {class} has {} rows, at least 2 are needed",
                idx.len()
            )));
        }

        idx.shuffle(&mut rng);

        let n_test = (idx.len() as f64 * f64::from(test_size)).round() as usize;
        let (test, train) = idx.split_at(n_test.min(idx.len()));
        test_idx.extend_from_slice(test);
        train_idx.extend_from_slice(train);
    }

    if train_idx.is_empty() || test_idx.is_empty() {
        return Err(PipelineErr::Split(format!(
            "{} training and {} test rows",
            train_idx.len(),
            test_idx.len()
        )));
    }

    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    let take = |idx: &[usize]| {
        let x = table.x().select(Axis(0), idx);
        let y: Vec<u8> = idx.iter().map(|&i| table.y()[i]).collect();
        (x, y)
    };

    let (x_train, y_train) = take(&train_idx);
    let (x_test, y_test) = take(&test_idx);

    info!(train = y_train.len(), test = y_test.len(); "split dataset");

    Ok(Split {
        x_train,
        y_train,
        x_test,
        y_test,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(negatives: usize, positives: usize) -> Table {
        let n = negatives + positives;
        // the feature is the row index, so rows can be traced back
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f32);
        let y = (0..n).map(|i| u8::from(i >= negatives)).collect();
        Table::new(vec!["id".into()], "Result".into(), x, y).unwrap()
    }

    fn positives(y: &[u8]) -> usize {
        y.iter().filter(|&&l| l == 1).count()
    }

    #[test]
    fn keeps_the_class_ratio() {
        let split = stratified_split(&table(80, 20), 0.2, 42).unwrap();

        assert_eq!(split.test_len(), 20);
        assert_eq!(split.train_len(), 80);
        assert_eq!(positives(&split.y_test), 4);
        assert_eq!(positives(&split.y_train), 16);
    }

    #[test]
    fn subsets_partition_the_rows() {
        let table = table(30, 13);
        let split = stratified_split(&table, 0.25, 1).unwrap();

        let mut ids: Vec<usize> = split
            .x_train
            .iter()
            .chain(split.x_test.iter())
            .map(|&v| v as usize)
            .collect();
        ids.sort_unstable();

        assert_eq!(ids, (0..43).collect::<Vec<_>>());

        // labels travel with their rows
        for (x, &y) in split.x_test.column(0).iter().zip(&split.y_test) {
            assert_eq!(y, u8::from(*x as usize >= 30));
        }
    }

    #[test]
    fn same_seed_same_split() {
        let table = table(50, 50);

        let a = stratified_split(&table, 0.2, 42).unwrap();
        let b = stratified_split(&table, 0.2, 42).unwrap();
        let c = stratified_split(&table, 0.2, 43).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn rejects_a_class_with_one_row() {
        assert!(matches!(
            stratified_split(&table(10, 1), 0.2, 0),
            Err(PipelineErr::Split(_))
        ));
    }

    #[test]
    fn rejects_an_empty_test_set() {
        assert!(matches!(
            stratified_split(&table(2, 2), 0.1, 0),
            Err(PipelineErr::Split(_))
        ));
    }
}
