use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis, concatenate};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// An in-memory table of samples, each row holding the `x_size` inputs followed by the expected
/// outputs.
#[derive(Debug, Clone)]
pub struct Dataset {
    x_size: usize,
    data: Array2<f32>,
}

impl Dataset {
    /// Creates a new `Dataset` from a table that already has the outputs as trailing columns.
    ///
    /// # Arguments
    /// * `data` - The samples, one per row.
    /// * `x_size` - The amount of input columns.
    ///
    /// # Returns
    /// A new `Dataset` or an error if there are no samples or no output columns.
    pub fn new(data: Array2<f32>, x_size: usize) -> Result<Self> {
        if data.nrows() == 0 {
            return Err(MlErr::EmptyDataset);
        }

        if x_size >= data.ncols() {
            return Err(MlErr::SizeMismatch {
                what: "dataset columns",
                got: data.ncols(),
                expected: x_size + 1,
            });
        }

        Ok(Self { x_size, data })
    }

    /// Creates a new `Dataset` joining the inputs and the expected outputs side by side.
    pub fn from_arrays(x: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "dataset rows",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        let data = concatenate(Axis(1), &[x, y])?;
        Self::new(data, x.ncols())
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_size(&self) -> usize {
        self.x_size
    }

    pub fn y_size(&self) -> usize {
        self.data.ncols() - self.x_size
    }

    /// Shuffles the samples in place.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        let mut idx: Vec<_> = (0..self.len()).collect();
        idx.shuffle(rng);
        self.data = self.data.select(Axis(0), &idx);
    }

    /// Splits the samples into consecutive batches, the last one may be shorter.
    ///
    /// # Arguments
    /// * `batch_size` - The amount of samples per batch.
    ///
    /// # Returns
    /// An iterator of `(x, y)` views.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        self.data
            .axis_chunks_iter(Axis(0), batch_size.get())
            .map(|chunk| chunk.split_at(Axis(1), self.x_size))
    }

    /// Every sample as a single batch.
    pub fn view(&self) -> (ArrayView2<'_, f32>, ArrayView2<'_, f32>) {
        self.data.view().split_at(Axis(1), self.x_size)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn dataset() -> Dataset {
        let x = Array2::from_shape_fn((5, 2), |(i, j)| (i * 10 + j) as f32);
        let y = Array2::from_shape_fn((5, 1), |(i, _)| i as f32);
        Dataset::from_arrays(x.view(), y.view()).unwrap()
    }

    #[test]
    fn batches_cover_every_row() {
        let dataset = dataset();
        let sizes: Vec<_> = dataset
            .batches(NonZeroUsize::new(2).unwrap())
            .map(|(x, y)| (x.nrows(), x.ncols(), y.ncols()))
            .collect();

        assert_eq!(sizes, [(2, 2, 1), (2, 2, 1), (1, 2, 1)]);
    }

    #[test]
    fn shuffle_keeps_rows_together() {
        let mut dataset = dataset();
        dataset.shuffle(&mut StdRng::seed_from_u64(42));

        let (x, y) = dataset.view();
        for (xr, yr) in x.rows().into_iter().zip(y.rows()) {
            assert_eq!(xr[0], yr[0] * 10.);
            assert_eq!(xr[1], yr[0] * 10. + 1.);
        }
    }

    #[test]
    fn rejects_mismatched_rows() {
        let x = array![[1., 2.], [3., 4.]];
        let y = array![[1.]];

        assert!(Dataset::from_arrays(x.view(), y.view()).is_err());
    }

    #[test]
    fn rejects_empty_data() {
        let data = Array2::zeros((0, 3));
        assert!(matches!(Dataset::new(data, 2), Err(MlErr::EmptyDataset)));
    }
}
