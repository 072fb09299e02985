use std::{fs::File, path::Path};

use csv::{ReaderBuilder, Trim};
use log::{debug, info};
use ndarray::{Array2, ArrayView2};

use crate::{PipelineErr, Result};

/// A dataset of numeric features and a binary label, held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    feature_names: Vec<String>,
    label_column: String,
    x: Array2<f32>,
    y: Vec<u8>,
}

impl Table {
    /// Creates a new `Table`.
    ///
    /// # Errors
    /// If the amount of names, columns, rows and labels don't agree, or if there are no rows.
    pub fn new(
        feature_names: Vec<String>,
        label_column: String,
        x: Array2<f32>,
        y: Vec<u8>,
    ) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(PipelineErr::EmptyDataset);
        }

        if feature_names.len() != x.ncols() {
            return Err(PipelineErr::FeatureMismatch {
                got: x.ncols(),
                expected: feature_names.len(),
            });
        }

        if y.len() != x.nrows() {
            return Err(PipelineErr::LengthMismatch {
                got: y.len(),
                expected: x.nrows(),
            });
        }

        if let Some(row) = y.iter().position(|&label| label > 1) {
            return Err(PipelineErr::NonBinaryLabel {
                row: row + 1,
                value: y[row].to_string(),
            });
        }

        Ok(Self {
            feature_names,
            label_column,
            x,
            y,
        })
    }

    /// Reads a table from a CSV file with a header row.
    ///
    /// Every column but `label_column` is a feature. Labels are parsed as numbers and truncated
    /// to integers, which then must be 0 or 1.
    ///
    /// # Arguments
    /// * `path` - The CSV file.
    /// * `label_column` - The name of the column holding the label.
    ///
    /// # Errors
    /// If the file can't be read, a column is missing, or a cell isn't a valid value.
    pub fn from_csv<P: AsRef<Path>>(path: P, label_column: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(file);

        let headers = rdr.headers()?.clone();
        let label_idx = headers
            .iter()
            .position(|h| h == label_column)
            .ok_or_else(|| PipelineErr::MissingColumn(label_column.to_string()))?;

        let feature_names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != label_idx)
            .map(|(_, h)| h.to_string())
            .collect();

        if feature_names.is_empty() {
            return Err(PipelineErr::NoFeatures);
        }

        let mut data = Vec::new();
        let mut y = Vec::new();

        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            let row = i + 1;

            for (j, cell) in record.iter().enumerate() {
                if j == label_idx {
                    y.push(parse_label(row, cell)?);
                    continue;
                }

                let value = cell
                    .parse::<f32>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| PipelineErr::ParseCell {
                        row,
                        column: headers[j].to_string(),
                        value: cell.to_string(),
                    })?;

                data.push(value);
            }
        }

        if y.is_empty() {
            return Err(PipelineErr::EmptyDataset);
        }

        let x = Array2::from_shape_vec((y.len(), feature_names.len()), data)?;
        let table = Self::new(feature_names, label_column.to_string(), x, y)?;

        let [negatives, positives] = table.class_counts();
        info!(
            rows = table.len(), features = table.n_features();
            "loaded {}", path.display()
        );
        debug!(negatives = negatives, positives = positives; "class balance");

        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn y(&self) -> &[u8] {
        &self.y
    }

    /// The amount of rows labeled 0 and 1.
    pub fn class_counts(&self) -> [usize; 2] {
        let positives = self.y.iter().filter(|&&label| label == 1).count();
        [self.len() - positives, positives]
    }
}

fn parse_label(row: usize, cell: &str) -> Result<u8> {
    let non_binary = || PipelineErr::NonBinaryLabel {
        row,
        value: cell.to_string(),
    };

    let value = cell.parse::<f64>().map_err(|_| non_binary())?;
    if !value.is_finite() {
        return Err(non_binary());
    }

    let label = value.trunc();
    if label == 0. {
        Ok(0)
    } else if label == 1. {
        Ok(1)
    } else {
        Err(non_binary())
    }
}
