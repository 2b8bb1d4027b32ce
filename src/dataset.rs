//! Labelled training data (`parkinsons.data`).
//!
//! The table carries a `name` column, the 22 vocabulary columns and an
//! integer `status`. Only the core columns are kept: the extended measures are
//! never produced for new recordings, so a model trained on them could not
//! score stored records.

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::features::FeatureKey;
use crate::results::STATUS_COLUMN;
use crate::tabular;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid dataset {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Dataset {path} has no column {column:?}")]
    MissingColumn { path: PathBuf, column: String },
    #[error("Dataset {path} has no rows")]
    Empty { path: PathBuf },
    #[error("Test ratio must be between 0 and 1 (exclusive), got {0}")]
    InvalidSplit(f64),
    #[error("Dataset of {rows} rows is too small for a {ratio} test split")]
    TooSmall { rows: usize, ratio: f64 },
}

/// Feature matrix with parallel binary labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    /// Feature columns, in vocabulary order.
    pub columns: Vec<FeatureKey>,
    /// Sample names from the first column.
    pub names: Vec<String>,
    pub features: Array2<f64>,
    pub labels: Array1<usize>,
}

impl LabeledDataset {
    /// Load a labelled table, keeping the core vocabulary columns.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::parse(&text, path)?;
        tracing::info!(
            "Loaded {} labelled samples ({} features) from {}",
            dataset.len(),
            dataset.columns.len(),
            path.display()
        );
        Ok(dataset)
    }

    fn parse(text: &str, path: &Path) -> Result<Self, DatasetError> {
        let parse_err = |message: String| DatasetError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let mut rows = tabular::parse_rows(text).map_err(parse_err)?.into_iter();
        let header = rows.next().ok_or_else(|| DatasetError::Empty {
            path: path.to_path_buf(),
        })?;
        let position = |name: &str| {
            header
                .iter()
                .position(|column| column.trim() == name)
                .ok_or_else(|| DatasetError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                })
        };
        let columns: Vec<FeatureKey> = FeatureKey::core().collect();
        let feature_idx = columns
            .iter()
            .map(|key| position(key.column_name()))
            .collect::<Result<Vec<_>, _>>()?;
        let status_idx = position(STATUS_COLUMN)?;

        let mut names = Vec::new();
        let mut values = Vec::new();
        let mut labels = Vec::new();
        for (row_idx, cells) in rows.enumerate() {
            let line = row_idx + 2;
            if cells.len() != header.len() {
                return Err(parse_err(format!(
                    "line {line}: expected {} cells, found {}",
                    header.len(),
                    cells.len()
                )));
            }
            for &idx in &feature_idx {
                let value = cells[idx].trim().parse::<f64>().map_err(|err| {
                    parse_err(format!("line {line}, {}: {err}", header[idx].trim()))
                })?;
                values.push(value);
            }
            let label = match cells[status_idx].trim() {
                "0" => 0,
                "1" => 1,
                other => {
                    return Err(parse_err(format!(
                        "line {line}: status {other:?} is not 0 or 1"
                    )));
                }
            };
            labels.push(label);
            names.push(cells[0].trim().to_string());
        }
        if labels.is_empty() {
            return Err(DatasetError::Empty {
                path: path.to_path_buf(),
            });
        }
        let features = Array2::from_shape_vec((labels.len(), columns.len()), values)
            .map_err(|err| parse_err(err.to_string()))?;
        Ok(Self {
            columns,
            names,
            features,
            labels: Array1::from(labels),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of positive (label 1) samples.
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&label| label == 1).count()
    }

    /// Subset of rows, in the given order.
    pub fn select(&self, rows: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            names: rows.iter().map(|&row| self.names[row].clone()).collect(),
            features: self.features.select(Axis(0), rows),
            labels: self.labels.select(Axis(0), rows),
        }
    }

    /// Shuffle with `seed` and split off `test_ratio` of the rows as a test set.
    ///
    /// The test set gets `ceil(len * test_ratio)` rows; both halves are non-empty.
    pub fn train_test_split(&self, test_ratio: f64, seed: u64) -> Result<(Self, Self), DatasetError> {
        if !(test_ratio > 0.0 && test_ratio < 1.0) {
            return Err(DatasetError::InvalidSplit(test_ratio));
        }
        let n_test = (self.len() as f64 * test_ratio).ceil() as usize;
        if n_test == 0 || n_test >= self.len() {
            return Err(DatasetError::TooSmall {
                rows: self.len(),
                ratio: test_ratio,
            });
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));
        let (test, train) = order.split_at(n_test);
        Ok((self.select(train), self.select(test)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn header() -> String {
        let mut columns = vec!["name".to_string()];
        for key in FeatureKey::ALL {
            columns.push(key.column_name().to_string());
            if key == FeatureKey::HarmonicsToNoise {
                columns.push(STATUS_COLUMN.to_string());
            }
        }
        columns.join(",")
    }

    fn row(name: &str, base: f64, status: u8) -> String {
        let mut cells = vec![name.to_string()];
        for (idx, key) in FeatureKey::ALL.into_iter().enumerate() {
            cells.push(format!("{}", base + idx as f64));
            if key == FeatureKey::HarmonicsToNoise {
                cells.push(status.to_string());
            }
        }
        cells.join(",")
    }

    fn write_dataset(rows: &[String]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("parkinsons.data");
        let mut text = header();
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        std::fs::write(&path, text).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_core_columns_and_status_label() {
        let (_dir, path) = write_dataset(&[row("phon_R01_S01_1", 100.0, 1), row("phon_R01_S07_1", 200.0, 0)]);
        let dataset = LabeledDataset::load(&path).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.columns.len(), 16);
        assert_eq!(dataset.features.ncols(), 16);
        assert_eq!(dataset.features[[0, 0]], 100.0);
        assert_eq!(dataset.features[[1, 15]], 215.0);
        assert_eq!(dataset.labels.to_vec(), vec![1, 0]);
        assert_eq!(dataset.names[0], "phon_R01_S01_1");
        assert_eq!(dataset.positives(), 1);
    }

    #[test]
    fn rejects_missing_columns_and_bad_labels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("parkinsons.data");
        std::fs::write(&path, "name,HNR,status\nx,1,0\n").unwrap();
        assert!(matches!(
            LabeledDataset::load(&path),
            Err(DatasetError::MissingColumn { .. })
        ));

        let (_dir, path) = write_dataset(&[row("a", 1.0, 2)]);
        assert!(matches!(LabeledDataset::load(&path), Err(DatasetError::Parse { .. })));

        let (_dir, path) = write_dataset(&[]);
        assert!(matches!(LabeledDataset::load(&path), Err(DatasetError::Empty { .. })));
    }

    #[test]
    fn split_is_deterministic_and_disjoint() {
        let rows: Vec<String> = (0..10)
            .map(|idx| row(&format!("s{idx}"), idx as f64, (idx % 2) as u8))
            .collect();
        let (_dir, path) = write_dataset(&rows);
        let dataset = LabeledDataset::load(&path).unwrap();

        let (train, test) = dataset.train_test_split(0.3, 0).unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 7);
        let (train_again, _) = dataset.train_test_split(0.3, 0).unwrap();
        assert_eq!(train.names, train_again.names);
        assert!(train.names.iter().all(|name| !test.names.contains(name)));

        assert!(matches!(
            dataset.train_test_split(1.0, 0),
            Err(DatasetError::InvalidSplit(_))
        ));
    }
}
