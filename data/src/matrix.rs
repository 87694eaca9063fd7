use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatrixError {
    #[error("row {row} has {actual} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("negative value {value} at row {row}, col {col}")]
    NegativeValue { row: usize, col: usize, value: f64 },
    #[error("non-finite value at row {row}, col {col}")]
    NonFinite { row: usize, col: usize },
    #[error("{axis} axis has {actual} boundaries, expected {expected}")]
    AxisMismatch {
        axis: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Per-entity, per-time-bucket metric grid.
///
/// Rows are entities (regions) in producer order, columns are fixed-width time
/// buckets in chronological order. Values live in a single row-major vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
    /// `cols + 1` unix-second bucket boundaries, when known.
    time_axis: Option<Vec<i64>>,
    /// `rows + 1` entity boundary keys, when known.
    key_axis: Option<Vec<String>>,
}

impl MetricMatrix {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, MatrixError> {
        let cols = rows.first().map_or(0, Vec::len);
        let row_count = rows.len();
        let mut values = Vec::with_capacity(row_count * cols);

        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(MatrixError::Ragged {
                    row: r,
                    expected: cols,
                    actual: row.len(),
                });
            }
            values.extend(row);
        }

        Self::from_flat(row_count, cols, values)
    }

    pub fn from_flat(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, MatrixError> {
        if values.len() != rows * cols {
            return Err(MatrixError::Ragged {
                row: values.len() / cols.max(1),
                expected: cols,
                actual: values.len() % cols.max(1),
            });
        }

        for (i, &value) in values.iter().enumerate() {
            let (row, col) = (i / cols, i % cols);
            if !value.is_finite() {
                return Err(MatrixError::NonFinite { row, col });
            }
            if value < 0.0 {
                return Err(MatrixError::NegativeValue { row, col, value });
            }
        }

        Ok(Self {
            rows,
            cols,
            values,
            time_axis: None,
            key_axis: None,
        })
    }

    pub fn with_time_axis(mut self, boundaries: Vec<i64>) -> Result<Self, MatrixError> {
        if boundaries.len() != self.cols + 1 {
            return Err(MatrixError::AxisMismatch {
                axis: "time",
                expected: self.cols + 1,
                actual: boundaries.len(),
            });
        }
        self.time_axis = Some(boundaries);
        Ok(self)
    }

    pub fn with_key_axis(mut self, keys: Vec<String>) -> Result<Self, MatrixError> {
        if keys.len() != self.rows + 1 {
            return Err(MatrixError::AxisMismatch {
                axis: "key",
                expected: self.rows + 1,
                actual: keys.len(),
            });
        }
        self.key_axis = Some(keys);
        Ok(self)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values.get(row * self.cols + col).copied()
    }

    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    /// Start/end time of the bucket range `cols`, if a time axis is attached.
    pub fn time_span(&self, start_col: usize, end_col_excl: usize) -> Option<(i64, i64)> {
        let axis = self.time_axis.as_ref()?;
        Some((*axis.get(start_col)?, *axis.get(end_col_excl)?))
    }

    pub fn key_span(&self, start_row: usize, end_row_excl: usize) -> Option<(&str, &str)> {
        let axis = self.key_axis.as_ref()?;
        Some((axis.get(start_row)?.as_str(), axis.get(end_row_excl)?.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_rows() {
        let err = MetricMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(
            err,
            MatrixError::Ragged {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn rejects_negative_and_nan() {
        assert!(matches!(
            MetricMatrix::from_rows(vec![vec![1.0, -2.0]]),
            Err(MatrixError::NegativeValue { row: 0, col: 1, .. })
        ));
        assert!(matches!(
            MetricMatrix::from_rows(vec![vec![f64::NAN]]),
            Err(MatrixError::NonFinite { row: 0, col: 0 })
        ));
    }

    #[test]
    fn row_major_access() {
        let m = MetricMatrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!((m.rows(), m.cols()), (2, 3));
        assert_eq!(m.get(1, 0), Some(4.0));
        assert_eq!(m.get(2, 0), None);
        assert_eq!(m.max_value(), 6.0);
    }

    #[test]
    fn axes_must_bound_every_cell() {
        let m = MetricMatrix::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        assert!(m.clone().with_time_axis(vec![0, 60]).is_err());

        let m = m
            .with_time_axis(vec![0, 60, 120])
            .unwrap()
            .with_key_axis(vec!["a".into(), "b".into()])
            .unwrap();
        assert_eq!(m.time_span(1, 2), Some((60, 120)));
        assert_eq!(m.key_span(0, 1), Some(("a", "b")));
    }

    #[test]
    fn empty_matrix_is_valid() {
        let m = MetricMatrix::from_rows(Vec::new()).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.max_value(), 0.0);
    }
}
