//! Dense day-indexed matrix
//!
//! Row-major `f64` storage for user and batch sequences.

use serde::{Deserialize, Deserializer, Serialize};

/// Dense row-major matrix with a fixed column count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct MatrixParts {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl<'de> Deserialize<'de> for DayMatrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let MatrixParts { rows, cols, data } = MatrixParts::deserialize(deserializer)?;
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(serde::de::Error::custom(format!(
                "{} values do not fill a {rows} x {cols} matrix",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }
}

impl DayMatrix {
    /// All-zero matrix of shape `rows x cols`
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Set a cell. Panics on out-of-range indices, like slice indexing.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.rows && col < self.cols, "cell ({row}, {col}) out of range");
        self.data[row * self.cols + col] = value;
    }

    /// One row as a slice. Panics if `row` is out of range.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact(0) panics; a zero-width matrix holds no data
        self.data.chunks_exact(self.cols.max(1))
    }

    /// Values of one column, top to bottom. Panics if `col` is out of range.
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.data[r * self.cols + col]).collect()
    }

    /// Append all rows of `other` below this matrix.
    ///
    /// Both matrices must have the same column count.
    pub fn append_rows(&mut self, other: &DayMatrix) {
        assert_eq!(self.cols, other.cols, "column count mismatch");
        self.data.extend_from_slice(&other.data);
        self.rows += other.rows;
    }

    /// Rows as nested vectors, for serialization to array-of-arrays JSON
    pub fn to_nested(&self) -> Vec<Vec<f64>> {
        self.iter_rows().map(<[f64]>::to_vec).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_zeros_shape() {
        let m = DayMatrix::zeros(3, 4);
        assert_eq!(m.shape(), (3, 4));
        assert!(m.iter_rows().all(|r| r.iter().all(|v| *v == 0.0)));
    }

    #[test]
    fn test_deserialize_checks_shape() {
        let mut m = DayMatrix::zeros(2, 2);
        m.set(1, 0, 3.0);
        let loaded: DayMatrix = serde_json::from_str(&serde_json::to_string(&m).unwrap()).unwrap();
        assert_eq!(loaded, m);

        let short = r#"{"rows":2,"cols":3,"data":[0.0,1.0]}"#;
        assert!(serde_json::from_str::<DayMatrix>(short).is_err());
    }

    #[test]
    fn test_set_and_get() {
        let mut m = DayMatrix::zeros(2, 3);
        m.set(1, 2, 5.0);
        assert_eq!(m.get(1, 2), Some(5.0));
        assert_eq!(m.row(1), &[0.0, 0.0, 5.0]);
        assert_eq!(m.column(2), vec![0.0, 5.0]);
        assert_eq!(m.get(2, 0), None);
    }

    #[test]
    #[should_panic]
    fn test_row_out_of_range() {
        DayMatrix::zeros(2, 3).row(2);
    }

    #[test]
    fn test_append_rows() {
        let mut a = DayMatrix::zeros(1, 2);
        a.set(0, 0, 1.0);
        let mut b = DayMatrix::zeros(2, 2);
        b.set(1, 1, 2.0);

        a.append_rows(&b);
        assert_eq!(a.shape(), (3, 2));
        assert_eq!(a.to_nested(), vec![vec![1.0, 0.0], vec![0.0, 0.0], vec![0.0, 2.0]]);
    }

    #[test]
    #[should_panic(expected = "column count mismatch")]
    fn test_append_rows_mismatch() {
        let mut a = DayMatrix::zeros(1, 2);
        a.append_rows(&DayMatrix::zeros(1, 3));
    }
}
