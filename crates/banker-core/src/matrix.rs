//! Fixed-size two-dimensional storage.
//!
//! A [`Matrix`] holds `rows * cols` values in a single row-major `Vec`. The
//! dimensions are fixed when the matrix is built; there is no API to grow or
//! shrink it. Index arithmetic stays private to this module so callers only
//! ever address cells by `(row, col)`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Matrix
// ---------------------------------------------------------------------------

/// Owned, bounds-checked `rows x cols` grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T: Clone> Matrix<T> {
    /// Create a matrix with every cell set to `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            cells: vec![value; rows * cols],
        }
    }

    /// Copy the matrix out as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        self.rows().map(<[T]>::to_vec).collect()
    }
}

/// The first row passed to [`Matrix::from_rows`] whose length differs from
/// the requested column count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaggedRow {
    /// Index of the offending row.
    pub row: usize,
    /// Its actual length.
    pub len: usize,
}

impl<T> Matrix<T> {
    /// Build a matrix from nested rows, each of which must be exactly `cols`
    /// long.
    ///
    /// An empty `rows` vector produces a `0 x cols` matrix.
    pub fn from_rows(rows: Vec<Vec<T>>, cols: usize) -> Result<Self, RaggedRow> {
        let row_count = rows.len();
        let mut cells = Vec::with_capacity(row_count * cols);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(RaggedRow {
                    row: index,
                    len: row.len(),
                });
            }
            cells.extend(row);
        }
        Ok(Self {
            rows: row_count,
            cols,
            cells,
        })
    }

    /// `(rows, cols)`.
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn col_count(&self) -> usize {
        self.cols
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    /// Shared reference to a cell, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        self.offset(row, col).map(|at| &self.cells[at])
    }

    /// Mutable reference to a cell, or `None` when out of bounds.
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        match self.offset(row, col) {
            Some(at) => Some(&mut self.cells[at]),
            None => None,
        }
    }

    /// A full row as a slice, or `None` when `row` is out of bounds.
    pub fn row(&self, row: usize) -> Option<&[T]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        Some(&self.cells[start..start + self.cols])
    }

    /// Iterate rows in index order.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.rows).map(move |r| {
            let start = r * self.cols;
            &self.cells[start..start + self.cols]
        })
    }

    /// Iterate a single column top to bottom.
    ///
    /// Yields nothing when `col` is out of bounds.
    pub fn column(&self, col: usize) -> impl Iterator<Item = &T> + '_ {
        let valid = col < self.cols;
        (0..self.rows)
            .filter(move |_| valid)
            .map(move |r| &self.cells[r * self.cols + col])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
