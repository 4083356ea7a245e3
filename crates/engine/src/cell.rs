use serde::{Deserialize, Serialize};
use std::fmt;

/// A single text-valued entry in a sheet.
///
/// Cells are values: an edit builds a new sheet snapshot holding a new cell
/// instead of mutating the old one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    value: String,
}

impl Cell {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// True when the value is blank after trimming whitespace.
    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::new(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::new(value)
    }
}

/// Stable address of a cell within a sheet.
///
/// Rows are counted over the header row followed by the data rows:
/// `row == 0` is the header, `row == n` is data row `n - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Address of a header cell.
    pub fn head(col: usize) -> Self {
        Self { row: 0, col }
    }

    /// Address of a cell in data row `row` (0-indexed over data rows).
    pub fn data(row: usize, col: usize) -> Self {
        Self { row: row + 1, col }
    }

    /// Index into the data rows, or None for the header row.
    pub fn data_row(&self) -> Option<usize> {
        self.row.checked_sub(1)
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}C{}", self.row, self.col)
    }
}
