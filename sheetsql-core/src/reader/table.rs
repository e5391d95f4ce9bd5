//! Rectangular sheet matrix and the header/data table built from it

use crate::normalize::normalize_header;
use std::collections::BTreeMap;

/// A cell as read from sheet XML: 0-based column and its resolved text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCell {
    pub col: u32,
    pub value: String,
}

impl RawCell {
    pub fn new(col: u32, value: impl Into<String>) -> Self {
        Self {
            col,
            value: value.into(),
        }
    }
}

/// All rows of a sheet, each padded to the widest row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetMatrix {
    rows: Vec<Vec<String>>,
    width: usize,
}

impl SheetMatrix {
    /// Build the matrix from parsed rows in document order.
    ///
    /// Within a row a repeated column keeps the last value.
    pub fn from_rows(rows: Vec<Vec<RawCell>>) -> Self {
        let mut max_col: Option<u32> = None;
        let mut sparse = Vec::with_capacity(rows.len());

        for row in rows {
            let mut by_col = BTreeMap::new();
            for cell in row {
                max_col = Some(max_col.map_or(cell.col, |m| m.max(cell.col)));
                by_col.insert(cell.col, cell.value);
            }
            sparse.push(by_col);
        }

        let width = max_col.map_or(0, |m| m as usize + 1);
        let rows = sparse
            .into_iter()
            .map(|mut by_col| {
                (0..width)
                    .map(|col| by_col.remove(&(col as u32)).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self { rows, width }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Split off the header row and keep the data rows that hold any text
    pub fn into_table(self) -> SheetTable {
        let mut rows = self.rows.into_iter();
        let headers = match rows.next() {
            Some(header_row) => header_row.iter().map(|h| normalize_header(h)).collect(),
            None => return SheetTable::default(),
        };

        let rows = rows
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.trim().to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();

        SheetTable { headers, rows }
    }
}

/// Normalized headers plus trimmed, non-blank data rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
