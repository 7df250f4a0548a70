//! Tabular dataset model.
//!
//! Collaborators turn uploaded files into a [`RawSheet`], a plain grid of
//! optional string cells. The engine never sees file bytes; it only slices the
//! grid into a header and data rows according to a [`TableLayout`].

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};

/// Placeholder values that mark a cell as having no sample identifier.
const BLANK_PLACEHOLDERS: [&str; 3] = ["", "nan", "None"];

/// A grid of cells exactly as a collaborator extracted it from a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSheet {
    pub rows: Vec<Vec<Option<String>>>,
}

/// Where the header and the data start inside a [`RawSheet`].
///
/// Both row numbers are 1-based, the way an operator reads them off a
/// spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableLayout {
    pub header_row: usize,
    pub data_start_row: usize,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            header_row: 1,
            data_start_row: 2,
        }
    }
}

impl TableLayout {
    /// Create a layout, clamping the header row to the first row.
    pub fn new(header_row: usize, data_start_row: usize) -> Self {
        Self {
            header_row: header_row.max(1),
            data_start_row,
        }
    }

    /// Zero-based index of the header row.
    fn header_index(&self) -> usize {
        self.header_row.max(1) - 1
    }

    /// Zero-based index of the first data row.
    fn data_index(&self) -> usize {
        let header = self.header_index();
        if self.data_start_row <= header + 1 {
            header + 1
        } else {
            self.data_start_row - 1
        }
    }
}

/// A header plus data rows, each row padded or truncated to the header width.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawSheet {
    /// Create a sheet from rows of cells.
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Number of rows in the sheet, header included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the sheet has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Normalized column names found on the given 1-based row.
    pub fn headers(&self, header_row: usize) -> Result<Vec<String>> {
        let index = header_row.max(1) - 1;
        let row = self.rows.get(index).ok_or_else(|| {
            Error::InvalidMapping(format!(
                "header row {} is beyond the end of the sheet ({} rows)",
                header_row,
                self.rows.len()
            ))
        })?;

        Ok(row
            .iter()
            .enumerate()
            .map(|(i, cell)| normalize_header(cell.as_deref(), i))
            .collect())
    }

    /// Slice the sheet into a [`Dataset`] using the given layout.
    pub fn table(&self, layout: TableLayout) -> Result<Dataset> {
        let columns = self.headers(layout.header_row)?;
        let width = columns.len();

        let rows = self
            .rows
            .iter()
            .skip(layout.data_index())
            .map(|row| {
                let mut cells: Vec<Option<String>> = row.iter().take(width).cloned().collect();
                cells.resize(width, None);
                cells
            })
            .collect();

        Ok(Dataset { columns, rows })
    }
}

impl Dataset {
    /// Create a dataset from column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// Position of a column by its normalized name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = normalize_header(Some(name), 0);
        self.columns.iter().position(|c| *c == wanted)
    }
}

/// Normalize a header cell: newlines become spaces, whitespace is trimmed.
pub fn normalize_header(cell: Option<&str>, index: usize) -> String {
    match cell.map(|c| c.replace(['\r', '\n'], " ")) {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => format!("Unnamed: {}", index),
    }
}

/// Clean a raw sample id cell, returning `None` for blanks and placeholders.
pub fn clean_sample_id(cell: Option<&str>) -> Option<String> {
    let trimmed = cell?.trim();
    if BLANK_PLACEHOLDERS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Treat whitespace-only cells as absent.
pub(crate) fn non_blank(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|c| !c.is_empty())
}
