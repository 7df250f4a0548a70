//! Upload handlers - hold a raw dataset for configuration.
//!
//! Spreadsheet decoding happens client side or in a converter: the server
//! accepts either a JSON grid of cells or CSV text and turns it into a
//! [`RawSheet`].

use crate::error::{AppError, Result};
use crate::AppState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_engine::RawSheet;

/// Request body for a JSON grid upload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Name of the original file, used for the export name
    #[serde(default)]
    pub filename: Option<String>,
    /// Rows of cells; strings, numbers, booleans or nulls
    pub rows: Vec<Vec<Value>>,
}

/// Query parameters for a CSV upload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvUploadQuery {
    #[serde(default)]
    pub filename: Option<String>,
}

/// Response for an upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Rows in the sheet, header rows included
    pub rows: usize,
}

impl UploadRequest {
    /// Convert the JSON grid into a sheet.
    pub fn into_sheet(self) -> RawSheet {
        RawSheet::new(
            self.rows
                .iter()
                .map(|row| row.iter().map(cell_text).collect())
                .collect(),
        )
    }
}

/// Text of a JSON cell. Integral floats lose their `.0` the way a
/// spreadsheet displays them.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Some(i.to_string()),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => {
                Some(format!("{}", f as i64))
            }
            _ => Some(n.to_string()),
        },
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Parse CSV text into a sheet. Rows may have different lengths.
pub fn parse_csv(text: &str) -> Result<RawSheet> {
    let text = text.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        None
                    } else {
                        Some(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(RawSheet::new(rows))
}

/// Reject file names that cannot be echoed back in a download header.
pub fn validate_filename(name: &str) -> Result<()> {
    if name.contains(['/', '\\', '"']) || name.chars().any(char::is_control) {
        return Err(AppError::BadRequest(format!(
            "filename must not contain quotes, path separators or control characters: {:?}",
            name
        )));
    }
    Ok(())
}

/// Hold a raw dataset in the session.
pub async fn handle_upload(
    state: &AppState,
    filename: Option<String>,
    sheet: RawSheet,
) -> Result<UploadResponse> {
    if let Some(name) = filename.as_deref() {
        validate_filename(name)?;
    }

    let mut session = state.session.write().await;
    let rows = session.load_dataset(filename.clone(), sheet)?;

    tracing::info!(filename = ?filename, rows, "Dataset loaded");

    Ok(UploadResponse {
        status: "success",
        filename,
        rows,
    })
}
