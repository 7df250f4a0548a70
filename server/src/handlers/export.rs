//! CSV export of the active session.
//!
//! The export carries every source column followed by the scan columns, one
//! line per manifest row in order.

use crate::error::{AppError, Result};
use crate::AppState;
use chrono::DateTime;
use tally_engine::{ManifestSnapshot, Timestamp};

/// Columns appended after the source columns.
pub const SCAN_COLUMNS: [&str; 5] = [
    "QAQC Type",
    "Status",
    "Scan Timestamp",
    "Scan Operator",
    "Shipment Ref",
];

/// A rendered export file.
#[derive(Debug)]
pub struct ExportFile {
    pub filename: String,
    pub body: Vec<u8>,
}

impl ExportFile {
    /// `Content-Disposition` value with an ASCII fallback name and the
    /// exact name as RFC 5987 `filename*`.
    pub fn content_disposition(&self) -> String {
        let fallback: String = self
            .filename
            .chars()
            .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
            .collect();
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(&self.filename)
        )
    }
}

/// Render a snapshot as CSV.
pub fn render_csv(snapshot: &ManifestSnapshot) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header = snapshot
        .columns
        .iter()
        .map(String::as_str)
        .chain(SCAN_COLUMNS);
    writer.write_record(header)?;

    for row in &snapshot.rows {
        let mut record: Vec<String> = (0..snapshot.columns.len())
            .map(|i| row.values.get(i).cloned().flatten().unwrap_or_default())
            .collect();

        let meta = row.scan_meta.as_ref();
        record.push(row.classification.label().to_string());
        record.push(row.status.as_str().to_string());
        record.push(
            meta.map(|m| format_timestamp(m.scanned_at))
                .unwrap_or_default(),
        );
        record.push(meta.map(|m| m.operator.clone()).unwrap_or_default());
        record.push(meta.map(|m| m.shipment_ref.clone()).unwrap_or_default());

        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("failed to flush CSV export: {}", e)))
}

/// Format milliseconds since epoch as `YYYY-MM-DD HH:MM:SS UTC`.
pub fn format_timestamp(millis: Timestamp) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default()
}

/// Name of the export file for an uploaded file name.
pub fn export_filename(source: Option<&str>) -> String {
    let stem = source
        .map(|name| match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        })
        .filter(|stem| !stem.trim().is_empty())
        .unwrap_or("manifest");
    let stem: String = stem
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("scanned_{}.csv", stem)
}

/// Export the active session.
pub async fn handle_export(state: &AppState) -> Result<ExportFile> {
    let snapshot = {
        let session = state.session.read().await;
        session.snapshot()?
    };

    let filename = export_filename(
        snapshot
            .session
            .as_ref()
            .and_then(|info| info.filename.as_deref()),
    );
    let body = render_csv(&snapshot)?;

    tracing::info!(
        filename = %filename,
        rows = snapshot.rows.len(),
        scanned = snapshot.stats.scanned,
        "Manifest exported"
    );

    Ok(ExportFile { filename, body })
}
