//! Configuration handlers - header analysis, column mapping and session
//! confirmation.

use crate::error::Result;
use crate::websocket::ServerMessage;
use crate::AppState;
use serde::{Deserialize, Serialize};
use tally_engine::{ColumnMapping, Confirmation, TableLayout};

use super::now_millis;

/// Header keywords that usually mark the sample id column.
pub const SAMPLE_COLUMN_KEYWORDS: [&str; 6] =
    ["muestras", "muestra", "sample", "id", "código", "codigo"];

/// Header keywords that usually mark the QAQC column.
pub const QAQC_COLUMN_KEYWORDS: [&str; 4] = ["qaqc", "control", "std", "tipo"];

/// Request body for header analysis.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeHeadersRequest {
    /// 1-based row holding the column names
    #[serde(default = "default_header_row")]
    pub header_row: usize,
}

fn default_header_row() -> usize {
    1
}

/// Column names plus best guesses for the mapping.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeHeadersResponse {
    pub columns: Vec<String>,
    pub suggested_sample: Option<String>,
    pub suggested_qaqc: Option<String>,
}

/// Request body for column configuration.
#[derive(Debug, Deserialize)]
pub struct ConfigureRequest {
    #[serde(flatten)]
    pub layout: TableLayout,
    #[serde(flatten)]
    pub mapping: ColumnMapping,
}

/// Response for a column configuration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureResponse {
    pub status: &'static str,
    pub total: usize,
    /// Ids that appeared more than once; only the first row was kept
    pub duplicate_ids: Vec<String>,
    /// Rows dropped for a blank sample id
    pub blank_rows: usize,
}

/// Request body for session confirmation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    #[serde(alias = "user")]
    pub operator: String,
    #[serde(alias = "shipment")]
    pub shipment_ref: String,
}

/// First column whose lowercased name contains one of the keywords.
pub fn suggest_column(columns: &[String], keywords: &[&str]) -> Option<String> {
    columns
        .iter()
        .find(|column| {
            let lower = column.to_lowercase();
            keywords.iter().any(|keyword| lower.contains(keyword))
        })
        .cloned()
}

/// Read the header row of the held dataset.
pub async fn handle_analyze_headers(
    state: &AppState,
    request: AnalyzeHeadersRequest,
) -> Result<AnalyzeHeadersResponse> {
    let session = state.session.read().await;
    let columns = session.headers(request.header_row)?;

    Ok(AnalyzeHeadersResponse {
        suggested_sample: suggest_column(&columns, &SAMPLE_COLUMN_KEYWORDS),
        suggested_qaqc: suggest_column(&columns, &QAQC_COLUMN_KEYWORDS),
        columns,
    })
}

/// Build the manifest from the held dataset.
pub async fn handle_configure(
    state: &AppState,
    request: ConfigureRequest,
) -> Result<ConfigureResponse> {
    let mut session = state.session.write().await;
    let report = session.load_manifest(request.layout, &request.mapping)?;

    tracing::info!(
        sample_column = %request.mapping.sample_column,
        total = report.total_rows,
        duplicates = report.duplicate_ids.len(),
        blank_rows = report.blank_rows,
        "Manifest configured"
    );
    if !report.duplicate_ids.is_empty() {
        tracing::warn!(ids = ?report.duplicate_ids, "Duplicate sample ids in manifest");
    }

    Ok(ConfigureResponse {
        status: "success",
        total: report.total_rows,
        duplicate_ids: report.duplicate_ids,
        blank_rows: report.blank_rows,
    })
}

/// Confirm the session and start scanning.
pub async fn handle_confirm(state: &AppState, request: ConfirmRequest) -> Result<Confirmation> {
    let confirmation = {
        let mut session = state.session.write().await;
        let confirmation = session.confirm(
            uuid::Uuid::new_v4().to_string(),
            &request.operator,
            &request.shipment_ref,
            now_millis(),
        )?;
        state.conn_manager.broadcast(ServerMessage::SessionStarted {
            session: confirmation.session.clone(),
            total: confirmation.total,
            next_expected: confirmation
                .next_expected
                .as_ref()
                .map(|row| row.sample_id.clone()),
        });
        confirmation
    };

    tracing::info!(
        session_id = %confirmation.session.id,
        operator = %confirmation.session.operator,
        shipment_ref = %confirmation.session.shipment_ref,
        total = confirmation.total,
        "Session started"
    );

    Ok(confirmation)
}
