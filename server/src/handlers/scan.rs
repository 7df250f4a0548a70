//! Scan handlers - barcode scans and start index resequencing.

use crate::error::Result;
use crate::websocket::ServerMessage;
use crate::AppState;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tally_engine::{CursorResult, ManifestRow, ScanOutcome, Stats};

use super::now_millis;

/// Request body for a scan.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub barcode: String,
    /// Overrides the session operator for this scan
    #[serde(default, alias = "user")]
    pub operator: Option<String>,
}

/// Response for a scan, whatever the outcome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    /// "success", "duplicate" or "not_found"
    pub status: &'static str,
    pub barcode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<ManifestRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qaqc_type: Option<String>,
    pub stats: Stats,
    pub next_expected: Option<ManifestRow>,
}

impl ScanResponse {
    /// HTTP status matching the outcome.
    pub fn status_code(&self) -> StatusCode {
        match self.status {
            "duplicate" => StatusCode::CONFLICT,
            "not_found" => StatusCode::NOT_FOUND,
            _ => StatusCode::OK,
        }
    }
}

/// Request body for resequencing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartIndexRequest {
    #[serde(alias = "barcode")]
    pub sample_id: String,
}

/// Record a scanned barcode.
pub async fn handle_scan(state: &AppState, request: ScanRequest) -> Result<ScanResponse> {
    let (outcome, stats, next_expected) = {
        let mut session = state.session.write().await;
        let outcome = session.record_scan(
            &request.barcode,
            request.operator.as_deref(),
            now_millis(),
        )?;
        let stats = session.stats()?;
        let next_expected = session
            .reconciler()
            .and_then(|r| r.next_expected())
            .cloned();

        // Broadcast under the guard so observers see scans in apply order
        state.conn_manager.broadcast(ServerMessage::scan_recorded(
            &outcome,
            stats,
            next_expected.as_ref().map(|row| row.sample_id.clone()),
        ));
        (outcome, stats, next_expected)
    };

    let barcode = request.barcode.trim().to_string();
    match &outcome {
        ScanOutcome::Success { row, .. } => tracing::info!(
            sample_id = %row.sample_id,
            qaqc_type = %row.classification,
            scanned = stats.scanned,
            total = stats.total,
            "Sample scanned"
        ),
        ScanOutcome::Duplicate { row } => tracing::warn!(
            sample_id = %row.sample_id,
            "Duplicate scan"
        ),
        ScanOutcome::NotFound { sample_id } => tracing::warn!(
            sample_id = %sample_id,
            "Scanned sample not in manifest"
        ),
    }

    let status = outcome.as_str();
    let row = match outcome {
        ScanOutcome::Success { row, .. } | ScanOutcome::Duplicate { row } => Some(row),
        ScanOutcome::NotFound { .. } => None,
    };

    Ok(ScanResponse {
        status,
        qaqc_type: row.as_ref().map(|r| r.classification.label().to_string()),
        barcode,
        row,
        stats,
        next_expected,
    })
}

/// Resequence scanning to start at the given sample.
pub async fn handle_start_index(
    state: &AppState,
    request: StartIndexRequest,
) -> Result<CursorResult> {
    let result = {
        let mut session = state.session.write().await;
        let result = session.set_start_index(request.sample_id.trim())?;
        state
            .conn_manager
            .broadcast(ServerMessage::start_index_set(&result));
        result
    };

    tracing::info!(
        next_expected = %result.next_expected.sample_id,
        omitted = result.omitted.len(),
        "Start index set"
    );

    Ok(result)
}
