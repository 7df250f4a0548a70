//! Session routes: upload, configuration, scanning and export.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tally_engine::{Confirmation, CursorResult, ManifestSnapshot};

use crate::error::Result;
use crate::handlers::{
    handle_analyze_headers, handle_configure, handle_confirm, handle_export, handle_reset,
    handle_scan, handle_snapshot, handle_start_index, handle_stats, handle_status, handle_upload,
    parse_csv, AnalyzeHeadersRequest, AnalyzeHeadersResponse, ConfigureRequest,
    ConfigureResponse, ConfirmRequest, CsvUploadQuery, ResetResponse, ScanRequest,
    StartIndexRequest, StatsResponse, StatusResponse, UploadRequest, UploadResponse,
};
use crate::AppState;

/// Create session routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_handler))
        .route("/upload/csv", post(upload_csv_handler))
        .route("/analyze_headers", post(analyze_headers_handler))
        .route("/configure", post(configure_handler))
        .route("/session", post(confirm_handler))
        .route("/scan", post(scan_handler))
        .route("/start_index", post(start_index_handler))
        .route("/stats", get(stats_handler))
        .route("/status", get(status_handler))
        .route("/get_data", get(snapshot_handler))
        .route("/export", get(export_handler))
        .route("/reset", post(reset_handler))
}

/// POST /upload - Hold a dataset sent as a JSON grid.
async fn upload_handler(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>> {
    let filename = request.filename.clone();
    let response = handle_upload(&state, filename, request.into_sheet()).await?;
    Ok(Json(response))
}

/// POST /upload/csv - Hold a dataset sent as CSV text.
async fn upload_csv_handler(
    State(state): State<AppState>,
    Query(query): Query<CsvUploadQuery>,
    body: String,
) -> Result<Json<UploadResponse>> {
    let sheet = parse_csv(&body)?;
    let response = handle_upload(&state, query.filename, sheet).await?;
    Ok(Json(response))
}

/// POST /analyze_headers - Column names of the held dataset.
async fn analyze_headers_handler(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeHeadersRequest>,
) -> Result<Json<AnalyzeHeadersResponse>> {
    let response = handle_analyze_headers(&state, request).await?;
    Ok(Json(response))
}

/// POST /configure - Build the manifest.
async fn configure_handler(
    State(state): State<AppState>,
    Json(request): Json<ConfigureRequest>,
) -> Result<Json<ConfigureResponse>> {
    let response = handle_configure(&state, request).await?;
    Ok(Json(response))
}

/// POST /session - Confirm operator and shipment, start scanning.
async fn confirm_handler(
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<Confirmation>> {
    let response = handle_confirm(&state, request).await?;
    Ok(Json(response))
}

/// POST /scan - Record a barcode.
async fn scan_handler(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<impl IntoResponse> {
    let response = handle_scan(&state, request).await?;
    Ok((response.status_code(), Json(response)))
}

/// POST /start_index - Resequence scanning.
async fn start_index_handler(
    State(state): State<AppState>,
    Json(request): Json<StartIndexRequest>,
) -> Result<Json<CursorResult>> {
    let response = handle_start_index(&state, request).await?;
    Ok(Json(response))
}

/// GET /stats - Progress counters.
async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let response = handle_stats(&state).await?;
    Ok(Json(response))
}

/// GET /status - Session lifecycle.
async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(handle_status(&state).await)
}

/// GET /get_data - Full snapshot.
async fn snapshot_handler(State(state): State<AppState>) -> Result<Json<ManifestSnapshot>> {
    let response = handle_snapshot(&state).await?;
    Ok(Json(response))
}

/// GET /export - CSV download.
async fn export_handler(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let file = handle_export(&state).await?;
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (header::CONTENT_DISPOSITION, file.content_disposition()),
    ];
    Ok((StatusCode::OK, headers, file.body))
}

/// POST /reset - Discard the session.
async fn reset_handler(State(state): State<AppState>) -> Json<ResetResponse> {
    Json(handle_reset(&state).await)
}
