//! In-process tests for the session routes.
//!
//! Every test drives the router with `oneshot`; no listener or network.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tally_engine::RawSheet;
use tally_server::config::Config;
use tally_server::websocket::ServerMessage;
use tally_server::{app, AppState};
use tokio::sync::mpsc;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn call(state: &AppState, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn get(state: &AppState, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = call(state, req).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post(state: &AppState, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = call(state, req).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn manifest_rows() -> Value {
    json!([
        ["N", "N° Muestra", "Desde", "Hasta", "QAQC"],
        [1, 85990, 2, 4, null],
        [2, 85991, 4, 6, "STD"],
        [3, 85992, 6, 8, null]
    ])
}

/// Upload, configure and confirm a three row manifest.
async fn active_session() -> AppState {
    let state = AppState::new(Config::default());

    let (status, _) = post(
        &state,
        "/upload",
        json!({"filename": "lot.xlsx", "rows": manifest_rows()}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &state,
        "/configure",
        json!({"sampleColumn": "N° Muestra", "qaqcColumn": "QAQC"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &state,
        "/session",
        json!({"operator": "Ana", "shipmentRef": "SHP-001"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    state
}

// ---------------------------------------------------------------------------
// Setup flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_ok() {
    let state = AppState::new(Config::default());
    let (status, body) = get(&state, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn status_starts_empty() {
    let state = AppState::new(Config::default());
    let (status, body) = get(&state, "/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "empty");
    assert_eq!(body["viewers"], 0);
}

#[tokio::test]
async fn analyze_headers_suggests_columns() {
    let state = AppState::new(Config::default());
    post(&state, "/upload", json!({"rows": manifest_rows()})).await;

    let (status, body) = post(&state, "/analyze_headers", json!({"headerRow": 1})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"][1], "N° Muestra");
    assert_eq!(body["suggestedSample"], "N° Muestra");
    assert_eq!(body["suggestedQaqc"], "QAQC");
}

#[tokio::test]
async fn configure_reports_duplicates_and_blanks() {
    let state = AppState::new(Config::default());
    post(
        &state,
        "/upload",
        json!({"rows": [["Sample"], ["A"], [null], ["A"], ["B"]]}),
    )
    .await;

    let (status, body) = post(&state, "/configure", json!({"sampleColumn": "Sample"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["duplicateIds"], json!(["A"]));
    assert_eq!(body["blankRows"], 1);
}

#[tokio::test]
async fn configure_unknown_column_is_bad_request() {
    let state = AppState::new(Config::default());
    post(&state, "/upload", json!({"rows": manifest_rows()})).await;

    let (status, body) = post(&state, "/configure", json!({"sampleColumn": "Barcode"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_mapping");
}

#[tokio::test]
async fn confirm_requires_operator() {
    let state = AppState::new(Config::default());
    post(&state, "/upload", json!({"rows": manifest_rows()})).await;
    post(&state, "/configure", json!({"sampleColumn": "N° Muestra"})).await;

    let (status, body) = post(
        &state,
        "/session",
        json!({"operator": "  ", "shipmentRef": "SHP-001"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    let (_, body) = get(&state, "/status").await;
    assert_eq!(body["phase"], "configuring");
}

#[tokio::test]
async fn csv_upload_with_header_offset() {
    let state = AppState::new(Config::default());
    let csv = "Shipment report\nLot 12\nSample,QAQC\nA,\nB,STD\n";
    let req = Request::builder()
        .method("POST")
        .uri("/upload/csv?filename=lot.csv")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv))
        .unwrap();
    let (status, _) = call(&state, req).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &state,
        "/configure",
        json!({"headerRow": 3, "dataStartRow": 4, "sampleColumn": "Sample", "qaqcColumn": "QAQC"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scan_before_session_is_rejected() {
    let state = AppState::new(Config::default());
    let (status, body) = post(&state, "/scan", json!({"barcode": "85990"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_state");
}

#[tokio::test]
async fn scan_success_duplicate_and_unknown() {
    let state = active_session().await;

    let (status, body) = post(&state, "/scan", json!({"barcode": "85991"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["qaqcType"], "STD");
    assert_eq!(body["row"]["scanMeta"]["operator"], "Ana");
    assert_eq!(body["stats"]["scanned"], 1);
    assert_eq!(body["nextExpected"]["sampleId"], "85990");

    let (status, body) = post(&state, "/scan", json!({"barcode": "85991"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "duplicate");

    let (status, body) = post(&state, "/scan", json!({"barcode": "99999"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "not_found");
    assert_eq!(body["barcode"], "99999");

    let (_, body) = get(&state, "/stats").await;
    assert_eq!(body["scanned"], 1);
    assert_eq!(body["missing"], 2);
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn scan_operator_override() {
    let state = active_session().await;

    let (_, body) = post(&state, "/scan", json!({"barcode": "85990", "user": "Luis"})).await;
    assert_eq!(body["row"]["scanMeta"]["operator"], "Luis");
    assert_eq!(body["row"]["scanMeta"]["shipmentRef"], "SHP-001");
}

#[tokio::test]
async fn blank_barcode_is_rejected() {
    let state = active_session().await;
    let (status, _) = post(&state, "/scan", json!({"barcode": "   "})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn start_index_omits_earlier_rows() {
    let state = active_session().await;

    let (status, body) = post(&state, "/start_index", json!({"sampleId": "85992"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nextExpected"]["sampleId"], "85992");
    assert_eq!(body["omitted"], json!(["85990", "85991"]));
    assert_eq!(body["stats"]["omitted"], 2);
    assert_eq!(body["stats"]["missing"], 1);

    let (status, body) = post(&state, "/start_index", json!({"sampleId": "85990"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_processed");

    let (status, _) = post(&state, "/start_index", json!({"sampleId": "00000"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Snapshot, export and reset
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_data_returns_snapshot() {
    let state = active_session().await;
    post(&state, "/scan", json!({"barcode": "85990"})).await;

    let (status, body) = get(&state, "/get_data").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["filename"], "lot.xlsx");
    assert_eq!(body["rows"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["rows"][0]["status"], "scanned");
    assert_eq!(body["nextExpected"], "85991");
}

#[tokio::test]
async fn export_is_csv_attachment() {
    let state = active_session().await;
    post(&state, "/scan", json!({"barcode": "85990"})).await;

    let req = Request::builder()
        .uri("/export")
        .body(Body::empty())
        .unwrap();
    let resp = app(state.clone()).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert_eq!(
        disposition,
        "attachment; filename=\"scanned_lot.csv\"; filename*=UTF-8''scanned_lot.csv"
    );

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].ends_with("QAQC,QAQC Type,Status,Scan Timestamp,Scan Operator,Shipment Ref"));
    assert!(lines[1].starts_with("1,85990,2,4,,Normal Sample,scanned,"));
    assert!(lines[1].ends_with(",Ana,SHP-001"));
    assert_eq!(lines[2], "2,85991,4,6,STD,STD,pending,,,");
}

#[tokio::test]
async fn reset_returns_to_empty() {
    let state = active_session().await;

    let (status, body) = post(&state, "/reset", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["previousPhase"], "active");

    let (_, body) = get(&state, "/status").await;
    assert_eq!(body["phase"], "empty");

    let (status, _) = get(&state, "/stats").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_during_active_session_is_rejected() {
    let state = active_session().await;
    let (status, body) = post(&state, "/upload", json!({"rows": manifest_rows()})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_state");
}

// ---------------------------------------------------------------------------
// Download file names
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_rejects_unsafe_filenames() {
    let state = AppState::new(Config::default());

    for name in ["lot\"; x=\"y.xlsx", "lot\n2.xlsx", "../lot.xlsx"] {
        let (status, body) = post(
            &state,
            "/upload",
            json!({"filename": name, "rows": manifest_rows()}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {:?}", name);
        assert_eq!(body["code"], "bad_request");
    }

    let (_, body) = get(&state, "/status").await;
    assert_eq!(body["phase"], "empty");
}

async fn export_disposition(state: &AppState) -> (StatusCode, Option<String>) {
    let req = Request::builder()
        .uri("/export")
        .body(Body::empty())
        .unwrap();
    let resp = app(state.clone()).oneshot(req).await.unwrap();
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    (resp.status(), disposition)
}

async fn confirm_loaded_dataset(state: &AppState) {
    post(
        state,
        "/configure",
        json!({"sampleColumn": "N° Muestra", "qaqcColumn": "QAQC"}),
    )
    .await;
    let (status, _) = post(
        state,
        "/session",
        json!({"operator": "Ana", "shipmentRef": "SHP-001"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn export_header_stays_well_formed() {
    // Non-ASCII names go through the upload route
    let state = AppState::new(Config::default());
    post(
        &state,
        "/upload",
        json!({"filename": "lote envío.xlsx", "rows": manifest_rows()}),
    )
    .await;
    confirm_loaded_dataset(&state).await;

    let (status, disposition) = export_disposition(&state).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        disposition.as_deref(),
        Some("attachment; filename=\"scanned_lote env_o.csv\"; filename*=UTF-8''scanned_lote%20env%C3%ADo.csv")
    );

    // Names loaded straight into the session are sanitized on export
    let state = AppState::new(Config::default());
    let sheet = RawSheet::new(vec![
        vec![Some("N° Muestra".to_string()), Some("QAQC".to_string())],
        vec![Some("85990".to_string()), None],
    ]);
    state
        .session
        .write()
        .await
        .load_dataset(Some("lot\"; x=\"y\n2.xlsx".to_string()), sheet)
        .unwrap();
    confirm_loaded_dataset(&state).await;

    let (status, disposition) = export_disposition(&state).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        disposition.as_deref(),
        Some("attachment; filename=\"scanned_lot_; x=_y_2.csv\"; filename*=UTF-8''scanned_lot_%3B%20x%3D_y_2.csv")
    );
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scans_of_one_barcode_succeed_once() {
    let state = active_session().await;

    let scans: Vec<_> = (0..16)
        .map(|_| {
            let state = state.clone();
            tokio::spawn(async move { post(&state, "/scan", json!({"barcode": "85990"})).await.0 })
        })
        .collect();
    let readers: Vec<_> = (0..8)
        .map(|_| {
            let state = state.clone();
            tokio::spawn(async move { get(&state, "/stats").await.1 })
        })
        .collect();

    let mut successes = 0;
    let mut duplicates = 0;
    for scan in scans {
        match scan.await.unwrap() {
            StatusCode::OK => successes += 1,
            StatusCode::CONFLICT => duplicates += 1,
            other => panic!("unexpected status {}", other),
        }
    }
    assert_eq!((successes, duplicates), (1, 15));

    for reader in readers {
        let body = reader.await.unwrap();
        let count = |field: &str| body[field].as_u64().unwrap();
        assert!(count("scanned") <= 1);
        assert_eq!(
            count("scanned") + count("missing") + count("omitted"),
            count("total")
        );
    }

    let (_, body) = get(&state, "/stats").await;
    assert_eq!(body["scanned"], 1);
    assert_eq!(body["missing"], 2);
    assert_eq!(body["total"], 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn live_feed_sees_scans_in_apply_order() {
    let state = active_session().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.conn_manager.register("wall-display".to_string(), tx);

    let scans: Vec<_> = ["85990", "85991", "85992"]
        .into_iter()
        .map(|barcode| {
            let state = state.clone();
            tokio::spawn(async move { post(&state, "/scan", json!({"barcode": barcode})).await.0 })
        })
        .collect();
    for scan in scans {
        assert_eq!(scan.await.unwrap(), StatusCode::OK);
    }

    let mut scanned = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let ServerMessage::ScanRecorded { stats, .. } = msg {
            scanned.push(stats.scanned);
        }
    }
    assert_eq!(scanned, vec![1, 2, 3]);
}
