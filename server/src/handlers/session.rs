//! Session handlers - status, progress, snapshot and reset.

use crate::error::Result;
use crate::websocket::ServerMessage;
use crate::AppState;
use serde::Serialize;
use tally_engine::{ManifestRow, ManifestSnapshot, Phase, SessionInfo, Stats};

/// Progress of the active session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: Stats,
    pub next_expected: Option<ManifestRow>,
}

/// Where the session is in its lifecycle.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
    /// Live-feed observers currently connected
    pub viewers: usize,
}

/// Response for a reset.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub status: &'static str,
    pub previous_phase: Phase,
}

/// Progress counters and next expected row.
pub async fn handle_stats(state: &AppState) -> Result<StatsResponse> {
    let session = state.session.read().await;
    let stats = session.stats()?;

    Ok(StatsResponse {
        stats,
        next_expected: session
            .reconciler()
            .and_then(|r| r.next_expected())
            .cloned(),
    })
}

/// Lifecycle status; never fails.
pub async fn handle_status(state: &AppState) -> StatusResponse {
    let session = state.session.read().await;

    StatusResponse {
        phase: session.phase(),
        filename: session.filename().map(str::to_string),
        session: session.info().cloned(),
        stats: session.reconciler().map(|r| r.stats()),
        viewers: state.conn_manager.viewer_count(),
    }
}

/// Full snapshot of the active session.
pub async fn handle_snapshot(state: &AppState) -> Result<ManifestSnapshot> {
    let session = state.session.read().await;
    Ok(session.snapshot()?)
}

/// Discard the session and any held dataset.
pub async fn handle_reset(state: &AppState) -> ResetResponse {
    let previous_phase = {
        let mut session = state.session.write().await;
        let previous_phase = session.reset();
        state.conn_manager.broadcast(ServerMessage::SessionReset);
        previous_phase
    };

    tracing::info!(previous_phase = ?previous_phase, "Session reset");

    ResetResponse {
        status: "reset",
        previous_phase,
    }
}
