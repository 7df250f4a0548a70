//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded and use snake_case for field names.

use serde::{Deserialize, Serialize};
use tally_engine::{CursorResult, Phase, SampleId, ScanOutcome, SessionInfo, Stats};

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request the current progress counters.
    Stats {
        /// Request ID for correlating responses
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A session was confirmed and scanning started.
    SessionStarted {
        session: SessionInfo,
        total: usize,
        next_expected: Option<SampleId>,
    },

    /// A barcode was scanned, whatever the outcome.
    ScanRecorded {
        /// "success", "duplicate" or "not_found"
        outcome: String,
        sample_id: SampleId,
        /// Classification label of the matched row
        #[serde(skip_serializing_if = "Option::is_none")]
        qaqc_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        operator: Option<String>,
        stats: Stats,
        next_expected: Option<SampleId>,
    },

    /// Scanning was resequenced to start at a later row.
    StartIndexSet {
        next_expected: SampleId,
        omitted: Vec<SampleId>,
        stats: Stats,
    },

    /// The session was discarded.
    SessionReset,

    /// Response to a stats request.
    Stats {
        phase: Phase,
        #[serde(skip_serializing_if = "Option::is_none")]
        stats: Option<Stats>,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        /// Error description
        message: String,
        /// Request ID from the original request (if applicable)
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>, request_id: Option<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            request_id,
        }
    }

    /// Create a scan notification from a scan outcome.
    ///
    /// `stats` is the session's progress after the scan.
    pub fn scan_recorded(
        outcome: &ScanOutcome,
        stats: Stats,
        next_expected: Option<SampleId>,
    ) -> Self {
        let (sample_id, row) = match outcome {
            ScanOutcome::Success { row, .. } | ScanOutcome::Duplicate { row } => {
                (row.sample_id.clone(), Some(row))
            }
            ScanOutcome::NotFound { sample_id } => (sample_id.clone(), None),
        };

        ServerMessage::ScanRecorded {
            outcome: outcome.as_str().to_string(),
            sample_id,
            qaqc_type: row.map(|r| r.classification.label().to_string()),
            operator: row
                .and_then(|r| r.scan_meta.as_ref())
                .map(|m| m.operator.clone()),
            stats,
            next_expected,
        }
    }

    /// Create a resequence notification.
    pub fn start_index_set(result: &CursorResult) -> Self {
        ServerMessage::StartIndexSet {
            next_expected: result.next_expected.sample_id.clone(),
            omitted: result.omitted.clone(),
            stats: result.stats,
        }
    }
}
