//! Session controller.
//!
//! A [`Session`] walks one scanning session through its lifecycle:
//!
//! ```text
//! Empty --load_dataset--> Configuring --load_manifest, confirm--> Active
//!   ^                                                               |
//!   +-------------------------------- reset ------------------------+
//! ```
//!
//! It is the only owner of the live [`Reconciler`]. The session is a plain
//! value: whoever serves the external interface owns it and serializes access
//! to it.

use crate::dataset::{RawSheet, TableLayout};
use crate::{
    error::Result, ColumnMapping, CursorResult, Error, LoadReport, ManifestRow, ManifestSnapshot,
    Reconciler, ScanOutcome, Stats, Timestamp,
};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Empty,
    Configuring,
    Active,
}

/// Metadata of a confirmed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub operator: String,
    pub shipment_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Milliseconds since epoch
    pub started_at: Timestamp,
}

/// Result of confirming a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub session: SessionInfo,
    pub total: usize,
    pub next_expected: Option<ManifestRow>,
}

/// A raw dataset waiting for its layout and column mapping.
#[derive(Debug, Clone)]
struct Upload {
    filename: Option<String>,
    sheet: RawSheet,
}

#[derive(Debug, Clone, Default)]
enum State {
    #[default]
    Empty,
    Configuring {
        upload: Upload,
        staged: Option<Reconciler>,
    },
    Active {
        info: SessionInfo,
        reconciler: Reconciler,
    },
}

/// The single scanning session of a process.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: State,
}

impl Session {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        match self.state {
            State::Empty => Phase::Empty,
            State::Configuring { .. } => Phase::Configuring,
            State::Active { .. } => Phase::Active,
        }
    }

    /// Metadata of the active session.
    pub fn info(&self) -> Option<&SessionInfo> {
        match &self.state {
            State::Active { info, .. } => Some(info),
            _ => None,
        }
    }

    /// The live reconciler of the active session.
    pub fn reconciler(&self) -> Option<&Reconciler> {
        match &self.state {
            State::Active { reconciler, .. } => Some(reconciler),
            _ => None,
        }
    }

    /// Name of the uploaded file, in any phase that has one.
    pub fn filename(&self) -> Option<&str> {
        match &self.state {
            State::Empty => None,
            State::Configuring { upload, .. } => upload.filename.as_deref(),
            State::Active { info, .. } => info.filename.as_deref(),
        }
    }

    /// Hold a raw dataset for configuration.
    ///
    /// Replaces any dataset already being configured. An active session must
    /// be reset first. Returns the number of rows in the sheet.
    pub fn load_dataset(&mut self, filename: Option<String>, sheet: RawSheet) -> Result<usize> {
        if let State::Active { .. } = self.state {
            return Err(Error::InvalidState(
                "a session is active; reset it before loading a new dataset".to_string(),
            ));
        }
        if sheet.is_empty() {
            return Err(Error::Validation("dataset has no rows".to_string()));
        }

        let rows = sheet.len();
        self.state = State::Configuring {
            upload: Upload { filename, sheet },
            staged: None,
        };
        Ok(rows)
    }

    /// Column names found on the given 1-based header row.
    pub fn headers(&self, header_row: usize) -> Result<Vec<String>> {
        self.upload()?.sheet.headers(header_row)
    }

    /// Build the manifest from the held dataset.
    ///
    /// The manifest is staged until [`Session::confirm`]; loading again
    /// replaces it.
    pub fn load_manifest(
        &mut self,
        layout: TableLayout,
        mapping: &ColumnMapping,
    ) -> Result<LoadReport> {
        let State::Configuring { upload, staged } = &mut self.state else {
            return Err(self.wrong_phase("load a manifest"));
        };

        let dataset = upload.sheet.table(layout)?;
        let (reconciler, report) = Reconciler::load(&dataset, mapping)?;
        *staged = Some(reconciler);
        Ok(report)
    }

    /// Confirm the session metadata and start scanning.
    ///
    /// Requires a staged manifest. Operator and shipment reference are
    /// trimmed and must not be blank.
    pub fn confirm(
        &mut self,
        id: impl Into<String>,
        operator: &str,
        shipment_ref: &str,
        now: Timestamp,
    ) -> Result<Confirmation> {
        match &self.state {
            State::Configuring {
                staged: Some(_), ..
            } => {}
            State::Configuring { .. } => {
                return Err(Error::InvalidState(
                    "no manifest loaded; configure columns first".to_string(),
                ))
            }
            _ => return Err(self.wrong_phase("confirm a session")),
        }

        let operator = required("operator", operator)?;
        let shipment_ref = required("shipment reference", shipment_ref)?;

        let (upload, reconciler) = match std::mem::take(&mut self.state) {
            State::Configuring {
                upload,
                staged: Some(reconciler),
            } => (upload, reconciler),
            other => {
                self.state = other;
                return Err(self.wrong_phase("confirm a session"));
            }
        };

        let info = SessionInfo {
            id: id.into(),
            operator,
            shipment_ref,
            filename: upload.filename,
            started_at: now,
        };
        let confirmation = Confirmation {
            session: info.clone(),
            total: reconciler.stats().total,
            next_expected: reconciler.next_expected().cloned(),
        };

        self.state = State::Active { info, reconciler };
        Ok(confirmation)
    }

    /// Record a scanned barcode.
    ///
    /// Uses the confirmed operator unless `operator` overrides it for this
    /// scan. Blank barcodes are rejected.
    pub fn record_scan(
        &mut self,
        barcode: &str,
        operator: Option<&str>,
        now: Timestamp,
    ) -> Result<ScanOutcome> {
        let barcode = required("barcode", barcode)?;
        let State::Active { info, reconciler } = &mut self.state else {
            return Err(self.wrong_phase("record a scan"));
        };

        let operator = operator
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .unwrap_or(info.operator.as_str());
        Ok(reconciler.record_scan(&barcode, operator, &info.shipment_ref, now))
    }

    /// Resequence scanning to start at the given sample.
    pub fn set_start_index(&mut self, sample_id: &str) -> Result<CursorResult> {
        let State::Active { reconciler, .. } = &mut self.state else {
            return Err(self.wrong_phase("set the start index"));
        };
        reconciler.set_start_index(sample_id)
    }

    /// Progress counters of the active session.
    pub fn stats(&self) -> Result<Stats> {
        self.active_reconciler("read stats").map(Reconciler::stats)
    }

    /// Full snapshot of the active session.
    pub fn snapshot(&self) -> Result<ManifestSnapshot> {
        let State::Active { info, reconciler } = &self.state else {
            return Err(self.wrong_phase("read the manifest"));
        };
        Ok(ManifestSnapshot::capture(reconciler, Some(info.clone())))
    }

    /// Discard everything and return to [`Phase::Empty`].
    ///
    /// Returns the phase the session was in.
    pub fn reset(&mut self) -> Phase {
        let phase = self.phase();
        self.state = State::Empty;
        phase
    }

    fn upload(&self) -> Result<&Upload> {
        match &self.state {
            State::Configuring { upload, .. } => Ok(upload),
            _ => Err(self.wrong_phase("read headers")),
        }
    }

    fn active_reconciler(&self, action: &str) -> Result<&Reconciler> {
        self.reconciler().ok_or_else(|| self.wrong_phase(action))
    }

    fn wrong_phase(&self, action: &str) -> Error {
        let reason = match self.phase() {
            Phase::Empty => "no dataset loaded",
            Phase::Configuring => "session not confirmed",
            Phase::Active => "a session is already active",
        };
        Error::InvalidState(format!("cannot {}: {}", action, reason))
    }
}

/// Trim a required text field, rejecting blanks.
fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}
