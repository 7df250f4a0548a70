//! Scan reconciliation.
//!
//! The [`Reconciler`] owns a [`Manifest`] and every piece of mutable scan
//! state: row statuses, scan metadata, the next-expected cursor and the
//! aggregate counters. It classifies each scanned barcode as a first scan, a
//! duplicate, or an unknown id.
//!
//! ## Guarantees
//!
//! 1. Duplicate and unknown scans never mutate state
//! 2. `scanned + missing + omitted == total` after every operation
//! 3. The cursor always points at the lowest-order pending row, or is
//!    exhausted when no pending row is left
//!
//! The reconciler has no clock. Callers pass the scan timestamp in, so the
//! same inputs always produce the same state.

use crate::dataset::Dataset;
use crate::manifest::{ColumnMapping, LoadReport, Manifest, ManifestRow, ScanMeta, ScanStatus};
use crate::{error::Result, Error, RowOrder, SampleId, Timestamp};
use serde::{Deserialize, Serialize};

/// Aggregate scan progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Rows scanned successfully
    pub scanned: usize,
    /// Rows neither scanned nor omitted
    pub missing: usize,
    /// Rows skipped by resequencing
    pub omitted: usize,
    /// Rows in the manifest, constant for the session
    pub total: usize,
}

/// Result of scanning one barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// First scan of a known row.
    Success {
        row: ManifestRow,
        stats: Stats,
        #[serde(rename = "nextExpected")]
        next_expected: Option<ManifestRow>,
    },
    /// The row was already scanned. Nothing changed.
    Duplicate { row: ManifestRow },
    /// The id is not in the manifest. Nothing changed.
    NotFound {
        #[serde(rename = "sampleId")]
        sample_id: SampleId,
    },
}

impl ScanOutcome {
    /// Check if the scan was recorded.
    pub fn is_success(&self) -> bool {
        matches!(self, ScanOutcome::Success { .. })
    }

    /// Short name of the outcome, as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanOutcome::Success { .. } => "success",
            ScanOutcome::Duplicate { .. } => "duplicate",
            ScanOutcome::NotFound { .. } => "not_found",
        }
    }
}

/// Result of moving the start of the scan sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorResult {
    /// The row scanning is now expected to start from
    pub next_expected: ManifestRow,
    /// Rows that moved from pending to omitted, in order
    pub omitted: Vec<SampleId>,
    pub stats: Stats,
}

/// The scan reconciliation engine for one manifest.
#[derive(Debug, Clone)]
pub struct Reconciler {
    manifest: Manifest,
    /// Lowest-order pending row, `None` once every row is processed
    cursor: Option<RowOrder>,
    scanned_count: usize,
    omitted_count: usize,
}

impl Reconciler {
    /// Build a manifest from a dataset and start reconciling it.
    pub fn load(dataset: &Dataset, mapping: &ColumnMapping) -> Result<(Self, LoadReport)> {
        let (manifest, report) = Manifest::build(dataset, mapping)?;
        Ok((Self::new(manifest), report))
    }

    /// Start reconciling a freshly built manifest.
    pub fn new(manifest: Manifest) -> Self {
        let mut reconciler = Self {
            manifest,
            cursor: Some(0),
            scanned_count: 0,
            omitted_count: 0,
        };
        reconciler.advance_cursor();
        reconciler
    }

    /// The manifest being reconciled.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Get a row by sample id.
    pub fn row(&self, sample_id: &str) -> Option<&ManifestRow> {
        self.manifest.get(sample_id.trim())
    }

    /// Order of the next expected row, `None` when exhausted.
    pub fn cursor(&self) -> Option<RowOrder> {
        self.cursor
    }

    /// The row scanning is expected to continue with.
    pub fn next_expected(&self) -> Option<&ManifestRow> {
        self.cursor.and_then(|order| self.manifest.at(order))
    }

    /// Current progress counters.
    pub fn stats(&self) -> Stats {
        let total = self.manifest.len();
        Stats {
            scanned: self.scanned_count,
            missing: total - self.scanned_count - self.omitted_count,
            omitted: self.omitted_count,
            total,
        }
    }

    /// Reconcile one scanned barcode.
    ///
    /// A pending or omitted row becomes scanned. Omission only shapes the
    /// next-expected narrative; it never blocks a genuine scan.
    pub fn record_scan(
        &mut self,
        sample_id: &str,
        operator: &str,
        shipment_ref: &str,
        timestamp: Timestamp,
    ) -> ScanOutcome {
        let sample_id = sample_id.trim();

        let Some(order) = self.manifest.order_of(sample_id) else {
            return ScanOutcome::NotFound {
                sample_id: sample_id.to_string(),
            };
        };

        let row = self.manifest.row_mut(order);
        match row.status {
            ScanStatus::Scanned => {
                return ScanOutcome::Duplicate { row: row.clone() };
            }
            ScanStatus::Omitted => self.omitted_count -= 1,
            ScanStatus::Pending => {}
        }

        row.mark_scanned(ScanMeta {
            operator: operator.to_string(),
            shipment_ref: shipment_ref.to_string(),
            scanned_at: timestamp,
        });
        let row = row.clone();
        self.scanned_count += 1;
        self.advance_cursor();

        ScanOutcome::Success {
            row,
            stats: self.stats(),
            next_expected: self.next_expected().cloned(),
        }
    }

    /// Make scanning start at the given pending row.
    ///
    /// Every pending row before it becomes omitted. Scanned rows are left
    /// alone and omitted rows stay omitted.
    pub fn set_start_index(&mut self, sample_id: &str) -> Result<CursorResult> {
        let sample_id = sample_id.trim();

        let target = self
            .manifest
            .order_of(sample_id)
            .ok_or_else(|| Error::NotFound(sample_id.to_string()))?;

        if !self.manifest.rows()[target].is_pending() {
            return Err(Error::AlreadyProcessed(sample_id.to_string()));
        }

        let mut omitted = Vec::new();
        for order in 0..target {
            let row = self.manifest.row_mut(order);
            if row.is_pending() {
                row.mark_omitted();
                omitted.push(row.sample_id.clone());
            }
        }
        self.omitted_count += omitted.len();
        self.cursor = Some(target);

        Ok(CursorResult {
            next_expected: self.manifest.rows()[target].clone(),
            omitted,
            stats: self.stats(),
        })
    }

    /// Move the cursor forward to the lowest-order pending row.
    fn advance_cursor(&mut self) {
        let Some(from) = self.cursor else {
            return;
        };

        self.cursor = self.manifest.rows()[from..]
            .iter()
            .find(|row| row.is_pending())
            .map(|row| row.order);
    }
}
