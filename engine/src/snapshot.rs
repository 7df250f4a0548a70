//! Snapshot of a scanning session.
//!
//! Snapshots are the bridge between the in-memory [`Reconciler`] and every
//! collaborator that renders, exports or stores state. Rows are kept in
//! manifest order so serialization is deterministic.

use crate::session::SessionInfo;
use crate::{
    error::Result, ColumnMapping, Error, ManifestRow, Reconciler, SampleId, ScanStatus, Stats,
};
use serde::{Deserialize, Serialize};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time copy of a manifest and its scan state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Session the snapshot was taken from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionInfo>,
    /// Source column names
    pub columns: Vec<String>,
    /// Mapping as resolved against the source columns
    pub mapping: ColumnMapping,
    /// Every row, in manifest order
    pub rows: Vec<ManifestRow>,
    pub stats: Stats,
    /// Sample id of the next expected row
    pub next_expected: Option<SampleId>,
}

impl ManifestSnapshot {
    /// Capture the current state of a reconciler.
    pub fn capture(reconciler: &Reconciler, session: Option<SessionInfo>) -> Self {
        let manifest = reconciler.manifest();
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            session,
            columns: manifest.columns().to_vec(),
            mapping: manifest.mapping().clone(),
            rows: manifest.rows().to_vec(),
            stats: reconciler.stats(),
            next_expected: reconciler.next_expected().map(|row| row.sample_id.clone()),
        }
    }

    /// Rows with the given status, in order.
    pub fn rows_with_status(&self, status: ScanStatus) -> impl Iterator<Item = &ManifestRow> {
        self.rows.iter().filter(move |row| row.status == status)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dataset;

    fn reconciler() -> Reconciler {
        let dataset = Dataset::new(
            vec!["Sample".into(), "Depth".into()],
            vec![
                vec![Some("A".into()), Some("2".into())],
                vec![Some("B".into()), Some("4".into())],
                vec![Some("C".into()), None],
            ],
        );
        Reconciler::load(&dataset, &ColumnMapping::new("Sample"))
            .unwrap()
            .0
    }

    #[test]
    fn capture_keeps_order_and_values() {
        let mut r = reconciler();
        r.record_scan("B", "Ana", "SHP-1", 1000);

        let snapshot = ManifestSnapshot::capture(&r, None);
        assert_eq!(snapshot.format_version, SNAPSHOT_FORMAT_VERSION);
        assert_eq!(snapshot.columns, vec!["Sample", "Depth"]);
        let ids: Vec<_> = snapshot.rows.iter().map(|r| r.sample_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(snapshot.rows[1].values[1].as_deref(), Some("4"));
        assert_eq!(snapshot.stats.scanned, 1);
        assert_eq!(snapshot.next_expected.as_deref(), Some("A"));
    }

    #[test]
    fn rows_by_status() {
        let mut r = reconciler();
        r.set_start_index("B").unwrap();
        r.record_scan("C", "Ana", "SHP-1", 1000);

        let snapshot = ManifestSnapshot::capture(&r, None);
        let omitted: Vec<_> = snapshot
            .rows_with_status(ScanStatus::Omitted)
            .map(|r| r.sample_id.as_str())
            .collect();
        assert_eq!(omitted, vec!["A"]);
        assert_eq!(snapshot.rows_with_status(ScanStatus::Pending).count(), 1);
    }

    #[test]
    fn json_roundtrip() {
        let mut r = reconciler();
        r.record_scan("A", "Ana", "SHP-1", 1000);
        let snapshot = ManifestSnapshot::capture(&r, None);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"formatVersion\":1"));
        assert!(json.contains("\"nextExpected\":\"B\""));

        let restored = ManifestSnapshot::from_json(&json).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn future_format_rejected() {
        let mut snapshot = ManifestSnapshot::capture(&reconciler(), None);
        snapshot.format_version = SNAPSHOT_FORMAT_VERSION + 1;
        let json = snapshot.to_json_pretty().unwrap();

        let result = ManifestSnapshot::from_json(&json);
        assert!(matches!(result, Err(Error::InvalidSnapshot(_))));
    }

    #[test]
    fn invalid_json_rejected() {
        let result = ManifestSnapshot::from_json("{not json");
        assert!(matches!(result, Err(Error::InvalidSnapshot(_))));
    }
}
