//! Manifest - the ordered set of expected sample rows.
//!
//! A manifest is built once from a [`Dataset`] and a [`ColumnMapping`]. Row
//! orders are dense and 0-based in load order and are never renumbered.
//! Sample ids are unique: the first occurrence in the source wins and later
//! duplicates are dropped and reported.

use crate::dataset::{clean_sample_id, Dataset};
use crate::{error::Result, Classification, Error, RowOrder, SampleId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which dataset columns carry the sample id, QAQC type and CRM value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub sample_column: String,
    #[serde(default)]
    pub qaqc_column: Option<String>,
    #[serde(default)]
    pub crm_column: Option<String>,
}

impl ColumnMapping {
    /// Map only the sample column.
    pub fn new(sample_column: impl Into<String>) -> Self {
        Self {
            sample_column: sample_column.into(),
            qaqc_column: None,
            crm_column: None,
        }
    }

    /// Map a QAQC column.
    pub fn with_qaqc(mut self, column: impl Into<String>) -> Self {
        self.qaqc_column = Some(column.into());
        self
    }

    /// Map a CRM column.
    pub fn with_crm(mut self, column: impl Into<String>) -> Self {
        self.crm_column = Some(column.into());
        self
    }
}

/// Scan status of a manifest row.
///
/// `Pending` moves to `Scanned` or `Omitted`. Nothing moves back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Scanned,
    Omitted,
}

impl ScanStatus {
    /// Lowercase name used in exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Scanned => "scanned",
            ScanStatus::Omitted => "omitted",
        }
    }
}

/// Who scanned a row, for which shipment, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanMeta {
    pub operator: String,
    pub shipment_ref: String,
    /// Milliseconds since epoch
    pub scanned_at: Timestamp,
}

/// A single expected sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRow {
    pub sample_id: SampleId,
    pub classification: Classification,
    pub order: RowOrder,
    pub status: ScanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_meta: Option<ScanMeta>,
    /// Source record, aligned with [`Manifest::columns`]
    pub values: Vec<Option<String>>,
}

impl ManifestRow {
    /// Check if the row still waits for a scan.
    pub fn is_pending(&self) -> bool {
        self.status == ScanStatus::Pending
    }

    /// Check if the row has been scanned.
    pub fn is_scanned(&self) -> bool {
        self.status == ScanStatus::Scanned
    }

    /// Check if the row was skipped by resequencing.
    pub fn is_omitted(&self) -> bool {
        self.status == ScanStatus::Omitted
    }

    /// Record a successful scan. Only the reconciler calls this.
    pub(crate) fn mark_scanned(&mut self, meta: ScanMeta) {
        self.status = ScanStatus::Scanned;
        self.scan_meta = Some(meta);
    }

    /// Skip the row. Only the reconciler calls this.
    pub(crate) fn mark_omitted(&mut self) {
        self.status = ScanStatus::Omitted;
    }
}

/// What happened while building a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Rows in the manifest
    pub total_rows: usize,
    /// Source rows dropped because their sample id was already present
    pub duplicate_ids: Vec<SampleId>,
    /// Source rows dropped because they had no sample id
    pub blank_rows: usize,
}

/// The ordered collection of expected rows, indexed by sample id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    columns: Vec<String>,
    mapping: ColumnMapping,
    rows: Vec<ManifestRow>,
    index: HashMap<SampleId, RowOrder>,
}

impl Manifest {
    /// Build a manifest from a dataset and a column mapping.
    ///
    /// Fails with [`Error::InvalidMapping`] when the sample column is not
    /// mapped or not present, or when no row carries a sample id. Optional
    /// columns that are not present are treated as unmapped.
    pub fn build(dataset: &Dataset, mapping: &ColumnMapping) -> Result<(Self, LoadReport)> {
        if mapping.sample_column.trim().is_empty() {
            return Err(Error::InvalidMapping("sample column is not mapped".to_string()));
        }

        let sample_idx = dataset.column_index(&mapping.sample_column).ok_or_else(|| {
            Error::InvalidMapping(format!(
                "sample column '{}' not found",
                mapping.sample_column.trim()
            ))
        })?;
        let qaqc_idx = mapping
            .qaqc_column
            .as_deref()
            .and_then(|c| dataset.column_index(c));
        let crm_idx = mapping
            .crm_column
            .as_deref()
            .and_then(|c| dataset.column_index(c));

        // Keep only the columns that actually resolved
        let mapping = ColumnMapping {
            sample_column: dataset.columns[sample_idx].clone(),
            qaqc_column: qaqc_idx.map(|i| dataset.columns[i].clone()),
            crm_column: crm_idx.map(|i| dataset.columns[i].clone()),
        };

        let mut rows = Vec::with_capacity(dataset.rows.len());
        let mut index = HashMap::with_capacity(dataset.rows.len());
        let mut report = LoadReport::default();

        for values in &dataset.rows {
            let cell = move |i: Option<usize>| {
                i.and_then(|i| values.get(i))
                    .and_then(|c| c.as_deref())
            };

            let Some(sample_id) = clean_sample_id(cell(Some(sample_idx))) else {
                report.blank_rows += 1;
                continue;
            };

            if index.contains_key(&sample_id) {
                report.duplicate_ids.push(sample_id);
                continue;
            }

            let order = rows.len();
            index.insert(sample_id.clone(), order);
            rows.push(ManifestRow {
                sample_id,
                classification: Classification::from_cells(cell(qaqc_idx), cell(crm_idx)),
                order,
                status: ScanStatus::Pending,
                scan_meta: None,
                values: values.clone(),
            });
        }

        if rows.is_empty() {
            return Err(Error::InvalidMapping(format!(
                "no sample ids found in column '{}'",
                mapping.sample_column
            )));
        }

        report.total_rows = rows.len();

        Ok((
            Self {
                columns: dataset.columns.clone(),
                mapping,
                rows,
                index,
            },
            report,
        ))
    }

    /// Source column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The mapping as resolved against the dataset.
    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the manifest has no rows. Never true for a built manifest.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get a row by sample id.
    pub fn get(&self, sample_id: &str) -> Option<&ManifestRow> {
        self.index.get(sample_id).map(|&order| &self.rows[order])
    }

    /// Get a row by order.
    pub fn at(&self, order: RowOrder) -> Option<&ManifestRow> {
        self.rows.get(order)
    }

    /// Order of a sample id.
    pub fn order_of(&self, sample_id: &str) -> Option<RowOrder> {
        self.index.get(sample_id).copied()
    }

    /// All rows in order.
    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    pub(crate) fn row_mut(&mut self, order: RowOrder) -> &mut ManifestRow {
        &mut self.rows[order]
    }
}
