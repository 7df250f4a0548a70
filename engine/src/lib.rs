//! # Tally Engine
//!
//! A deterministic scan reconciliation engine for physical sample manifests.
//!
//! An operator loads the expected samples from a spreadsheet, maps the
//! columns, and scans barcodes one at a time. For every scan the engine
//! decides whether the barcode is a known sample scanned for the first time, a
//! repeat of an earlier scan, or an unknown id, while keeping a "next
//! expected sample" cursor and progress counters.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of files, network, or clocks
//! - **Deterministic**: Timestamps are passed in; same inputs, same state
//! - **Strict**: Duplicate and unknown scans are reported, never merged,
//!   and never change state
//!
//! ## Core Concepts
//!
//! ### Datasets
//!
//! Collaborators turn files into a [`RawSheet`]. A [`TableLayout`] picks the
//! header row and first data row, producing a [`Dataset`].
//!
//! ### Manifests
//!
//! A [`Manifest`] is built from a dataset and a [`ColumnMapping`]. Each
//! [`ManifestRow`] has a dense `order`, a [`Classification`] derived from its
//! QAQC and CRM cells, and a [`ScanStatus`]:
//!
//! - `Pending` → `Scanned` on a successful scan
//! - `Pending` → `Omitted` when scanning is resequenced past it
//!
//! ### Reconciliation
//!
//! The [`Reconciler`] records scans and returns a [`ScanOutcome`]:
//! - [`ScanOutcome::Success`] - first scan of a known row
//! - [`ScanOutcome::Duplicate`] - row already scanned
//! - [`ScanOutcome::NotFound`] - id not in the manifest
//!
//! ### Sessions
//!
//! A [`Session`] owns the single live reconciler and walks it through
//! `Empty → Configuring → Active`, validating operator and shipment metadata.
//!
//! ## Quick Start
//!
//! ```rust
//! use tally_engine::{ColumnMapping, RawSheet, ScanOutcome, Session, TableLayout};
//!
//! let cell = |v: &str| Some(v.to_string());
//! let sheet = RawSheet::new(vec![
//!     vec![cell("Sample"), cell("QAQC")],
//!     vec![cell("A"), None],
//!     vec![cell("B"), cell("STD")],
//! ]);
//!
//! // 1. Load the raw dataset
//! let mut session = Session::new();
//! session.load_dataset(Some("lot.xlsx".into()), sheet).unwrap();
//!
//! // 2. Map columns and confirm the session
//! let mapping = ColumnMapping::new("Sample").with_qaqc("QAQC");
//! session.load_manifest(TableLayout::default(), &mapping).unwrap();
//! session.confirm("session-1", "Ana", "SHP-001", 1706745600000).unwrap();
//!
//! // 3. Scan
//! let outcome = session.record_scan("B", None, 1706745601000).unwrap();
//! assert!(matches!(outcome, ScanOutcome::Success { .. }));
//!
//! let outcome = session.record_scan("B", None, 1706745602000).unwrap();
//! assert!(matches!(outcome, ScanOutcome::Duplicate { .. }));
//!
//! let stats = session.stats().unwrap();
//! assert_eq!((stats.scanned, stats.missing, stats.total), (1, 1, 2));
//! ```
//!
//! ## Persistence
//!
//! Use [`Session::snapshot`] to obtain a [`ManifestSnapshot`], the canonical
//! serializable shape of a session, for rendering or export.

pub mod classify;
pub mod dataset;
pub mod error;
pub mod manifest;
pub mod reconcile;
pub mod session;
pub mod snapshot;

// Re-export main types at crate root
pub use classify::{Classification, NORMAL_SAMPLE_LABEL};
pub use dataset::{Dataset, RawSheet, TableLayout};
pub use error::Error;
pub use manifest::{ColumnMapping, LoadReport, Manifest, ManifestRow, ScanMeta, ScanStatus};
pub use reconcile::{CursorResult, Reconciler, ScanOutcome, Stats};
pub use session::{Confirmation, Phase, Session, SessionInfo};
pub use snapshot::{ManifestSnapshot, SNAPSHOT_FORMAT_VERSION};

/// Type aliases for clarity
pub type SampleId = String;
pub type RowOrder = usize;
pub type Timestamp = u64;
