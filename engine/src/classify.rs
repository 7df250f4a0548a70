//! Row classification from QAQC and CRM column values.
//!
//! Classification is presence based: any non-blank QAQC value marks the row as
//! a control sample, whatever the text says. Keyword matching belongs to the
//! column suggestion in the configuration UI, never here.

use crate::dataset::non_blank;
use serde::{Deserialize, Serialize};

/// Display label for rows without a QAQC value.
pub const NORMAL_SAMPLE_LABEL: &str = "Normal Sample";

/// Semantic kind of a manifest row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Classification {
    /// A regular field sample.
    NormalSample,
    /// A quality control sample (standard, blank, duplicate, ...).
    ControlSample {
        /// Verbatim QAQC value, refined by the CRM value when present.
        subtype: String,
    },
}

impl Classification {
    /// Classify a row from its raw QAQC and CRM cells.
    ///
    /// Never fails: absent or blank QAQC text is a normal sample.
    pub fn from_cells(qaqc: Option<&str>, crm: Option<&str>) -> Self {
        match non_blank(qaqc) {
            None => Classification::NormalSample,
            Some(qaqc) => {
                let subtype = match non_blank(crm) {
                    Some(crm) => format!("{} - {}", qaqc, crm),
                    None => qaqc.to_string(),
                };
                Classification::ControlSample { subtype }
            }
        }
    }

    /// Check if this is a control sample.
    pub fn is_control(&self) -> bool {
        matches!(self, Classification::ControlSample { .. })
    }

    /// Human readable label.
    pub fn label(&self) -> &str {
        match self {
            Classification::NormalSample => NORMAL_SAMPLE_LABEL,
            Classification::ControlSample { subtype } => subtype,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
