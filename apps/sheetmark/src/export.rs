//! Export record
//!
//! Read-only view of the extracted values:
//!
//! ```json
//! {
//!   "document": { "prepared_by": "J. Smith", "project_id": { "error": "No value could be extracted" } },
//!   "sheets": [ { "page": 1, "sheet_id": "A-101", ... } ]
//! }
//! ```
//!
//! Every field of the catalogue is present. Values are trimmed, and a field
//! with no value (never extracted, or extracted to nothing) carries an error
//! marker instead of being left out.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::{DocumentValues, PageCache};
use crate::error::Result;
use crate::fields::FieldType;

/// Marker text for fields without a value
pub const MISSING_VALUE: &str = "No value could be extracted";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Value(String),
    Missing { error: String },
}

impl FieldValue {
    pub fn from_extracted(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => FieldValue::Value(v.to_string()),
            _ => FieldValue::Missing {
                error: MISSING_VALUE.to_string(),
            },
        }
    }

    pub fn as_value(&self) -> Option<&str> {
        match self {
            FieldValue::Value(v) => Some(v),
            FieldValue::Missing { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetRecord {
    pub page: u32,
    #[serde(flatten)]
    pub fields: BTreeMap<FieldType, FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionRecord {
    pub document: BTreeMap<FieldType, FieldValue>,
    /// One entry per page, in page order
    pub sheets: Vec<SheetRecord>,
}

impl ExtractionRecord {
    pub fn build(page_count: u32, cache: &PageCache, documents: &DocumentValues) -> Self {
        let document = FieldType::DOCUMENT
            .iter()
            .map(|&field| (field, FieldValue::from_extracted(documents.get(field))))
            .collect();

        let sheets = (1..=page_count)
            .map(|page| SheetRecord {
                page,
                fields: FieldType::PAGE
                    .iter()
                    .map(|&field| (field, FieldValue::from_extracted(cache.get(page, field))))
                    .collect(),
            })
            .collect();

        Self { document, sheets }
    }

    pub fn sheet(&self, page: u32) -> Option<&SheetRecord> {
        self.sheets.iter().find(|s| s.page == page)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
