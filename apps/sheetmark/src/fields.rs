//! Field catalogue
//!
//! The fixed set of values a user can mark up on a drawing set. Fields are
//! split into document-level fields (one value for the whole document) and
//! page-level fields (one value per sheet). Membership only decides the
//! export shape and whether a field can be templated; extraction mechanics
//! are chosen by the field's [`FieldProfile`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named category of extractable value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    // ============================================
    // Document-level fields
    // ============================================
    /// Author of the drawing set
    PreparedBy,
    /// Project identifier
    ProjectId,

    // ============================================
    // Page-level fields
    // ============================================
    /// Sheet number, e.g. "A-101"
    SheetId,
    /// Sheet title
    Description,
    /// Revision identifier
    IssueId,
    /// Revision date
    Date,
    /// Revision note
    IssueDescription,
}

/// How a field's text is recognized and cleaned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldProfile {
    /// Short alphanumeric codes
    Identifier,
    /// Numeric dates with separators
    Date,
    /// Free-form prose
    FreeText,
}

impl FieldType {
    /// Fields extracted once per document
    pub const DOCUMENT: [FieldType; 2] = [FieldType::PreparedBy, FieldType::ProjectId];

    /// Fields extracted once per page, in export order
    pub const PAGE: [FieldType; 5] = [
        FieldType::SheetId,
        FieldType::Description,
        FieldType::IssueId,
        FieldType::Date,
        FieldType::IssueDescription,
    ];

    /// Every field in catalogue order
    pub const ALL: [FieldType; 7] = [
        FieldType::PreparedBy,
        FieldType::ProjectId,
        FieldType::SheetId,
        FieldType::Description,
        FieldType::IssueId,
        FieldType::Date,
        FieldType::IssueDescription,
    ];

    /// True for fields that take one value per page and may be templated
    pub fn is_page_level(self) -> bool {
        !self.is_document_level()
    }

    pub fn is_document_level(self) -> bool {
        matches!(self, FieldType::PreparedBy | FieldType::ProjectId)
    }

    pub fn profile(self) -> FieldProfile {
        match self {
            FieldType::SheetId | FieldType::IssueId | FieldType::ProjectId => {
                FieldProfile::Identifier
            }
            FieldType::Date => FieldProfile::Date,
            FieldType::PreparedBy | FieldType::Description | FieldType::IssueDescription => {
                FieldProfile::FreeText
            }
        }
    }

    /// Stable position in [`FieldType::ALL`]
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Wire name, identical to the serde representation
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::PreparedBy => "prepared_by",
            FieldType::ProjectId => "project_id",
            FieldType::SheetId => "sheet_id",
            FieldType::Description => "description",
            FieldType::IssueId => "issue_id",
            FieldType::Date => "date",
            FieldType::IssueDescription => "issue_description",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown field name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown field type: {0}")]
pub struct UnknownField(pub String);

impl FromStr for FieldType {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}
