//! Error types for the Sheetmark engine

use thiserror::Error;

use crate::document::DocumentError;
use crate::fields::FieldType;
use crate::ocr::OcrError;

/// Engine-wide result type
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: u32 },

    /// The engine and the document it extracts from disagree on length
    #[error("Engine has {engine} pages but the document has {document}")]
    PageCountMismatch { engine: u32, document: u32 },

    #[error("{0} is a document-level field")]
    NotPageLevel(FieldType),

    #[error("{0} is a page-level field")]
    NotDocumentLevel(FieldType),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Failures that must stop a batch rather than skip one field
    pub fn is_fatal_to_batch(&self) -> bool {
        match self {
            EngineError::Document(e) => e.is_unrecoverable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_corrupt_documents_abort_batches() {
        assert!(EngineError::from(DocumentError::Corrupt("bad xref".into())).is_fatal_to_batch());
        assert!(!EngineError::from(DocumentError::RenderError("oom".into())).is_fatal_to_batch());
        assert!(!EngineError::from(OcrError::InitializationError("no data".into())).is_fatal_to_batch());
        assert!(!EngineError::PageOutOfRange { page: 9, count: 3 }.is_fatal_to_batch());
        assert!(!EngineError::PageCountMismatch { engine: 3, document: 2 }.is_fatal_to_batch());
    }

    #[test]
    fn test_messages() {
        let err = EngineError::from(DocumentError::Cancelled(4));
        assert_eq!(err.to_string(), "Document error: Render of page 4 cancelled");
        assert_eq!(
            EngineError::NotPageLevel(FieldType::PreparedBy).to_string(),
            "prepared_by is a document-level field"
        );
    }
}
