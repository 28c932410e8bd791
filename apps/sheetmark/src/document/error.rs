//! Document source error types

use thiserror::Error;

/// Errors raised by a document source
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Page number outside `1..=page_count`
    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: u32 },

    /// Failed to rasterize a page
    #[error("Render error: {0}")]
    RenderError(String),

    /// Failed to read the positioned text layer
    #[error("Text extraction error: {0}")]
    TextExtractionError(String),

    /// The document itself is unreadable; nothing more can be extracted
    #[error("Corrupt document: {0}")]
    Corrupt(String),

    /// A render was superseded by a request for another page
    #[error("Render of page {0} cancelled")]
    Cancelled(u32),

    /// Image processing error
    #[error("Image error: {0}")]
    ImageError(String),
}

impl DocumentError {
    /// Failures after which no further page of the document can be read
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, DocumentError::Corrupt(_))
    }
}

/// Result type alias for document operations
pub type Result<T> = std::result::Result<T, DocumentError>;

impl From<image::ImageError> for DocumentError {
    fn from(err: image::ImageError) -> Self {
        DocumentError::ImageError(err.to_string())
    }
}
