//! OCR Types
//!
//! Recognition parameters, results, and errors shared by every OCR engine.

use serde::{Deserialize, Serialize};

/// Page segmentation mode, numbered as in Tesseract's `--psm`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    /// Fully automatic page segmentation
    Auto,
    /// Single column of text of variable sizes
    SingleColumn,
    /// Single uniform block of text
    SingleBlock,
    /// Single text line
    SingleLine,
    /// Single word
    SingleWord,
    /// As much text as possible in no particular order
    SparseText,
}

impl PageSegMode {
    pub fn as_tesseract(self) -> u8 {
        match self {
            PageSegMode::Auto => 3,
            PageSegMode::SingleColumn => 4,
            PageSegMode::SingleBlock => 6,
            PageSegMode::SingleLine => 7,
            PageSegMode::SingleWord => 8,
            PageSegMode::SparseText => 11,
        }
    }
}

/// Settings for one recognition call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrParams {
    pub psm: PageSegMode,
    /// Characters the engine may emit; `None` allows everything
    pub whitelist: Option<String>,
    /// Tesseract-style language code, e.g. "eng"
    pub language: String,
}

/// OCR result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrResult {
    /// Recognized text
    pub text: String,
    /// Confidence score (0-1)
    pub confidence: f32,
}

impl OcrResult {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }

    pub fn empty() -> Self {
        Self::new(String::new(), 0.0)
    }
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine failed to initialize: {0}")]
    InitializationError(String),

    #[error("Failed to prepare image: {0}")]
    ImageError(String),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),
}

impl OcrError {
    /// Initialization failures make every later call fail too
    pub fn is_initialization(&self) -> bool {
        matches!(self, OcrError::InitializationError(_))
    }
}

impl From<image::ImageError> for OcrError {
    fn from(err: image::ImageError) -> Self {
        OcrError::ImageError(err.to_string())
    }
}
