//! OCR Module
//!
//! Recognition fallback for regions without an exact text layer.
//!
//! - `provider`: the [`OcrEngine`] trait and a Tesseract implementation
//! - `preprocess`: grayscale, contrast stretch, threshold or sharpen
//! - `passes`: per-field pass plans and candidate voting
//! - `service`: the serialized queue every recognition goes through
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sheetmark::ocr::{OcrService, TesseractEngine};
//!
//! let service = OcrService::from_config(Arc::new(TesseractEngine::default()), &config.extraction);
//! let outcome = service.recognize_best(&png, FieldProfile::Date).await?;
//! ```

mod passes;
mod preprocess;
mod provider;
mod service;
mod types;

pub use passes::{plan, score, select_best, OcrPass, DATE_WHITELIST, IDENTIFIER_WHITELIST};
pub use preprocess::{adaptive_threshold, encode_png, preprocess, stretch_contrast};
pub use provider::{OcrEngine, TesseractEngine};
pub use service::{OcrService, PassOutcome};
pub use types::{OcrError, OcrParams, OcrResult, PageSegMode};

#[cfg(test)]
pub(crate) use provider::mock;
