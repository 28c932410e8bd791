//! Sheetmark
//!
//! Region template and extraction engine for multi-page drawing sets. Users
//! mark labeled rectangles on pages; the engine decides, for every page and
//! field, which rectangle governs extraction and turns it into a cleaned
//! text value.
//!
//! # Modules
//!
//! - `fields`: the field catalogue and extraction profiles
//! - `region`: normalized geometry and the per-page region store
//! - `template`: templates, master pages, exclusions, ghost derivation
//! - `cache`: extracted-value cache and document-level values
//! - `history`: bounded undo/redo
//! - `clipboard`: selection and group-relative copy/paste
//! - `engine`: the engine object that owns all of the above
//! - `document`: the document source collaborator and view rendering
//! - `ocr`: the OCR engine collaborator and the serialized OCR service
//! - `extract`: the extraction pipeline
//! - `export`: the canonical export record

pub mod cache;
pub mod clipboard;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod export;
pub mod extract;
pub mod fields;
pub mod history;
pub mod ocr;
pub mod region;
pub mod telemetry;
pub mod template;

pub use config::Config;
pub use engine::{BatchReport, Engine, EngineState};
pub use error::{EngineError, Result};
pub use extract::ExtractionPipeline;
pub use fields::{FieldProfile, FieldType};
