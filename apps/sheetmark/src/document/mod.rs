//! Document source abstraction
//!
//! Everything the engine needs from a loaded document: page count, page
//! layout at a scale, rasterized pages, and positioned text runs.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sheetmark::document::{DocumentSource, ViewRenderer};
//!
//! let renderer = ViewRenderer::new(source.clone());
//!
//! // Switching pages quickly cancels the render of the page left behind
//! let image = renderer.render(3, 1.5).await?;
//! ```

mod error;
mod render;
mod traits;
mod types;

pub use error::{DocumentError, Result};
pub use render::ViewRenderer;
pub use traits::DocumentSource;
pub use types::{TextRun, Transform, Viewport};

#[cfg(test)]
pub(crate) use traits::mock;
