//! Document source trait
//!
//! The engine never parses documents itself. Rendering and text-layer
//! access sit behind [`DocumentSource`] so any backend (PDF renderer, image
//! stack, test fixture) can drive extraction.

use async_trait::async_trait;
use image::DynamicImage;

use super::error::Result;
use super::types::{TextRun, Viewport};

/// Page access for a loaded document. Pages are 1-indexed.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Number of pages
    fn page_count(&self) -> u32;

    /// Page layout at a scale factor
    async fn viewport(&self, page: u32, scale: f64) -> Result<Viewport>;

    /// Rasterize a page at a scale factor
    async fn render(&self, page: u32, scale: f64) -> Result<DynamicImage>;

    /// Positioned text runs in document space.
    ///
    /// `None` when the page has no text layer (e.g. a scan).
    async fn text_runs(&self, page: u32) -> Result<Option<Vec<TextRun>>>;
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use image::{Rgb, RgbImage};

    use super::*;
    use crate::document::DocumentError;

    /// Scripted in-memory document
    #[derive(Default)]
    pub struct MockSource {
        pub pages: u32,
        /// Page size in points
        pub size: (f64, f64),
        pub runs: HashMap<u32, Vec<TextRun>>,
        pub failing_pages: HashSet<u32>,
        pub corrupt_pages: HashSet<u32>,
        /// Pages whose text layer cannot be read
        pub text_failing_pages: HashSet<u32>,
        pub render_delay: Option<Duration>,
        pub renders: AtomicUsize,
        pub text_reads: AtomicUsize,
    }

    impl MockSource {
        pub fn new(pages: u32) -> Self {
            Self {
                pages,
                size: (200.0, 100.0),
                ..Default::default()
            }
        }

        pub fn with_runs(mut self, page: u32, runs: Vec<TextRun>) -> Self {
            self.runs.insert(page, runs);
            self
        }

        pub fn renders(&self) -> usize {
            self.renders.load(Ordering::SeqCst)
        }

        fn check(&self, page: u32) -> Result<()> {
            if page == 0 || page > self.pages {
                return Err(DocumentError::PageOutOfRange {
                    page,
                    count: self.pages,
                });
            }
            if self.corrupt_pages.contains(&page) {
                return Err(DocumentError::Corrupt(format!("xref broken at page {}", page)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DocumentSource for MockSource {
        fn page_count(&self) -> u32 {
            self.pages
        }

        async fn viewport(&self, page: u32, scale: f64) -> Result<Viewport> {
            self.check(page)?;
            Ok(Viewport::for_page(self.size.0, self.size.1, scale))
        }

        async fn render(&self, page: u32, scale: f64) -> Result<DynamicImage> {
            self.check(page)?;
            if let Some(delay) = self.render_delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing_pages.contains(&page) {
                return Err(DocumentError::RenderError(format!("page {} failed", page)));
            }
            self.renders.fetch_add(1, Ordering::SeqCst);
            let width = (self.size.0 * scale).round().max(1.0) as u32;
            let height = (self.size.1 * scale).round().max(1.0) as u32;
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                width,
                height,
                Rgb([250, 250, 250]),
            )))
        }

        async fn text_runs(&self, page: u32) -> Result<Option<Vec<TextRun>>> {
            self.check(page)?;
            self.text_reads.fetch_add(1, Ordering::SeqCst);
            if self.text_failing_pages.contains(&page) {
                return Err(DocumentError::TextExtractionError(format!("page {} has no readable text", page)));
            }
            Ok(self.runs.get(&page).cloned())
        }
    }
}
