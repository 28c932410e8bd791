//! Cancellable page rendering for the interactive view
//!
//! Only one page is on screen at a time. When a render is requested for a
//! different page, every render still in flight for the previous page is
//! aborted. Repeated requests for the same page are left to finish.

use std::sync::Arc;

use image::DynamicImage;
use parking_lot::Mutex;
use tokio::task::AbortHandle;

use super::error::{DocumentError, Result};
use super::traits::DocumentSource;

struct InFlight {
    page: u32,
    generation: u64,
    abort: AbortHandle,
}

/// Renders pages for display, cancelling superseded requests
pub struct ViewRenderer {
    source: Arc<dyn DocumentSource>,
    /// Renders still running; all of them are for the same page
    in_flight: Mutex<Vec<InFlight>>,
    generation: Mutex<u64>,
}

impl ViewRenderer {
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        Self {
            source,
            in_flight: Mutex::new(Vec::new()),
            generation: Mutex::new(0),
        }
    }

    /// Render `page` at `scale`.
    ///
    /// Returns [`DocumentError::Cancelled`] if a render for another page was
    /// issued before this one finished, even if other requests for this page
    /// came in between.
    pub async fn render(&self, page: u32, scale: f64) -> Result<DynamicImage> {
        let source = Arc::clone(&self.source);
        let handle = tokio::spawn(async move { source.render(page, scale).await });

        let generation = {
            let mut counter = self.generation.lock();
            *counter += 1;
            *counter
        };

        {
            let mut in_flight = self.in_flight.lock();
            if in_flight.first().is_some_and(|f| f.page != page) {
                for previous in in_flight.drain(..) {
                    tracing::debug!(
                        cancelled_page = previous.page,
                        requested_page = page,
                        "Cancelling superseded page render"
                    );
                    previous.abort.abort();
                }
            }
            in_flight.push(InFlight {
                page,
                generation,
                abort: handle.abort_handle(),
            });
        }

        let outcome = handle.await;

        {
            self.in_flight.lock().retain(|f| f.generation != generation);
        }

        match outcome {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(DocumentError::Cancelled(page)),
            Err(e) => Err(DocumentError::RenderError(format!(
                "Render task for page {} failed: {}",
                page, e
            ))),
        }
    }

    /// Page currently being rendered, if any
    pub fn pending_page(&self) -> Option<u32> {
        self.in_flight.lock().first().map(|f| f.page)
    }
}
