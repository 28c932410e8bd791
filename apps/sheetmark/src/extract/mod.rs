//! Extraction Pipeline
//!
//! Turns a resolved region into a cleaned text value:
//!
//! 1. Exact text: runs from the document's text layer anchored inside the
//!    region at the configured view scale.
//! 2. OCR fallback, when exact text is disabled or came back empty: render
//!    the page at a scale chosen from the region's size, crop, preprocess
//!    for the field profile, run the multi-pass recognition and clean the
//!    winning candidate.
//!
//! Pipelines are stateless apart from a small raster cache, so the engine
//! can share one across single-field and batch extraction.

mod cleanup;
mod text_layer;

pub use cleanup::{clean, clean_date, clean_identifier, normalize_whitespace};
pub use text_layer::text_in_region;

use std::num::NonZeroUsize;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use lru::LruCache;
use parking_lot::Mutex;

use crate::config::{ExtractionConfig, OcrTuning};
use crate::document::{DocumentSource, Viewport};
use crate::error::{EngineError, Result};
use crate::fields::FieldType;
use crate::ocr::{encode_png, preprocess, OcrService};
use crate::region::NormRect;

/// Rendered rasters kept for reuse; fields on the same page share one
const RASTER_CACHE_SIZE: usize = 2;

/// How a value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    TextLayer,
    Ocr,
    /// Region too small to recognize
    Skipped,
}

/// A cleaned value and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub value: String,
    pub method: ExtractionMethod,
}

/// Raster cache key: page and the bit pattern of the render scale
type RasterKey = (u32, u64);

pub struct ExtractionPipeline {
    source: Arc<dyn DocumentSource>,
    ocr: Arc<OcrService>,
    config: ExtractionConfig,
    rasters: Mutex<LruCache<RasterKey, Arc<DynamicImage>>>,
}

impl ExtractionPipeline {
    pub fn new(source: Arc<dyn DocumentSource>, ocr: Arc<OcrService>, config: ExtractionConfig) -> Self {
        let capacity = NonZeroUsize::new(RASTER_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            ocr,
            config,
            rasters: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn page_count(&self) -> u32 {
        self.source.page_count()
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract the value of `field` inside `rect` on `page`
    pub async fn extract(&self, page: u32, field: FieldType, rect: NormRect) -> Result<Extraction> {
        let count = self.source.page_count();
        if page == 0 || page > count {
            return Err(EngineError::PageOutOfRange { page, count });
        }

        if self.config.exact_text {
            match self.exact_text(page, &rect).await {
                Ok(text) if !text.is_empty() => {
                    tracing::debug!(page, field = %field, "Extracted from text layer");
                    return Ok(Extraction {
                        value: text,
                        method: ExtractionMethod::TextLayer,
                    });
                }
                Ok(_) => {}
                Err(e) if e.is_fatal_to_batch() => return Err(e),
                Err(e) => {
                    tracing::warn!(page, field = %field, "Text layer unavailable, falling back to OCR: {}", e);
                }
            }
        }

        self.recognize(page, field, rect).await
    }

    async fn exact_text(&self, page: u32, rect: &NormRect) -> Result<String> {
        let Some(runs) = self.source.text_runs(page).await? else {
            return Ok(String::new());
        };
        let viewport = self.source.viewport(page, self.config.view_scale).await?;
        Ok(text_in_region(&runs, &viewport, rect))
    }

    async fn recognize(&self, page: u32, field: FieldType, rect: NormRect) -> Result<Extraction> {
        let tuning = &self.config.ocr;
        let base = self.source.viewport(page, 1.0).await?;
        let scale = ocr_scale(&base, &rect, tuning);
        let raster = self.raster(page, scale).await?;

        let Some(crop) = crop_region(&raster, &rect, tuning.min_crop_px) else {
            tracing::debug!(page, field = %field, scale, "Region below minimum crop size, skipping OCR");
            return Ok(Extraction {
                value: String::new(),
                method: ExtractionMethod::Skipped,
            });
        };

        let profile = field.profile();
        let processed = preprocess(&crop, profile, tuning);
        let png = encode_png(&processed)?;
        let outcome = self.ocr.recognize_best(&png, profile).await?;
        let value = clean(profile, &outcome.result.text);

        tracing::debug!(
            page,
            field = %field,
            scale,
            psm = outcome.pass.psm.as_tesseract(),
            confidence = outcome.result.confidence,
            "Extracted with OCR"
        );
        Ok(Extraction {
            value,
            method: ExtractionMethod::Ocr,
        })
    }

    async fn raster(&self, page: u32, scale: f64) -> Result<Arc<DynamicImage>> {
        let key = (page, scale.to_bits());
        let cached = self.rasters.lock().get(&key).cloned();
        if let Some(raster) = cached {
            return Ok(raster);
        }

        let raster = Arc::new(self.source.render(page, scale).await?);
        self.rasters.lock().put(key, Arc::clone(&raster));
        Ok(raster)
    }
}

/// Render scale for recognizing `rect`.
///
/// Smaller regions get a larger multiplier so glyphs stay legible: the
/// scale aims for a crop of roughly `target_crop_area` pixels, bounded by
/// the configured minimum and maximum, then reduced if the full raster
/// would exceed `max_raster_dim` on its longest side.
pub fn ocr_scale(base: &Viewport, rect: &NormRect, tuning: &OcrTuning) -> f64 {
    let area = rect.w * base.width * rect.h * base.height;
    let mut scale = if area > 0.0 {
        (tuning.target_crop_area / area).sqrt()
    } else {
        tuning.max_render_scale
    };
    // NaN bounds are ignored
    scale = scale
        .max(tuning.min_render_scale)
        .min(tuning.max_render_scale.max(tuning.min_render_scale));

    let longest = base.width.max(base.height);
    if longest > 0.0 && tuning.max_raster_dim > 0 && longest * scale > tuning.max_raster_dim as f64 {
        scale = tuning.max_raster_dim as f64 / longest;
    }
    scale
}

/// Crop `rect` out of a raster, or `None` if the crop is smaller than
/// `min_px` on either side
fn crop_region(raster: &DynamicImage, rect: &NormRect, min_px: u32) -> Option<DynamicImage> {
    let (width, height) = raster.dimensions();
    let px = rect.to_pixels(width as f64, height as f64);

    let x = (px.x.floor().max(0.0) as u32).min(width);
    let y = (px.y.floor().max(0.0) as u32).min(height);
    let w = (px.width.round().max(0.0) as u32).min(width - x);
    let h = (px.height.round().max(0.0) as u32).min(height - y);

    if w < min_px.max(1) || h < min_px.max(1) {
        return None;
    }
    Some(raster.crop_imm(x, y, w, h))
}
