//! Configuration management for Sheetmark

use std::env;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::history::DEFAULT_HISTORY_DEPTH;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Undo steps kept
    pub history_depth: usize,
    /// Pages processed between cooperative yields during batch extraction
    pub batch_size: usize,
    /// Normalized shift applied per repeated paste at the same anchor
    pub paste_nudge: f64,
    /// Draws narrower or shorter than this (canvas pixels) are discarded
    pub min_draw_px: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Try the document's text layer before OCR
    pub exact_text: bool,
    /// View scale the text-layer pass measures regions at
    pub view_scale: f64,
    /// OCR language code
    pub language: String,
    pub ocr: OcrTuning,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrTuning {
    /// Crop area (px²) the render scale aims for
    pub target_crop_area: f64,
    pub min_render_scale: f64,
    pub max_render_scale: f64,
    /// Longest raster side; larger renders are scaled down
    pub max_raster_dim: u32,
    /// Crops narrower or shorter than this skip OCR
    pub min_crop_px: u32,
    /// Neighbourhood size for adaptive thresholding
    pub threshold_window: u32,
    /// Grey levels below the local mean that count as ink
    pub threshold_offset: i32,
    pub unsharp_sigma: f32,
    pub unsharp_threshold: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            batch_size: 3,
            paste_nudge: 0.01,
            min_draw_px: 2.0,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            exact_text: true,
            view_scale: 1.5,
            language: "eng".to_string(),
            ocr: OcrTuning::default(),
        }
    }
}

impl Default for OcrTuning {
    fn default() -> Self {
        Self {
            target_crop_area: 250_000.0,
            min_render_scale: 2.0,
            max_render_scale: 8.0,
            max_raster_dim: 6000,
            min_crop_px: 8,
            threshold_window: 31,
            threshold_offset: 10,
            unsharp_sigma: 1.0,
            unsharp_threshold: 2,
        }
    }
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    ///
    /// Absent, unparsable or out-of-range variables keep their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_vars()
    }

    /// Load a specific dotenv file, then read the environment
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, dotenvy::Error> {
        dotenvy::from_path(path.as_ref())?;
        Ok(Self::from_vars())
    }

    fn from_vars() -> Self {
        let defaults = Config::default();
        let ocr = defaults.extraction.ocr;
        Config {
            engine: EngineConfig {
                history_depth: var_where("SHEETMARK_HISTORY_DEPTH", defaults.engine.history_depth, |v| *v > 0),
                batch_size: var_where("SHEETMARK_BATCH_SIZE", defaults.engine.batch_size, |v| *v > 0),
                paste_nudge: var_where("SHEETMARK_PASTE_NUDGE", defaults.engine.paste_nudge, |v: &f64| {
                    v.is_finite() && *v >= 0.0
                }),
                min_draw_px: var_where("SHEETMARK_MIN_DRAW_PX", defaults.engine.min_draw_px, positive),
            },
            extraction: ExtractionConfig {
                exact_text: var_or("SHEETMARK_EXACT_TEXT", defaults.extraction.exact_text),
                view_scale: var_where("SHEETMARK_VIEW_SCALE", defaults.extraction.view_scale, positive),
                language: env::var("SHEETMARK_OCR_LANGUAGE")
                    .unwrap_or(defaults.extraction.language),
                ocr: OcrTuning {
                    target_crop_area: var_where("SHEETMARK_OCR_TARGET_AREA", ocr.target_crop_area, positive),
                    min_render_scale: var_where("SHEETMARK_OCR_MIN_SCALE", ocr.min_render_scale, positive),
                    max_render_scale: var_where("SHEETMARK_OCR_MAX_SCALE", ocr.max_render_scale, positive),
                    max_raster_dim: var_where("SHEETMARK_OCR_MAX_RASTER_DIM", ocr.max_raster_dim, |v| *v > 0),
                    min_crop_px: var_or("SHEETMARK_OCR_MIN_CROP_PX", ocr.min_crop_px),
                    threshold_window: var_or("SHEETMARK_OCR_THRESHOLD_WINDOW", ocr.threshold_window),
                    threshold_offset: var_or("SHEETMARK_OCR_THRESHOLD_OFFSET", ocr.threshold_offset),
                    unsharp_sigma: var_where("SHEETMARK_OCR_UNSHARP_SIGMA", ocr.unsharp_sigma, |v: &f32| {
                        v.is_finite() && *v > 0.0
                    }),
                    unsharp_threshold: var_or("SHEETMARK_OCR_UNSHARP_THRESHOLD", ocr.unsharp_threshold),
                },
            },
        }
    }
}

fn var_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring unparsable {}={:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Like [`var_or`], but a parsed value failing `valid` also falls back
fn var_where<T>(key: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    let value = var_or(key, default);
    if valid(&value) {
        value
    } else {
        tracing::warn!("Ignoring out-of-range {}={:?}, using default", key, value);
        default
    }
}

fn positive(v: &f64) -> bool {
    v.is_finite() && *v > 0.0
}
