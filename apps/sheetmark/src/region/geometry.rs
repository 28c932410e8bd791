//! Region geometry
//!
//! Regions are stored in coordinates normalized to the page (0-1 on both
//! axes, origin top-left) so they survive zoom changes. Pixel rectangles only
//! exist at the edges: when a user draws on a canvas and when the extraction
//! pipeline crops a raster.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fields::FieldType;

/// Normalized rectangle (0-1 coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl NormRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Clamp into the unit square.
    ///
    /// Width and height are capped at 1 first, then the origin is pulled back
    /// so that `x + w <= 1` and `y + h <= 1`.
    pub fn clamped(self) -> Self {
        let w = clamp_unit(self.w);
        let h = clamp_unit(self.h);
        Self {
            x: clamp_range(self.x, 0.0, 1.0 - w),
            y: clamp_range(self.y, 0.0, 1.0 - h),
            w,
            h,
        }
    }

    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// True when the rectangle lies inside the unit square
    pub fn is_within_unit(&self) -> bool {
        const EPS: f64 = 1e-9;
        self.x >= -EPS
            && self.y >= -EPS
            && self.w >= 0.0
            && self.h >= 0.0
            && self.right() <= 1.0 + EPS
            && self.bottom() <= 1.0 + EPS
    }

    /// Convert to pixel coordinates given page dimensions
    pub fn to_pixels(&self, page_width: f64, page_height: f64) -> PixelRect {
        PixelRect {
            x: self.x * page_width,
            y: self.y * page_height,
            width: self.w * page_width,
            height: self.h * page_height,
        }
    }
}

fn clamp_unit(v: f64) -> f64 {
    clamp_range(v, 0.0, 1.0)
}

fn clamp_range(v: f64, min: f64, max: f64) -> f64 {
    if v.is_nan() {
        return min;
    }
    v.max(min).min(max.max(min))
}

/// Pixel-based rectangle on a canvas or raster
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Build from two drag corners in any order
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Inclusive containment, matching how text anchors on an edge are kept
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Normalize by the canvas the rectangle was drawn on
    pub fn normalize(&self, canvas: CanvasSize) -> NormRect {
        NormRect {
            x: self.x / canvas.width,
            y: self.y / canvas.height,
            w: self.width / canvas.width,
            h: self.height / canvas.height,
        }
    }
}

/// Size of the surface a user interacts with, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Region identity.
///
/// Real regions get sequential ids from the store. Ghost regions are derived
/// from a template and carry an id in a reserved range (high bit set) that
/// encodes their page and field, so the same ghost always has the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u64);

const GHOST_BIT: u64 = 1 << 63;

impl RegionId {
    pub fn ghost(page: u32, field: FieldType) -> Self {
        Self(GHOST_BIT | ((page as u64) << 8) | field.index() as u64)
    }

    pub fn is_ghost(self) -> bool {
        self.0 & GHOST_BIT != 0
    }

    /// Page and field of a ghost id
    pub fn ghost_parts(self) -> Option<(u32, FieldType)> {
        if !self.is_ghost() {
            return None;
        }
        let raw = self.0 & !GHOST_BIT;
        let page = u32::try_from(raw >> 8).ok()?;
        let field = FieldType::from_index((raw & 0xff) as u8)?;
        Some((page, field))
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ghost_parts() {
            Some((page, field)) => write!(f, "ghost:{}:{}", page, field),
            None => write!(f, "{}", self.0),
        }
    }
}

/// A labeled rectangle on a page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: RegionId,
    pub field_type: FieldType,
    #[serde(flatten)]
    pub rect: NormRect,
    /// Derived from a template rather than stored on the page
    pub is_ghost: bool,
}

impl Region {
    pub fn ghost(page: u32, field_type: FieldType, rect: NormRect) -> Self {
        Self {
            id: RegionId::ghost(page, field_type),
            field_type,
            rect,
            is_ghost: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_pulls_back_into_unit_square() {
        let r = NormRect::new(0.95, -0.2, 0.1, 0.3).clamped();
        assert!((r.x - 0.9).abs() < 1e-12);
        assert_eq!(r.y, 0.0);
        assert!(r.is_within_unit());

        let huge = NormRect::new(0.5, 0.5, 3.0, 2.0).clamped();
        assert_eq!(huge, NormRect::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_clamp_handles_nan() {
        let r = NormRect::new(f64::NAN, 0.2, 0.1, 0.1).clamped();
        assert_eq!(r.x, 0.0);
        assert!(r.is_within_unit());
    }

    #[test]
    fn test_pixel_round_trip() {
        let canvas = CanvasSize::new(800.0, 600.0);
        let px = PixelRect::from_corners(400.0, 300.0, 200.0, 150.0);
        assert_eq!(px, PixelRect::new(200.0, 150.0, 200.0, 150.0));

        let norm = px.normalize(canvas);
        assert_eq!(norm, NormRect::new(0.25, 0.25, 0.25, 0.25));
        assert_eq!(norm.to_pixels(800.0, 600.0), px);
    }

    #[test]
    fn test_ghost_ids_are_stable_and_decodable() {
        let id = RegionId::ghost(12, FieldType::Date);
        assert!(id.is_ghost());
        assert_eq!(id, RegionId::ghost(12, FieldType::Date));
        assert_ne!(id, RegionId::ghost(13, FieldType::Date));
        assert_eq!(id.ghost_parts(), Some((12, FieldType::Date)));
        assert_eq!(id.to_string(), "ghost:12:date");

        let real = RegionId(7);
        assert!(!real.is_ghost());
        assert_eq!(real.ghost_parts(), None);
    }

    #[test]
    fn test_region_serializes_flat() {
        let region = Region {
            id: RegionId(3),
            field_type: FieldType::SheetId,
            rect: NormRect::new(0.1, 0.2, 0.3, 0.4),
            is_ghost: false,
        };
        let json = serde_json::to_value(region).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["fieldType"], "sheet_id");
        assert_eq!(json["x"], 0.1);
        assert_eq!(json["isGhost"], false);
    }
}
