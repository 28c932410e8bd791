//! Document source types
//!
//! Viewports and positioned text runs follow the PDF convention of 2x3
//! affine matrices `[a b c d e f]`; a point `(x, y)` maps to
//! `(a*x + c*y + e, b*x + d*y + f)`.

use serde::{Deserialize, Serialize};

/// Affine transform `[a b c d e f]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform(pub [f64; 6]);

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    /// Pure translation
    pub fn translate(x: f64, y: f64) -> Self {
        Self([1.0, 0.0, 0.0, 1.0, x, y])
    }

    /// Compose: apply `other` first, then `self`
    pub fn multiply(&self, other: &Transform) -> Transform {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Transform([
            a1 * a2 + c1 * b2,
            b1 * a2 + d1 * b2,
            a1 * c2 + c1 * d2,
            b1 * c2 + d1 * d2,
            a1 * e2 + c1 * f2 + e1,
            b1 * e2 + d1 * f2 + f1,
        ])
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// Translation component, i.e. where the origin lands
    pub fn origin(&self) -> (f64, f64) {
        (self.0[4], self.0[5])
    }
}

/// A page laid out at a given scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels at `scale`
    pub width: f64,
    /// Height in pixels at `scale`
    pub height: f64,
    pub scale: f64,
    /// Document space to viewport pixels
    pub transform: Transform,
}

impl Viewport {
    /// Viewport for a page of `width` x `height` points with a bottom-left
    /// origin, flipped to the top-left pixel convention.
    pub fn for_page(width: f64, height: f64, scale: f64) -> Self {
        Self {
            width: width * scale,
            height: height * scale,
            scale,
            transform: Transform([scale, 0.0, 0.0, -scale, 0.0, height * scale]),
        }
    }
}

/// A run of text positioned in document space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    /// Run space to document space; the origin is the run's anchor
    pub transform: Transform,
}

impl TextRun {
    pub fn new(text: impl Into<String>, transform: Transform) -> Self {
        Self {
            text: text.into(),
            transform,
        }
    }

    /// Anchor point in viewport pixels
    pub fn anchor_in(&self, viewport: &Viewport) -> (f64, f64) {
        viewport.transform.multiply(&self.transform).origin()
    }
}
