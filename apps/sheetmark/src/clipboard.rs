//! Selection and clipboard
//!
//! Copy stores regions relative to the selection's top-left corner so a
//! paste reproduces the layout of the group, not its absolute position.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::fields::FieldType;
use crate::region::{NormRect, Region, RegionId};

/// Multi-select set of region ids on the current page
pub type Selection = BTreeSet<RegionId>;

/// Normalized paste position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

impl Anchor {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One copied region, relative to the group origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipEntry {
    pub field_type: FieldType,
    pub dx: f64,
    pub dy: f64,
    pub w: f64,
    pub h: f64,
}

/// Group-relative clipboard
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    entries: Vec<ClipEntry>,
    last_anchor: Option<Anchor>,
    repeat: u32,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the clipboard with a group of regions.
    ///
    /// Returns the number of entries copied.
    pub fn copy(&mut self, regions: &[Region]) -> usize {
        let min_x = regions.iter().map(|r| r.rect.x).fold(f64::INFINITY, f64::min);
        let min_y = regions.iter().map(|r| r.rect.y).fold(f64::INFINITY, f64::min);

        self.entries = regions
            .iter()
            .map(|r| ClipEntry {
                field_type: r.field_type,
                dx: r.rect.x - min_x,
                dy: r.rect.y - min_y,
                w: r.rect.w,
                h: r.rect.h,
            })
            .collect();
        self.last_anchor = None;
        self.repeat = 0;
        self.entries.len()
    }

    pub fn entries(&self) -> &[ClipEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Geometry for the next paste at `anchor`.
    ///
    /// Pasting repeatedly at the same anchor shifts each new copy by one more
    /// `nudge` step so duplicates do not sit exactly on top of each other.
    pub fn layout(&mut self, anchor: Anchor, nudge: f64) -> Vec<(FieldType, NormRect)> {
        if self.last_anchor == Some(anchor) {
            self.repeat += 1;
        } else {
            self.last_anchor = Some(anchor);
            self.repeat = 0;
        }
        let offset = nudge * self.repeat as f64;

        self.entries
            .iter()
            .map(|e| {
                let rect = NormRect::new(anchor.x + e.dx + offset, anchor.y + e.dy + offset, e.w, e.h);
                (e.field_type, rect.clamped())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(id: u64, field_type: FieldType, x: f64, y: f64) -> Region {
        Region {
            id: RegionId(id),
            field_type,
            rect: NormRect::new(x, y, 0.1, 0.05),
            is_ghost: false,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_copy_preserves_relative_layout() {
        let mut clipboard = Clipboard::new();
        let copied = clipboard.copy(&[
            region(1, FieldType::SheetId, 0.3, 0.3),
            region(2, FieldType::Date, 0.5, 0.3),
        ]);
        assert_eq!(copied, 2);

        let pasted = clipboard.layout(Anchor::new(0.1, 0.1), 0.01);
        assert_eq!(pasted.len(), 2);
        let (f0, r0) = pasted[0];
        let (f1, r1) = pasted[1];
        assert_eq!(f0, FieldType::SheetId);
        assert_eq!(f1, FieldType::Date);
        assert!(approx(r0.x, 0.1) && approx(r0.y, 0.1));
        assert!(approx(r1.x, 0.3) && approx(r1.y, 0.1));
        assert!(approx(r1.x - r0.x, 0.2));
    }

    #[test]
    fn test_repeated_paste_nudges_monotonically() {
        let mut clipboard = Clipboard::new();
        clipboard.copy(&[region(1, FieldType::SheetId, 0.3, 0.3)]);
        let anchor = Anchor::new(0.2, 0.2);

        let xs: Vec<f64> = (0..3).map(|_| clipboard.layout(anchor, 0.01)[0].1.x).collect();
        assert!(approx(xs[0], 0.2));
        assert!(approx(xs[1], 0.21));
        assert!(approx(xs[2], 0.22));

        // Moving the anchor resets the nudge
        let moved = clipboard.layout(Anchor::new(0.5, 0.5), 0.01);
        assert!(approx(moved[0].1.x, 0.5));
    }

    #[test]
    fn test_paste_is_clamped() {
        let mut clipboard = Clipboard::new();
        clipboard.copy(&[
            region(1, FieldType::SheetId, 0.0, 0.0),
            region(2, FieldType::Date, 0.5, 0.0),
        ]);
        let pasted = clipboard.layout(Anchor::new(0.8, 0.97), 0.01);
        for (_, rect) in pasted {
            assert!(rect.is_within_unit());
        }
    }

    #[test]
    fn test_copy_of_nothing() {
        let mut clipboard = Clipboard::new();
        assert_eq!(clipboard.copy(&[]), 0);
        assert!(clipboard.is_empty());
        assert!(clipboard.layout(Anchor::new(0.1, 0.1), 0.01).is_empty());
    }
}
