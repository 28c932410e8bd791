//! Exact text from the document's text layer

use super::cleanup::normalize_whitespace;
use crate::document::{TextRun, Viewport};
use crate::region::NormRect;

/// Text of every run anchored inside `rect`.
///
/// The region is measured in viewport pixels and anchors on its edges count
/// as inside. Matched runs are joined with single spaces in document order.
pub fn text_in_region(runs: &[TextRun], viewport: &Viewport, rect: &NormRect) -> String {
    let bounds = rect.to_pixels(viewport.width, viewport.height);
    let matched: Vec<&str> = runs
        .iter()
        .filter(|run| {
            let (x, y) = run.anchor_in(viewport);
            bounds.contains(x, y)
        })
        .map(|run| run.text.as_str())
        .collect();
    normalize_whitespace(&matched.join(" "))
}
