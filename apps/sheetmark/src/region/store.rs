//! Region store
//!
//! Per-page collections of real (user-drawn or pasted) regions. Within a
//! page, collection order is creation order, so the last region of a field
//! type is the one that governs extraction on that page.

use std::collections::BTreeMap;

use super::geometry::{NormRect, Region, RegionId};
use crate::fields::FieldType;

/// Real regions indexed by page (1-indexed)
#[derive(Debug, Clone)]
pub struct RegionStore {
    pages: BTreeMap<u32, Vec<Region>>,
    /// Next id to hand out; never rewinds within a session
    next_id: u64,
}

impl Default for RegionStore {
    fn default() -> Self {
        Self::new()
    }
}

// Identity allocation is not part of the observable state
impl PartialEq for RegionStore {
    fn eq(&self, other: &Self) -> bool {
        self.pages == other.pages
    }
}

impl RegionStore {
    pub fn new() -> Self {
        Self {
            pages: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> RegionId {
        let id = RegionId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Keep ids unique after restoring an older copy of the store
    pub fn advance_ids_past(&mut self, next_id: u64) {
        self.next_id = self.next_id.max(next_id);
    }

    /// Create a real region with a fresh id, clamped into the page
    pub fn insert(&mut self, page: u32, field_type: FieldType, rect: NormRect) -> Region {
        let region = Region {
            id: self.allocate_id(),
            field_type,
            rect: rect.clamped(),
            is_ghost: false,
        };
        self.pages.entry(page).or_default().push(region);
        region
    }

    /// Regions on a page in creation order
    pub fn regions(&self, page: u32) -> &[Region] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, page: u32, id: RegionId) -> Option<&Region> {
        self.regions(page).iter().find(|r| r.id == id)
    }

    /// Locate a region on any page
    pub fn find(&self, id: RegionId) -> Option<(u32, &Region)> {
        self.pages
            .iter()
            .find_map(|(page, regions)| regions.iter().find(|r| r.id == id).map(|r| (*page, r)))
    }

    /// Most recently added region of a field on a page
    pub fn latest(&self, page: u32, field_type: FieldType) -> Option<&Region> {
        self.regions(page)
            .iter()
            .rev()
            .find(|r| r.field_type == field_type)
    }

    /// Most recently created region of a field on any page
    pub fn latest_anywhere(&self, field_type: FieldType) -> Option<(u32, &Region)> {
        self.pages
            .iter()
            .flat_map(|(page, regions)| regions.iter().map(move |r| (*page, r)))
            .filter(|(_, r)| r.field_type == field_type)
            .max_by_key(|(_, r)| r.id)
    }

    pub fn has_field(&self, page: u32, field_type: FieldType) -> bool {
        self.latest(page, field_type).is_some()
    }

    /// Translate a set of regions on one page as a rigid group.
    ///
    /// The displacement is clamped jointly so every member stays inside the
    /// page and relative offsets are preserved. Returns the applied delta.
    pub fn translate_group(&mut self, page: u32, ids: &[RegionId], dx: f64, dy: f64) -> (f64, f64) {
        let Some(regions) = self.pages.get_mut(&page) else {
            return (0.0, 0.0);
        };

        let rects: Vec<NormRect> = regions
            .iter()
            .filter(|r| ids.contains(&r.id))
            .map(|r| r.rect)
            .collect();
        let (dx, dy) = clamp_group_delta(&rects, dx, dy);

        for region in regions.iter_mut().filter(|r| ids.contains(&r.id)) {
            region.rect = region.rect.translated(dx, dy).clamped();
        }
        (dx, dy)
    }

    /// Remove regions by id from one page, returning what was removed
    pub fn remove(&mut self, page: u32, ids: &[RegionId]) -> Vec<Region> {
        let Some(regions) = self.pages.get_mut(&page) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<Region>, Vec<Region>) =
            regions.drain(..).partition(|r| ids.contains(&r.id));
        *regions = kept;
        if regions.is_empty() {
            self.pages.remove(&page);
        }
        removed
    }

    /// Remove every region of a field on every page
    pub fn remove_field_everywhere(&mut self, field_type: FieldType) -> Vec<(u32, Region)> {
        let mut removed = Vec::new();
        for (page, regions) in self.pages.iter_mut() {
            regions.retain(|r| {
                if r.field_type == field_type {
                    removed.push((*page, *r));
                    false
                } else {
                    true
                }
            });
        }
        self.pages.retain(|_, regions| !regions.is_empty());
        removed
    }

    /// Pages that hold at least one region
    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Clamp a displacement so that every rectangle of a group stays in bounds.
///
/// Each rectangle allows `dx` in `[-x, 1 - w - x]`; the group allows the
/// intersection of those ranges.
pub fn clamp_group_delta(rects: &[NormRect], dx: f64, dy: f64) -> (f64, f64) {
    if rects.is_empty() {
        return (0.0, 0.0);
    }

    let mut min_dx = f64::NEG_INFINITY;
    let mut max_dx = f64::INFINITY;
    let mut min_dy = f64::NEG_INFINITY;
    let mut max_dy = f64::INFINITY;
    for r in rects {
        min_dx = min_dx.max(-r.x);
        max_dx = max_dx.min(1.0 - r.right());
        min_dy = min_dy.max(-r.y);
        max_dy = max_dy.min(1.0 - r.bottom());
    }

    // Stored regions are always in bounds, so min <= 0 <= max holds
    let dx = dx.max(min_dx).min(max_dx.max(min_dx));
    let dy = dy.max(min_dy).min(max_dy.max(min_dy));
    (dx, dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> NormRect {
        NormRect::new(x, y, w, h)
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let mut store = RegionStore::new();
        let a = store.insert(1, FieldType::SheetId, rect(0.1, 0.1, 0.1, 0.1));
        let b = store.insert(2, FieldType::Date, rect(0.2, 0.2, 0.1, 0.1));
        assert_eq!(a.id, RegionId(1));
        assert_eq!(b.id, RegionId(2));
        assert_eq!(store.len(), 2);
        assert_eq!(store.find(b.id).map(|(p, _)| p), Some(2));
    }

    #[test]
    fn test_latest_is_last_writer() {
        let mut store = RegionStore::new();
        store.insert(1, FieldType::SheetId, rect(0.1, 0.1, 0.1, 0.1));
        let newer = store.insert(1, FieldType::SheetId, rect(0.5, 0.5, 0.1, 0.1));
        store.insert(1, FieldType::Date, rect(0.7, 0.7, 0.1, 0.1));
        assert_eq!(store.latest(1, FieldType::SheetId).unwrap().id, newer.id);
        assert!(store.latest(2, FieldType::SheetId).is_none());
    }

    #[test]
    fn test_latest_anywhere_uses_creation_order() {
        let mut store = RegionStore::new();
        store.insert(3, FieldType::PreparedBy, rect(0.1, 0.1, 0.1, 0.1));
        let newest = store.insert(1, FieldType::PreparedBy, rect(0.2, 0.1, 0.1, 0.1));
        let (page, region) = store.latest_anywhere(FieldType::PreparedBy).unwrap();
        assert_eq!(page, 1);
        assert_eq!(region.id, newest.id);
    }

    #[test]
    fn test_group_translation_clamps_jointly() {
        let mut store = RegionStore::new();
        let a = store.insert(1, FieldType::SheetId, rect(0.1, 0.1, 0.1, 0.1));
        let b = store.insert(1, FieldType::Date, rect(0.8, 0.1, 0.1, 0.1));

        // b can only move 0.1 to the right; a must follow by the same amount
        let (dx, dy) = store.translate_group(1, &[a.id, b.id], 0.5, 0.0);
        assert!((dx - 0.1).abs() < 1e-12);
        assert_eq!(dy, 0.0);

        let a = store.get(1, a.id).unwrap().rect;
        let b = store.get(1, b.id).unwrap().rect;
        assert!((a.x - 0.2).abs() < 1e-12);
        assert!((b.x - 0.9).abs() < 1e-12);
        assert!((b.x - a.x - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_group_translation_ignores_other_pages() {
        let mut store = RegionStore::new();
        let a = store.insert(1, FieldType::SheetId, rect(0.1, 0.1, 0.1, 0.1));
        assert_eq!(store.translate_group(2, &[a.id], 0.1, 0.1), (0.0, 0.0));
        assert_eq!(store.get(1, a.id).unwrap().rect.x, 0.1);
    }

    #[test]
    fn test_remove_and_cascade() {
        let mut store = RegionStore::new();
        let a = store.insert(1, FieldType::SheetId, rect(0.1, 0.1, 0.1, 0.1));
        store.insert(2, FieldType::SheetId, rect(0.1, 0.1, 0.1, 0.1));
        let keep = store.insert(2, FieldType::Date, rect(0.1, 0.1, 0.1, 0.1));

        let removed = store.remove(1, &[a.id]);
        assert_eq!(removed.len(), 1);
        assert!(store.regions(1).is_empty());

        let cascaded = store.remove_field_everywhere(FieldType::SheetId);
        assert_eq!(cascaded.len(), 1);
        assert_eq!(store.regions(2), &[keep]);
    }

    #[test]
    fn test_equality_ignores_id_counter() {
        let mut a = RegionStore::new();
        let b = RegionStore::new();
        a.advance_ids_past(40);
        assert_eq!(a, b);
        assert_eq!(a.next_id(), 40);
    }
}
