//! Templates and override resolution
//!
//! A page-level field drawn on its master page becomes that field's
//! template: the geometry every other page inherits unless it has its own
//! override or has explicitly excluded the field.
//!
//! Ghost regions are a pure derivation of this state. They are never stored;
//! [`TemplateBook::ghosts`] synthesizes them on demand for every page that
//! neither overrides nor excludes a templated field.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::fields::FieldType;
use crate::region::{NormRect, Region, RegionId, RegionStore};

/// Canonical geometry for a page-level field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub field_type: FieldType,
    #[serde(flatten)]
    pub rect: NormRect,
}

/// Where a resolved geometry came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// A real region on the page itself
    Override { id: RegionId, rect: NormRect },
    /// The field's template
    Template(NormRect),
}

impl Resolution {
    pub fn rect(&self) -> NormRect {
        match self {
            Resolution::Override { rect, .. } => *rect,
            Resolution::Template(rect) => *rect,
        }
    }

    pub fn is_override(&self) -> bool {
        matches!(self, Resolution::Override { .. })
    }
}

/// Templates, master pages, and per-page exclusions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateBook {
    templates: BTreeMap<FieldType, Template>,
    master_pages: BTreeMap<FieldType, u32>,
    exclusions: BTreeMap<u32, BTreeSet<FieldType>>,
}

impl TemplateBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn template(&self, field_type: FieldType) -> Option<&Template> {
        self.templates.get(&field_type)
    }

    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn master_page(&self, field_type: FieldType) -> Option<u32> {
        self.master_pages.get(&field_type).copied()
    }

    pub fn is_master(&self, page: u32, field_type: FieldType) -> bool {
        self.master_page(field_type) == Some(page)
    }

    pub fn set_master_page(&mut self, field_type: FieldType, page: u32) {
        self.master_pages.insert(field_type, page);
    }

    /// Designate `page` as master if the field has none yet.
    ///
    /// Returns the field's master page afterwards.
    pub fn claim_master(&mut self, field_type: FieldType, page: u32) -> u32 {
        *self.master_pages.entry(field_type).or_insert(page)
    }

    /// Replace the template geometry. Returns true if it changed.
    pub fn set_template(&mut self, field_type: FieldType, rect: NormRect) -> bool {
        let template = Template { field_type, rect };
        self.templates.insert(field_type, template) != Some(template)
    }

    /// Drop the template along with its master page and exclusions
    pub fn tear_down(&mut self, field_type: FieldType) -> Option<Template> {
        self.master_pages.remove(&field_type);
        for excluded in self.exclusions.values_mut() {
            excluded.remove(&field_type);
        }
        self.exclusions.retain(|_, excluded| !excluded.is_empty());
        self.templates.remove(&field_type)
    }

    pub fn exclude(&mut self, page: u32, field_type: FieldType) {
        self.exclusions.entry(page).or_default().insert(field_type);
    }

    pub fn is_excluded(&self, page: u32, field_type: FieldType) -> bool {
        self.exclusions
            .get(&page)
            .is_some_and(|excluded| excluded.contains(&field_type))
    }

    /// Decide which geometry governs `(page, field)`.
    ///
    /// 1. the page's most recent real region of the field
    /// 2. nothing, if the page excludes the field
    /// 3. the field's template
    pub fn resolve(&self, store: &RegionStore, page: u32, field_type: FieldType) -> Option<Resolution> {
        if let Some(region) = store.latest(page, field_type) {
            return Some(Resolution::Override {
                id: region.id,
                rect: region.rect,
            });
        }
        if self.is_excluded(page, field_type) {
            return None;
        }
        self.template(field_type).map(|t| Resolution::Template(t.rect))
    }

    /// Template-derived placeholders for a page
    pub fn ghosts(&self, store: &RegionStore, page: u32) -> Vec<Region> {
        self.templates
            .values()
            .filter(|t| !store.has_field(page, t.field_type))
            .filter(|t| !self.is_excluded(page, t.field_type))
            .map(|t| Region::ghost(page, t.field_type, t.rect))
            .collect()
    }

    /// Real regions followed by ghosts
    pub fn effective_regions(&self, store: &RegionStore, page: u32) -> Vec<Region> {
        let mut regions = store.regions(page).to_vec();
        regions.extend(self.ghosts(store, page));
        regions
    }

    /// The ghost a ghost id refers to, if it is still materialized
    pub fn ghost(&self, store: &RegionStore, id: RegionId) -> Option<(u32, Region)> {
        let (page, field_type) = id.ghost_parts()?;
        if store.has_field(page, field_type) || self.is_excluded(page, field_type) {
            return None;
        }
        let template = self.template(field_type)?;
        Some((page, Region::ghost(page, field_type, template.rect)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64) -> NormRect {
        NormRect::new(x, y, 0.1, 0.05)
    }

    #[test]
    fn test_resolve_priority() {
        let mut book = TemplateBook::new();
        let mut store = RegionStore::new();
        book.set_template(FieldType::SheetId, rect(0.8, 0.9));

        assert_eq!(
            book.resolve(&store, 2, FieldType::SheetId),
            Some(Resolution::Template(rect(0.8, 0.9)))
        );

        // Exclusion beats inheritance
        book.exclude(2, FieldType::SheetId);
        assert_eq!(book.resolve(&store, 2, FieldType::SheetId), None);

        // Override beats exclusion and template
        let region = store.insert(2, FieldType::SheetId, rect(0.1, 0.1));
        let resolved = book.resolve(&store, 2, FieldType::SheetId).unwrap();
        assert!(resolved.is_override());
        assert_eq!(resolved.rect(), region.rect);

        // Untemplated field resolves to nothing
        assert_eq!(book.resolve(&store, 3, FieldType::Date), None);
    }

    #[test]
    fn test_exclusion_applies_regardless_of_order() {
        let mut book = TemplateBook::new();
        let store = RegionStore::new();
        book.exclude(4, FieldType::Date);
        book.set_template(FieldType::Date, rect(0.5, 0.5));
        assert_eq!(book.resolve(&store, 4, FieldType::Date), None);
        assert!(book.resolve(&store, 5, FieldType::Date).is_some());
    }

    #[test]
    fn test_ghosts_skip_overrides_and_exclusions() {
        let mut book = TemplateBook::new();
        let mut store = RegionStore::new();
        book.set_template(FieldType::SheetId, rect(0.8, 0.9));
        book.set_template(FieldType::Date, rect(0.6, 0.9));
        store.insert(2, FieldType::SheetId, rect(0.1, 0.1));
        book.exclude(3, FieldType::Date);

        let page2: Vec<FieldType> = book.ghosts(&store, 2).iter().map(|g| g.field_type).collect();
        assert_eq!(page2, vec![FieldType::Date]);

        let page3: Vec<FieldType> = book.ghosts(&store, 3).iter().map(|g| g.field_type).collect();
        assert_eq!(page3, vec![FieldType::SheetId]);

        let effective = book.effective_regions(&store, 2);
        assert_eq!(effective.len(), 2);
        assert!(!effective[0].is_ghost);
        assert!(effective[1].is_ghost);
    }

    #[test]
    fn test_ghost_lookup_by_id() {
        let mut book = TemplateBook::new();
        let mut store = RegionStore::new();
        book.set_template(FieldType::IssueId, rect(0.3, 0.3));

        let id = RegionId::ghost(7, FieldType::IssueId);
        let (page, ghost) = book.ghost(&store, id).unwrap();
        assert_eq!(page, 7);
        assert_eq!(ghost.rect, rect(0.3, 0.3));

        store.insert(7, FieldType::IssueId, rect(0.1, 0.1));
        assert!(book.ghost(&store, id).is_none());
    }

    #[test]
    fn test_claim_master_keeps_first() {
        let mut book = TemplateBook::new();
        assert_eq!(book.claim_master(FieldType::Date, 3), 3);
        assert_eq!(book.claim_master(FieldType::Date, 1), 3);
        assert!(book.is_master(3, FieldType::Date));
    }

    #[test]
    fn test_tear_down_clears_master_and_exclusions() {
        let mut book = TemplateBook::new();
        book.claim_master(FieldType::Date, 1);
        book.set_template(FieldType::Date, rect(0.5, 0.5));
        book.exclude(2, FieldType::Date);
        book.exclude(2, FieldType::SheetId);

        assert!(book.tear_down(FieldType::Date).is_some());
        assert_eq!(book.master_page(FieldType::Date), None);
        assert!(!book.is_excluded(2, FieldType::Date));
        assert!(book.is_excluded(2, FieldType::SheetId));
    }

    #[test]
    fn test_set_template_reports_change() {
        let mut book = TemplateBook::new();
        assert!(book.set_template(FieldType::Date, rect(0.5, 0.5)));
        assert!(!book.set_template(FieldType::Date, rect(0.5, 0.5)));
        assert!(book.set_template(FieldType::Date, rect(0.4, 0.5)));
    }
}
