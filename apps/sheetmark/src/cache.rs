//! Extracted value cache
//!
//! Presence of a key means "already extracted, do not re-extract". An empty
//! string is a valid cached result: a field that legitimately recognized to
//! nothing is not retried. Entries only disappear through explicit
//! invalidation, which the engine issues on every geometry change.

use std::collections::BTreeMap;

use crate::fields::FieldType;

/// Per-page, per-field extracted values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageCache {
    pages: BTreeMap<u32, BTreeMap<FieldType, String>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, page: u32, field_type: FieldType) -> Option<&str> {
        self.pages
            .get(&page)
            .and_then(|fields| fields.get(&field_type))
            .map(String::as_str)
    }

    pub fn contains(&self, page: u32, field_type: FieldType) -> bool {
        self.get(page, field_type).is_some()
    }

    pub fn insert(&mut self, page: u32, field_type: FieldType, value: String) {
        self.pages.entry(page).or_default().insert(field_type, value);
    }

    /// All cached values for a page
    pub fn page(&self, page: u32) -> Option<&BTreeMap<FieldType, String>> {
        self.pages.get(&page)
    }

    /// Drop cached values for some fields on one page.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&mut self, page: u32, fields: &[FieldType]) -> usize {
        let Some(cached) = self.pages.get_mut(&page) else {
            return 0;
        };
        let before = cached.len();
        cached.retain(|field, _| !fields.contains(field));
        let removed = before - cached.len();
        if cached.is_empty() {
            self.pages.remove(&page);
        }
        if removed > 0 {
            tracing::debug!(page, ?fields, removed, "Invalidated cached values");
        }
        removed
    }

    /// Drop a field on every page, used when its template moves
    pub fn invalidate_everywhere(&mut self, field_type: FieldType) -> usize {
        let pages: Vec<u32> = self.pages.keys().copied().collect();
        pages
            .into_iter()
            .map(|page| self.invalidate(page, &[field_type]))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.pages.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Values for document-level fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentValues {
    values: BTreeMap<FieldType, String>,
}

impl DocumentValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_type: FieldType) -> Option<&str> {
        self.values.get(&field_type).map(String::as_str)
    }

    pub fn set(&mut self, field_type: FieldType, value: String) {
        self.values.insert(field_type, value);
    }

    pub fn clear(&mut self, field_type: FieldType) -> Option<String> {
        self.values.remove(&field_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_counts_as_cached() {
        let mut cache = PageCache::new();
        cache.insert(1, FieldType::Date, String::new());
        assert!(cache.contains(1, FieldType::Date));
        assert_eq!(cache.get(1, FieldType::Date), Some(""));
    }

    #[test]
    fn test_invalidate_is_scoped_to_page_and_fields() {
        let mut cache = PageCache::new();
        cache.insert(1, FieldType::Date, "01/02/2024".into());
        cache.insert(1, FieldType::SheetId, "A-101".into());
        cache.insert(2, FieldType::Date, "03/04/2024".into());

        assert_eq!(cache.invalidate(1, &[FieldType::Date]), 1);
        assert!(!cache.contains(1, FieldType::Date));
        assert!(cache.contains(1, FieldType::SheetId));
        assert!(cache.contains(2, FieldType::Date));

        // Absent keys are fine
        assert_eq!(cache.invalidate(9, &[FieldType::Date]), 0);
        assert_eq!(cache.invalidate(1, &[FieldType::Description]), 0);
    }

    #[test]
    fn test_invalidate_everywhere() {
        let mut cache = PageCache::new();
        for page in 1..=3 {
            cache.insert(page, FieldType::SheetId, format!("S-{}", page));
            cache.insert(page, FieldType::Date, "01.01.24".into());
        }
        assert_eq!(cache.invalidate_everywhere(FieldType::SheetId), 3);
        assert_eq!(cache.len(), 3);
        assert!((1..=3).all(|p| cache.contains(p, FieldType::Date)));
    }

    #[test]
    fn test_document_values() {
        let mut values = DocumentValues::new();
        assert_eq!(values.get(FieldType::PreparedBy), None);
        values.set(FieldType::PreparedBy, "J. Smith".into());
        assert_eq!(values.get(FieldType::PreparedBy), Some("J. Smith"));
        assert_eq!(values.clear(FieldType::PreparedBy).as_deref(), Some("J. Smith"));
    }
}
