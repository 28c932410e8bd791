//! Region engine
//!
//! One object owns every piece of mutable state: the region store, the
//! template book, the extraction caches, the selection and the current
//! page. Every user action goes through an `&mut self` method, so actions
//! never interleave and each one is recorded in history as a single step.
//!
//! Geometry edits follow the template rules:
//!
//! - The first region drawn for a page-level field makes its page the
//!   field's master page.
//! - Edits on the master page update the field's template, invalidating the
//!   field on every page.
//! - Edits elsewhere only touch that page's override and cache.
//! - Dragging a ghost promotes it to an override; deleting a ghost excludes
//!   the field on that page; deleting the master region tears the template
//!   down along with every other page's regions of that field.

use std::collections::BTreeSet;

use crate::cache::{DocumentValues, PageCache};
use crate::clipboard::{Anchor, Clipboard, Selection};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::export::ExtractionRecord;
use crate::extract::ExtractionPipeline;
use crate::fields::FieldType;
use crate::history::History;
use crate::region::{CanvasSize, PixelRect, Region, RegionId, RegionStore};
use crate::template::{Resolution, Template, TemplateBook};

/// Everything undo/redo restores
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub store: RegionStore,
    pub templates: TemplateBook,
    pub cache: PageCache,
    pub documents: DocumentValues,
    pub selection: Selection,
    pub current_page: u32,
}

impl EngineState {
    fn new() -> Self {
        Self {
            store: RegionStore::new(),
            templates: TemplateBook::new(),
            cache: PageCache::new(),
            documents: DocumentValues::new(),
            selection: Selection::new(),
            current_page: 1,
        }
    }

    /// Invalidate and re-sync after a region of `field` on `page` was
    /// created (`claim` set) or changed.
    fn geometry_changed(&mut self, page: u32, field: FieldType, claim: bool) {
        if field.is_document_level() {
            self.documents.clear(field);
            return;
        }

        if claim {
            let master = self.templates.claim_master(field, page);
            if master == page {
                tracing::debug!(page, field = %field, "Master page assigned");
            }
        }
        self.cache.invalidate(page, &[field]);

        if self.templates.is_master(page, field) {
            self.sync_template(page, field);
        }
    }

    /// Make the latest region of `field` on its master page the template
    fn sync_template(&mut self, page: u32, field: FieldType) {
        let Some(region) = self.store.latest(page, field) else {
            return;
        };
        if self.templates.set_template(field, region.rect) {
            let invalidated = self.cache.invalidate_everywhere(field);
            tracing::info!(page, field = %field, invalidated, "Template updated");
        }
    }

    /// Turn a ghost on `page` into a real region at the template geometry
    fn promote_ghost(&mut self, page: u32, id: RegionId) -> Option<Region> {
        let (ghost_page, ghost) = self.templates.ghost(&self.store, id)?;
        if ghost_page != page {
            return None;
        }
        let region = self.store.insert(page, ghost.field_type, ghost.rect);
        if self.selection.remove(&id) {
            self.selection.insert(region.id);
        }
        tracing::debug!(page, field = %ghost.field_type, id = %region.id, "Ghost promoted to override");
        Some(region)
    }

    fn delete(&mut self, page: u32, ids: &[RegionId]) -> usize {
        let mut deleted = 0;
        for &id in ids {
            if id.is_ghost() {
                let Some((ghost_page, ghost)) = self.templates.ghost(&self.store, id) else {
                    continue;
                };
                if ghost_page != page {
                    continue;
                }
                self.templates.exclude(page, ghost.field_type);
                self.cache.invalidate(page, &[ghost.field_type]);
                tracing::debug!(page, field = %ghost.field_type, "Template excluded on page");
                deleted += 1;
                continue;
            }

            let Some(region) = self.store.get(page, id).copied() else {
                continue;
            };
            let field = region.field_type;

            if field.is_page_level() && self.templates.is_master(page, field) {
                self.templates.tear_down(field);
                let removed = self.store.remove_field_everywhere(field);
                let invalidated = self.cache.invalidate_everywhere(field);
                tracing::info!(
                    page,
                    field = %field,
                    removed = removed.len(),
                    invalidated,
                    "Master region deleted, template torn down"
                );
                deleted += removed.len();
            } else {
                deleted += self.store.remove(page, &[id]).len();
                self.geometry_changed(page, field, false);
            }
        }
        self.prune_selection();
        deleted
    }

    /// Drop selected ids that no longer name a region on the current page
    fn prune_selection(&mut self) {
        let page = self.current_page;
        let store = &self.store;
        let templates = &self.templates;
        self.selection.retain(|id| {
            if id.is_ghost() {
                templates.ghost(store, *id).is_some_and(|(p, _)| p == page)
            } else {
                store.get(page, *id).is_some()
            }
        });
    }
}

/// Outcome counts of a batch extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Values newly extracted and cached
    pub extracted: usize,
    /// Pairs skipped because a value was already cached
    pub cached: usize,
    /// Pairs with no governing region
    pub unresolved: usize,
    /// Pairs whose extraction failed
    pub failed: usize,
}

/// Region template and extraction engine for one document
pub struct Engine {
    state: EngineState,
    history: History<EngineState>,
    clipboard: Clipboard,
    config: EngineConfig,
    page_count: u32,
}

impl Engine {
    pub fn new(page_count: u32, config: EngineConfig) -> Self {
        Self {
            state: EngineState::new(),
            history: History::with_depth(config.history_depth),
            clipboard: Clipboard::new(),
            config,
            page_count,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    fn check_page(&self, page: u32) -> Result<()> {
        if page == 0 || page > self.page_count {
            return Err(EngineError::PageOutOfRange {
                page,
                count: self.page_count,
            });
        }
        Ok(())
    }

    /// Run a mutation as one history step. Nothing is recorded if the
    /// mutation leaves the state unchanged.
    fn transact<T>(&mut self, action: &'static str, mutate: impl FnOnce(&mut EngineState) -> T) -> T {
        let before = self.state.clone();
        let out = mutate(&mut self.state);
        if self.state != before {
            tracing::trace!(action, "Recorded history step");
            self.history.record(before);
        }
        out
    }

    // ============================================
    // Queries
    // ============================================

    pub fn current_page(&self) -> u32 {
        self.state.current_page
    }

    /// Real regions on a page in creation order
    pub fn regions(&self, page: u32) -> &[Region] {
        self.state.store.regions(page)
    }

    /// Real regions followed by template ghosts
    pub fn effective_regions(&self, page: u32) -> Vec<Region> {
        self.state.templates.effective_regions(&self.state.store, page)
    }

    /// Geometry that governs `(page, field)`, if any
    pub fn resolve(&self, page: u32, field: FieldType) -> Option<Resolution> {
        self.state.templates.resolve(&self.state.store, page, field)
    }

    pub fn template(&self, field: FieldType) -> Option<&Template> {
        self.state.templates.template(field)
    }

    pub fn master_page(&self, field: FieldType) -> Option<u32> {
        self.state.templates.master_page(field)
    }

    pub fn is_excluded(&self, page: u32, field: FieldType) -> bool {
        self.state.templates.is_excluded(page, field)
    }

    pub fn cached(&self, page: u32, field: FieldType) -> Option<&str> {
        self.state.cache.get(page, field)
    }

    pub fn document_value(&self, field: FieldType) -> Option<&str> {
        self.state.documents.get(field)
    }

    pub fn selection(&self) -> &Selection {
        &self.state.selection
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ============================================
    // Navigation and selection
    // ============================================

    /// Switch page; the selection does not carry over
    pub fn set_current_page(&mut self, page: u32) -> Result<()> {
        self.check_page(page)?;
        if page != self.state.current_page {
            self.state.current_page = page;
            self.state.selection.clear();
        }
        Ok(())
    }

    /// Replace the selection with the ids that exist on the current page
    pub fn select(&mut self, ids: impl IntoIterator<Item = RegionId>) {
        self.state.selection = ids.into_iter().collect();
        self.state.prune_selection();
    }

    /// Add or remove one id from the selection
    pub fn toggle_selection(&mut self, id: RegionId) {
        if !self.state.selection.remove(&id) {
            self.state.selection.insert(id);
            self.state.prune_selection();
        }
    }

    pub fn clear_selection(&mut self) {
        self.state.selection.clear();
    }

    // ============================================
    // Geometry edits
    // ============================================

    /// Add a region drawn on a canvas.
    ///
    /// Draws smaller than `min_draw_px` on either side are click noise and
    /// are discarded without touching state.
    pub fn add_region(
        &mut self,
        page: u32,
        field: FieldType,
        rect: PixelRect,
        canvas: CanvasSize,
    ) -> Result<Option<Region>> {
        self.check_page(page)?;
        if canvas.is_degenerate()
            || rect.width < self.config.min_draw_px
            || rect.height < self.config.min_draw_px
        {
            tracing::debug!(page, field = %field, "Discarded draw below minimum size");
            return Ok(None);
        }

        let normalized = rect.normalize(canvas);
        let region = self.transact("draw", |state| {
            let region = state.store.insert(page, field, normalized);
            state.geometry_changed(page, field, true);
            region
        });
        tracing::debug!(page, field = %field, id = %region.id, "Region added");
        Ok(Some(region))
    }

    /// Move regions on the current page as a rigid group.
    ///
    /// Ghosts in `ids` are promoted to overrides first. The displacement is
    /// clamped jointly so every member stays on the page. Returns the
    /// applied normalized displacement.
    pub fn move_regions(&mut self, ids: &[RegionId], dx_px: f64, dy_px: f64, canvas: CanvasSize) -> (f64, f64) {
        if canvas.is_degenerate() || ids.is_empty() {
            return (0.0, 0.0);
        }
        let dx = dx_px / canvas.width;
        let dy = dy_px / canvas.height;

        self.transact("move", |state| {
            let page = state.current_page;
            let mut members = Vec::with_capacity(ids.len());
            for &id in ids {
                if id.is_ghost() {
                    if let Some(region) = state.promote_ghost(page, id) {
                        members.push(region.id);
                    }
                } else if state.store.get(page, id).is_some() {
                    members.push(id);
                }
            }
            if members.is_empty() {
                return (0.0, 0.0);
            }

            let applied = state.store.translate_group(page, &members, dx, dy);

            let fields: BTreeSet<FieldType> = members
                .iter()
                .filter_map(|id| state.store.get(page, *id))
                .map(|r| r.field_type)
                .collect();
            for field in fields {
                state.geometry_changed(page, field, false);
            }
            applied
        })
    }

    /// Move the current selection
    pub fn move_selection(&mut self, dx_px: f64, dy_px: f64, canvas: CanvasSize) -> (f64, f64) {
        let ids: Vec<RegionId> = self.state.selection.iter().copied().collect();
        self.move_regions(&ids, dx_px, dy_px, canvas)
    }

    /// Promote a ghost on the current page to a page-local override
    pub fn promote_ghost_to_override(&mut self, id: RegionId) -> Option<Region> {
        self.transact("promote", |state| {
            let page = state.current_page;
            let region = state.promote_ghost(page, id)?;
            state.geometry_changed(page, region.field_type, false);
            Some(region)
        })
    }

    /// Delete regions from the current page. Returns how many regions were
    /// removed or excluded, including cascaded template removals.
    pub fn delete_regions(&mut self, ids: &[RegionId]) -> usize {
        self.transact("delete", |state| {
            let page = state.current_page;
            state.delete(page, ids)
        })
    }

    pub fn delete_selection(&mut self) -> usize {
        let ids: Vec<RegionId> = self.state.selection.iter().copied().collect();
        self.delete_regions(&ids)
    }

    /// Designate a new master page for a page-level field.
    ///
    /// If the page already has a region of the field, its latest one
    /// becomes the template.
    pub fn set_master_page(&mut self, field: FieldType, page: u32) -> Result<()> {
        self.check_page(page)?;
        if field.is_document_level() {
            return Err(EngineError::NotPageLevel(field));
        }
        self.transact("set master page", |state| {
            state.templates.set_master_page(field, page);
            state.sync_template(page, field);
        });
        tracing::info!(page, field = %field, "Master page designated");
        Ok(())
    }

    // ============================================
    // Clipboard
    // ============================================

    /// Copy the selected regions (ghosts included) to the clipboard
    pub fn copy_selection(&mut self) -> usize {
        let page = self.state.current_page;
        let regions: Vec<Region> = self
            .state
            .selection
            .iter()
            .filter_map(|&id| {
                if id.is_ghost() {
                    self.state
                        .templates
                        .ghost(&self.state.store, id)
                        .filter(|(p, _)| *p == page)
                        .map(|(_, r)| r)
                } else {
                    self.state.store.get(page, id).copied()
                }
            })
            .collect();
        if regions.is_empty() {
            return 0;
        }
        self.clipboard.copy(&regions)
    }

    /// Copy then delete the selection as one history step
    pub fn cut_selection(&mut self) -> usize {
        let copied = self.copy_selection();
        if copied == 0 {
            return 0;
        }
        let ids: Vec<RegionId> = self.state.selection.iter().copied().collect();
        self.transact("cut", |state| {
            let page = state.current_page;
            state.delete(page, &ids);
        });
        copied
    }

    /// Paste the clipboard onto `page` with its top-left corner at `anchor`.
    ///
    /// Pasted regions get fresh ids and follow the same master page rule as
    /// a draw. When pasting onto the current page they become the selection.
    pub fn paste(&mut self, page: u32, anchor: Anchor) -> Result<Vec<Region>> {
        self.check_page(page)?;
        if self.clipboard.is_empty() {
            return Ok(Vec::new());
        }
        let layout = self.clipboard.layout(anchor, self.config.paste_nudge);

        let pasted = self.transact("paste", |state| {
            let pasted: Vec<Region> = layout
                .into_iter()
                .map(|(field, rect)| {
                    let region = state.store.insert(page, field, rect);
                    state.geometry_changed(page, field, true);
                    region
                })
                .collect();
            if page == state.current_page {
                state.selection = pasted.iter().map(|r| r.id).collect();
            }
            pasted
        });
        tracing::debug!(page, count = pasted.len(), "Pasted regions");
        Ok(pasted)
    }

    // ============================================
    // History
    // ============================================

    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        let next_id = self.state.store.next_id();
        match self.history.undo(self.state.clone()) {
            Some(previous) => {
                self.restore(previous, next_id);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        let next_id = self.state.store.next_id();
        match self.history.redo(self.state.clone()) {
            Some(next) => {
                self.restore(next, next_id);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, state: EngineState, next_id: u64) {
        self.state = state;
        // Ids handed out after the snapshot stay retired
        self.state.store.advance_ids_past(next_id);
    }

    // ============================================
    // Extraction
    // ============================================

    /// Extract one page-level field, using the cache when possible.
    ///
    /// Returns `None` when no geometry governs the pair.
    pub async fn extract_field(
        &mut self,
        pipeline: &ExtractionPipeline,
        page: u32,
        field: FieldType,
    ) -> Result<Option<String>> {
        self.check_page(page)?;
        if field.is_document_level() {
            return Err(EngineError::NotPageLevel(field));
        }
        if let Some(value) = self.state.cache.get(page, field) {
            tracing::debug!(page, field = %field, "Using cached value");
            return Ok(Some(value.to_string()));
        }
        let Some(resolution) = self.resolve(page, field) else {
            tracing::warn!(page, field = %field, "No region governs field, skipping");
            return Ok(None);
        };

        let extraction = pipeline.extract(page, field, resolution.rect()).await?;
        tracing::debug!(
            page,
            field = %field,
            method = ?extraction.method,
            from_template = !resolution.is_override(),
            "Extracted field"
        );
        self.state.cache.insert(page, field, extraction.value.clone());
        Ok(Some(extraction.value))
    }

    /// Extract a document-level field from its most recent region
    pub async fn extract_document_field(
        &mut self,
        pipeline: &ExtractionPipeline,
        field: FieldType,
    ) -> Result<Option<String>> {
        if field.is_page_level() {
            return Err(EngineError::NotDocumentLevel(field));
        }
        if let Some(value) = self.state.documents.get(field) {
            return Ok(Some(value.to_string()));
        }
        let Some((page, region)) = self.state.store.latest_anywhere(field) else {
            tracing::warn!(field = %field, "No region drawn for document field");
            return Ok(None);
        };
        let rect = region.rect;

        let extraction = pipeline.extract(page, field, rect).await?;
        tracing::debug!(page, field = %field, method = ?extraction.method, "Extracted document field");
        self.state.documents.set(field, extraction.value.clone());
        Ok(Some(extraction.value))
    }

    /// Set a document-level value by hand
    pub fn set_document_value(&mut self, field: FieldType, value: impl Into<String>) -> Result<()> {
        if field.is_page_level() {
            return Err(EngineError::NotDocumentLevel(field));
        }
        self.state.documents.set(field, value.into());
        Ok(())
    }

    /// Extract every uncached page-level field on every page, then any
    /// document-level field without a value.
    ///
    /// Pages are processed in groups of `batch_size`, yielding to the
    /// runtime between groups. Unresolved pairs and failed extractions are
    /// logged and skipped. An unrecoverable document failure aborts the
    /// batch; values cached before it are kept. A pipeline over a document
    /// with a different page count is rejected before anything is read.
    pub async fn apply_templates_to_all_pages(&mut self, pipeline: &ExtractionPipeline) -> Result<BatchReport> {
        let document = pipeline.page_count();
        if document != self.page_count {
            return Err(EngineError::PageCountMismatch {
                engine: self.page_count,
                document,
            });
        }

        let mut report = BatchReport::default();
        let pages: Vec<u32> = (1..=self.page_count).collect();

        for (batch, group) in pages.chunks(self.config.batch_size.max(1)).enumerate() {
            if batch > 0 {
                tokio::task::yield_now().await;
            }
            for &page in group {
                for field in FieldType::PAGE {
                    if self.state.cache.contains(page, field) {
                        report.cached += 1;
                        continue;
                    }
                    let Some(resolution) = self.resolve(page, field) else {
                        tracing::warn!(page, field = %field, "No region governs field, skipping");
                        report.unresolved += 1;
                        continue;
                    };

                    match pipeline.extract(page, field, resolution.rect()).await {
                        Ok(extraction) => {
                            self.state.cache.insert(page, field, extraction.value);
                            report.extracted += 1;
                        }
                        Err(e) if e.is_fatal_to_batch() => {
                            tracing::error!(page, field = %field, "Batch extraction aborted: {}", e);
                            return Err(e);
                        }
                        Err(e) => {
                            tracing::warn!(page, field = %field, "Extraction failed: {}", e);
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        for field in FieldType::DOCUMENT {
            if self.state.documents.get(field).is_some()
                || self.state.store.latest_anywhere(field).is_none()
            {
                continue;
            }
            match self.extract_document_field(pipeline, field).await {
                Ok(_) => report.extracted += 1,
                Err(e) if e.is_fatal_to_batch() => {
                    tracing::error!(field = %field, "Batch extraction aborted: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(field = %field, "Extraction failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            pages = self.page_count,
            extracted = report.extracted,
            cached = report.cached,
            unresolved = report.unresolved,
            failed = report.failed,
            "Batch extraction finished"
        );
        Ok(report)
    }

    /// Snapshot of every extracted value
    pub fn export(&self) -> ExtractionRecord {
        ExtractionRecord::build(self.page_count, &self.state.cache, &self.state.documents)
    }
}
