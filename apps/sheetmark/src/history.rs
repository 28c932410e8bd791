//! Undo/redo history
//!
//! Linear, snapshot-based history. A snapshot of the full engine state is
//! recorded before every mutating action; recording clears the redo stack.
//! Snapshots are owned values, so later mutation of live state can never
//! reach back into a stored snapshot.

use std::collections::VecDeque;

/// Default number of undo steps kept
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// Bounded undo stack with a parallel redo stack
#[derive(Debug, Clone)]
pub struct History<S> {
    undo: VecDeque<S>,
    redo: Vec<S>,
    depth: usize,
}

impl<S> Default for History<S> {
    fn default() -> Self {
        Self::with_depth(DEFAULT_HISTORY_DEPTH)
    }
}

impl<S> History<S> {
    /// A depth of zero is treated as one
    pub fn with_depth(depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            depth: depth.max(1),
        }
    }

    /// Record the state as it was before a mutation
    pub fn record(&mut self, before: S) {
        self.push_undo(before);
        self.redo.clear();
    }

    fn push_undo(&mut self, snapshot: S) {
        self.undo.push_back(snapshot);
        while self.undo.len() > self.depth {
            self.undo.pop_front();
        }
    }

    /// Step back. `current` moves to the redo stack; the returned snapshot
    /// should be restored.
    pub fn undo(&mut self, current: S) -> Option<S> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward. `current` moves to the undo stack.
    pub fn redo(&mut self, current: S) -> Option<S> {
        let next = self.redo.pop()?;
        self.push_undo(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
