//! Undo/redo history
//!
//! Two independent stacks: one for annotation edits and one for page
//! structure (order, rotation, membership). Both store whole snapshots, are
//! bounded, and evict their oldest entry once full.

use crate::annotation::{Annotation, AnnotationMap};
use crate::document::{PageDescriptor, PageEntry, PageId};
use std::collections::{HashMap, VecDeque};

/// Bounded undo stack with its redo companion (most recent last)
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    undo_stack: VecDeque<T>,
    redo_stack: Vec<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        Self { undo_stack: VecDeque::new(), redo_stack: Vec::new(), capacity: capacity.max(1) }
    }

    /// Records a new state; any redo entries become unreachable.
    pub fn push(&mut self, entry: T) {
        self.redo_stack.clear();
        self.push_undo(entry);
    }

    /// Pushes without touching the redo stack (used after redo, or to put
    /// back an entry whose restore failed).
    pub fn push_undo(&mut self, entry: T) {
        self.undo_stack.push_back(entry);
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
            tracing::trace!(capacity = self.capacity, "evicted oldest history entry");
        }
    }

    pub fn push_redo(&mut self, entry: T) {
        self.redo_stack.push(entry);
    }

    pub fn pop_undo(&mut self) -> Option<T> {
        self.undo_stack.pop_back()
    }

    pub fn pop_redo(&mut self) -> Option<T> {
        self.redo_stack.pop()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// Annotation lists keyed by page identity rather than position, so the
/// snapshot stays meaningful when pages are reordered in between.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationSnapshot {
    pages: HashMap<PageId, Vec<Annotation>>,
}

impl AnnotationSnapshot {
    pub fn capture(pages: &[PageEntry], annotations: &AnnotationMap) -> Self {
        Self {
            pages: pages
                .iter()
                .enumerate()
                .map(|(index, page)| (page.id, annotations.page(index).to_vec()))
                .collect(),
        }
    }

    /// Rebuilds a positional map for the current page order. Pages the
    /// snapshot does not know keep their current annotations.
    pub fn restore(&self, pages: &[PageEntry], current: &AnnotationMap) -> AnnotationMap {
        AnnotationMap::from_lists(
            pages
                .iter()
                .enumerate()
                .map(|(index, page)| match self.pages.get(&page.id) {
                    Some(list) => list.clone(),
                    None => current.page(index).to_vec(),
                })
                .collect(),
        )
    }

    pub fn annotation_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }
}

/// Page order and geometry, plus each page's annotations at capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralSnapshot {
    pub pages: Vec<PageDescriptor>,
    pub annotations: Vec<Vec<Annotation>>,
}

impl StructuralSnapshot {
    pub fn capture(pages: &[PageEntry], annotations: &AnnotationMap) -> Self {
        Self {
            pages: pages.iter().map(PageEntry::descriptor).collect(),
            annotations: (0..pages.len()).map(|index| annotations.page(index).to_vec()).collect(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Debug, Clone)]
pub struct History {
    pub annotations: BoundedHistory<AnnotationSnapshot>,
    pub structure: BoundedHistory<StructuralSnapshot>,
}

impl History {
    pub fn new(depth: usize) -> Self {
        Self { annotations: BoundedHistory::new(depth), structure: BoundedHistory::new(depth) }
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
        self.structure.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_clears_redo() {
        let mut history = BoundedHistory::new(10);
        history.push(1);
        history.push(2);
        let undone = history.pop_undo().expect("entry should exist");
        history.push_redo(undone);
        assert!(history.can_redo());

        history.push(3);
        assert!(!history.can_redo());
        assert_eq!(history.undo_count(), 2);
    }

    #[test]
    fn oldest_entry_is_evicted_at_capacity() {
        let mut history = BoundedHistory::new(3);
        for entry in 0..5 {
            history.push(entry);
        }

        assert_eq!(history.undo_count(), 3);
        assert_eq!(history.pop_undo(), Some(4));
        assert_eq!(history.pop_undo(), Some(3));
        assert_eq!(history.pop_undo(), Some(2));
        assert_eq!(history.pop_undo(), None);
    }

    #[test]
    fn push_undo_keeps_redo_entries() {
        let mut history = BoundedHistory::new(3);
        history.push_redo("later");
        history.push_undo("earlier");

        assert!(history.can_redo());
        assert!(history.can_undo());
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let mut history = BoundedHistory::new(0);
        history.push('a');
        history.push('b');
        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.pop_undo(), Some('b'));
    }
}
