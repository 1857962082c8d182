//! Document state model
//!
//! A document is an ordered list of page entries drawn from any number of
//! loaded source files, plus the annotation map keyed by page position.
//! Every structural change goes through [`Document`] so the page list and the
//! annotation map are reindexed together.

use crate::annotation::{Annotation, AnnotationMap};
use crate::error::{EditorError, EditorResult};
use pdf_engine::{normalize_rotation, DocumentHandle, PageSize, RasterFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Identifier of a loaded source file
pub type SourceId = u64;

/// Stable identity of a page entry, independent of its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(uuid::Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Pdf { handle: DocumentHandle },
    /// A raster image shown as a single page, one pixel per document unit.
    Image { format: RasterFormat, width: u32, height: u32 },
}

/// A loaded input file and the facts needed to re-render or export its pages.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub id: SourceId,
    pub name: String,
    pub bytes: Arc<Vec<u8>>,
    pub kind: SourceKind,
    pub page_sizes: Vec<PageSize>,
}

impl SourceDocument {
    pub fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, SourceKind::Image { .. })
    }

    pub fn page_size(&self, page_index: u32) -> EditorResult<PageSize> {
        self.page_sizes.get(page_index as usize).copied().ok_or(EditorError::PageOutOfRange {
            index: page_index as usize,
            page_count: self.page_sizes.len(),
        })
    }
}

/// Geometry-relevant facts of a page, without its rasters.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDescriptor {
    pub page_id: PageId,
    pub source_id: SourceId,
    pub source_page_index: u32,
    pub rotation: u16,
    pub is_single_image_page: bool,
}

/// One page of the working document
///
/// `raster` is the pristine render that annotations are painted over;
/// annotation coordinates are pixels of this raster.
#[derive(Debug, Clone)]
pub struct PageEntry {
    pub id: PageId,
    pub source_id: SourceId,
    pub source_page_index: u32,
    pub source_name: String,
    /// Extra clockwise rotation applied on top of the page's own.
    pub rotation: u16,
    pub is_single_image_page: bool,
    pub page_size: PageSize,
    pub raster: Arc<RgbaImage>,
    pub thumbnail: Arc<RgbaImage>,
}

impl PageEntry {
    pub fn descriptor(&self) -> PageDescriptor {
        PageDescriptor {
            page_id: self.id,
            source_id: self.source_id,
            source_page_index: self.source_page_index,
            rotation: self.rotation,
            is_single_image_page: self.is_single_image_page,
        }
    }

    pub fn raster_size(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    /// Page size in document units as displayed.
    pub fn displayed_size(&self) -> (f32, f32) {
        self.page_size.displayed(self.rotation)
    }

    /// Intrinsic plus applied rotation.
    pub fn effective_rotation(&self) -> u16 {
        normalize_rotation(self.page_size.rotation as i32 + self.rotation as i32)
    }
}

#[derive(Debug, Default)]
pub struct Document {
    sources: BTreeMap<SourceId, SourceDocument>,
    pages: Vec<PageEntry>,
    annotations: AnnotationMap,
    next_source_id: SourceId,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[PageEntry] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> EditorResult<&PageEntry> {
        self.pages.get(index).ok_or(EditorError::PageOutOfRange {
            index,
            page_count: self.pages.len(),
        })
    }

    pub fn page_mut(&mut self, index: usize) -> EditorResult<&mut PageEntry> {
        let page_count = self.pages.len();
        self.pages.get_mut(index).ok_or(EditorError::PageOutOfRange { index, page_count })
    }

    pub fn position_of(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|page| page.id == id)
    }

    pub fn annotations(&self) -> &AnnotationMap {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut AnnotationMap {
        &mut self.annotations
    }

    pub fn set_annotations(&mut self, annotations: AnnotationMap) {
        debug_assert_eq!(annotations.page_count(), self.pages.len());
        self.annotations = annotations;
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceDocument> {
        self.sources.values()
    }

    pub fn source(&self, id: SourceId) -> EditorResult<&SourceDocument> {
        self.sources.get(&id).ok_or(EditorError::MissingSource(id))
    }

    pub fn allocate_source_id(&mut self) -> SourceId {
        self.next_source_id += 1;
        self.next_source_id
    }

    pub fn add_source(&mut self, source: SourceDocument) {
        self.sources.insert(source.id, source);
    }

    /// Inserts pages at `at` (clamped to the end) with empty annotation lists.
    pub fn insert_pages(&mut self, at: usize, entries: Vec<PageEntry>) {
        let at = at.min(self.pages.len());
        let count = entries.len();
        self.pages.splice(at..at, entries);
        self.annotations.insert_pages(at, count);
    }

    pub fn append_pages(&mut self, entries: Vec<PageEntry>) {
        self.insert_pages(self.pages.len(), entries);
    }

    /// Moves a page; both indices must be in range.
    pub fn move_page(&mut self, from: usize, to: usize) -> EditorResult<()> {
        let page_count = self.pages.len();
        for index in [from, to] {
            if index >= page_count {
                return Err(EditorError::PageOutOfRange { index, page_count });
            }
        }
        if from == to {
            return Ok(());
        }
        let page = self.pages.remove(from);
        self.pages.insert(to, page);
        self.annotations.move_page(from, to);
        Ok(())
    }

    /// Removes a page with its annotations; the last page cannot go.
    pub fn remove_page(&mut self, index: usize) -> EditorResult<(PageEntry, Vec<Annotation>)> {
        if index >= self.pages.len() {
            return Err(EditorError::PageOutOfRange { index, page_count: self.pages.len() });
        }
        if self.pages.len() == 1 {
            return Err(EditorError::LastPage);
        }
        let page = self.pages.remove(index);
        let annotations = self.annotations.delete_page(index);
        Ok((page, annotations))
    }

    /// Swaps in a whole new page list and matching annotation map.
    pub fn replace_structure(&mut self, pages: Vec<PageEntry>, annotations: AnnotationMap) {
        debug_assert_eq!(pages.len(), annotations.page_count());
        self.pages = pages;
        self.annotations = annotations;
    }

    pub fn clear(&mut self) {
        self.sources.clear();
        self.pages.clear();
        self.annotations = AnnotationMap::default();
    }

    /// Page keys and annotation keys agree.
    pub fn is_consistent(&self) -> bool {
        self.annotations.page_count() == self.pages.len()
    }
}
