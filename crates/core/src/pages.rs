//! Page management
//!
//! Structural operations on the working document: reorder, rotate, delete,
//! duplicate, plus the multi-select extract mode. Each operation validates
//! first, then records a structural snapshot, then mutates; a rejected
//! operation leaves both the model and the history untouched.

use crate::annotation::Annotation;
use crate::document::{PageEntry, PageId};
use crate::error::{EditorError, EditorResult};
use crate::ingest::PageRasterizer;
use crate::interaction::InteractionState;
use crate::notice::Notice;
use crate::session::{quarter_turns, rotate_annotations, EditorSession};
use pdf_engine::normalize_rotation;
use std::collections::HashSet;

impl EditorSession {
    pub(crate) fn ensure_structure_idle(&mut self) -> EditorResult<()> {
        if self.is_restoring() {
            self.notices.push(Notice::warning("Please wait for the restore to finish"));
            return Err(EditorError::Busy("restoring"));
        }
        if self.is_loading_files() {
            self.notices.push(Notice::warning("Please wait for files to finish loading"));
            return Err(EditorError::Busy("loading files"));
        }
        Ok(())
    }

    /// Drops in-flight pointer work before page positions change.
    fn prepare_structure_change(&mut self) {
        self.revert_pointer_interaction();
        if matches!(self.interaction, InteractionState::EditingText { .. }) {
            self.interaction = InteractionState::Idle;
        }
    }

    /// Moves the page at `from` so it ends up at `to`.
    pub fn move_page(&mut self, from: usize, to: usize) -> EditorResult<()> {
        self.ensure_structure_idle()?;
        if self.is_extract_mode() {
            self.notices.push(Notice::warning("Finish extracting pages before reordering"));
            return Err(EditorError::InvalidOperation(
                "pages cannot be reordered while extracting".to_owned(),
            ));
        }
        let page_count = self.page_count();
        for index in [from, to] {
            if index >= page_count {
                return Err(EditorError::PageOutOfRange { index, page_count });
            }
        }
        if from == to {
            return Ok(());
        }

        self.prepare_structure_change();
        self.push_structure_snapshot();
        self.document.move_page(from, to)?;
        self.revalidate_selection();
        tracing::info!(from, to, "page moved");
        Ok(())
    }

    /// Rotates a page by a multiple of 90 degrees (clockwise when positive).
    /// Annotations turn with the page content.
    pub fn rotate_page(&mut self, index: usize, degrees: i32) -> EditorResult<()> {
        self.ensure_structure_idle()?;
        if degrees % 90 != 0 {
            return Err(EditorError::InvalidOperation(format!(
                "rotation must be a multiple of 90 degrees, got {degrees}"
            )));
        }
        let page = self.document.page(index)?.clone();
        let rotation = normalize_rotation(page.rotation as i32 + degrees);
        if rotation == page.rotation {
            return Ok(());
        }

        let rendered = {
            let rasterizer = PageRasterizer { engine: self.engine.as_ref(), config: &self.config };
            self.document.source(page.source_id).and_then(|source| {
                rasterizer.entry_with_id(page.id, source, page.source_page_index, rotation)
            })
        };
        let entry = match rendered {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(page = index, error = %err, "rotation render failed");
                self.notices.push(Notice::error(format!("Could not rotate page: {err}")));
                return Err(err);
            }
        };

        self.prepare_structure_change();
        self.push_structure_snapshot();
        let mut annotations = self.document.annotations().page(index).to_vec();
        let (width, height) = page.raster_size();
        rotate_annotations(
            &mut annotations,
            quarter_turns(page.rotation, rotation),
            (width as f32, height as f32),
            &self.metrics,
        );
        self.document.annotations_mut().replace_page(index, annotations);
        *self.document.page_mut(index)? = entry;
        tracing::info!(page = index, rotation, "page rotated");
        Ok(())
    }

    /// Deletes a page and its annotations. The last remaining page cannot be
    /// deleted.
    pub fn delete_page(&mut self, index: usize) -> EditorResult<()> {
        self.ensure_structure_idle()?;
        self.document.page(index)?;
        if self.page_count() == 1 {
            self.notices.push(Notice::error("Cannot delete the last page"));
            return Err(EditorError::LastPage);
        }

        self.prepare_structure_change();
        self.push_structure_snapshot();
        let viewed = self.selected_page();
        let (removed, annotations) = self.document.remove_page(index)?;

        if let Some(extract) = &mut self.extract_selection {
            extract.remove(&removed.id);
        }
        if viewed == Some(index) {
            let fallback = index.min(self.page_count().saturating_sub(1));
            self.viewed_page = self.document.pages().get(fallback).map(|page| page.id);
        }
        self.revalidate_selection();
        self.notices.push(Notice::info("Page deleted"));
        tracing::info!(page = index, annotations = annotations.len(), "page deleted");
        Ok(())
    }

    /// Inserts a copy of a page, with copies of its annotations, right after it.
    pub fn duplicate_page(&mut self, index: usize) -> EditorResult<usize> {
        self.ensure_structure_idle()?;
        let page = self.document.page(index)?;
        let copy = PageEntry { id: PageId::new(), ..page.clone() };
        let annotations: Vec<Annotation> = self
            .document
            .annotations()
            .page(index)
            .iter()
            .map(|annotation| Annotation::new(annotation.kind.clone()))
            .collect();

        self.prepare_structure_change();
        self.push_structure_snapshot();
        let at = index + 1;
        self.document.insert_pages(at, vec![copy]);
        self.document.annotations_mut().replace_page(at, annotations);
        self.revalidate_selection();
        tracing::info!(page = index, copy = at, "page duplicated");
        Ok(at)
    }

    // ---------------------------------------------------------------
    // Extract mode
    // ---------------------------------------------------------------

    pub fn is_extract_mode(&self) -> bool {
        self.extract_selection.is_some()
    }

    pub fn enter_extract_mode(&mut self) {
        if self.extract_selection.is_none() {
            self.revert_pointer_interaction();
            self.extract_selection = Some(HashSet::new());
            tracing::debug!("extract mode entered");
        }
    }

    pub fn exit_extract_mode(&mut self) {
        if self.extract_selection.take().is_some() {
            tracing::debug!("extract mode left");
        }
    }

    /// Flips whether a page is chosen for extraction; returns the new state.
    pub fn toggle_extract_selection(&mut self, index: usize) -> EditorResult<bool> {
        let id = self.document.page(index)?.id;
        let Some(selection) = &mut self.extract_selection else {
            return Err(EditorError::InvalidOperation("extract mode is not active".to_owned()));
        };
        let chosen = if selection.remove(&id) {
            false
        } else {
            selection.insert(id);
            true
        };
        Ok(chosen)
    }

    /// Positions chosen for extraction, in document order.
    pub fn extract_selection(&self) -> Vec<usize> {
        let Some(selection) = &self.extract_selection else {
            return Vec::new();
        };
        self.document
            .pages()
            .iter()
            .enumerate()
            .filter(|(_, page)| selection.contains(&page.id))
            .map(|(index, _)| index)
            .collect()
    }
}
