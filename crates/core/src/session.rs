//! Editor session
//!
//! [`EditorSession`] is the single owner of all editing state: the working
//! document, the image registry, both history stacks, the selection and the
//! interaction state machine. Hosts drive it through plain method calls and
//! drain user-facing notices after each call.

use crate::annotation::{Annotation, AnnotationId, AnnotationMap, Selection};
use crate::config::{EditorConfig, TextDefaults};
use crate::document::{Document, PageEntry, PageId};
use crate::error::{EditorError, EditorResult};
use crate::fonts::StandardFontMetrics;
use crate::geometry::{Point, Rect};
use crate::history::{AnnotationSnapshot, History, StructuralSnapshot};
use crate::images::ImageRegistry;
use crate::ingest::{open_source, IncomingFile, PageRasterizer};
use crate::interaction::{GestureTracker, InteractionState, Tool};
use crate::notice::{Notice, NoticeQueue};
use crate::renderer::{self, Overlay, RenderContext};
use crate::surface::{RasterSurface, Surface};
use ab_glyph::FontArc;
use pdf_engine::{LopdfEngine, PdfEngine, RgbaImage};
use std::collections::HashSet;
use std::path::Path;

/// Which history stack an undo/redo targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStack {
    Annotations,
    Structure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreDirection {
    Undo,
    Redo,
}

/// A structural snapshot popped off its stack and waiting to be applied.
///
/// While one is outstanding the session reports `is_restoring()`, and any
/// further structural undo/redo is rejected.
#[derive(Debug)]
pub struct PendingRestore {
    direction: RestoreDirection,
    snapshot: StructuralSnapshot,
}

/// Per-file outcome of an ingest batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub pages_added: usize,
    pub files_loaded: Vec<String>,
    pub files_failed: Vec<String>,
}

/// A file that has been opened but whose pages are not yet in the document.
#[derive(Debug)]
pub struct PendingIngest {
    at: usize,
    files: Vec<IncomingFile>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SelectedAnnotation {
    pub(crate) selection: Selection,
    pub(crate) id: AnnotationId,
}

pub struct EditorSession {
    pub(crate) config: EditorConfig,
    pub(crate) engine: Box<dyn PdfEngine>,
    pub(crate) metrics: StandardFontMetrics,
    pub(crate) document: Document,
    pub(crate) images: ImageRegistry,
    pub(crate) history: History,
    pub(crate) notices: NoticeQueue,
    pub(crate) selected: Option<SelectedAnnotation>,
    pub(crate) viewed_page: Option<PageId>,
    pub(crate) tool: Tool,
    pub(crate) interaction: InteractionState,
    pub(crate) gestures: GestureTracker,
    pub(crate) locked_notified: HashSet<AnnotationId>,
    pub(crate) text_style: TextDefaults,
    pub(crate) extract_selection: Option<HashSet<PageId>>,
    pub(crate) zoom_index: usize,
    glyph_font: Option<FontArc>,
    is_loading_files: bool,
    is_restoring: bool,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("pages", &self.document.page_count())
            .field("annotations", &self.document.annotations().total())
            .field("tool", &self.tool)
            .field("interaction", &self.interaction)
            .field("is_loading_files", &self.is_loading_files)
            .field("is_restoring", &self.is_restoring)
            .finish()
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_engine(config, Box::new(LopdfEngine::new()))
    }

    pub fn with_engine(config: EditorConfig, engine: Box<dyn PdfEngine>) -> Self {
        let zoom_index = default_zoom_index(&config.zoom_steps);
        let glyph_font = config.glyph_font.as_deref().and_then(read_glyph_font);
        Self {
            history: History::new(config.history_depth),
            text_style: config.text.clone(),
            engine,
            metrics: StandardFontMetrics,
            document: Document::new(),
            images: ImageRegistry::new(),
            notices: NoticeQueue::default(),
            selected: None,
            viewed_page: None,
            tool: Tool::default(),
            interaction: InteractionState::Idle,
            gestures: GestureTracker::default(),
            locked_notified: HashSet::new(),
            extract_selection: None,
            zoom_index,
            glyph_font,
            is_loading_files: false,
            is_restoring: false,
            config,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn images(&self) -> &ImageRegistry {
        &self.images
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    pub fn annotations(&self, page_index: usize) -> &[Annotation] {
        self.document.annotations().page(page_index)
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selected.map(|selected| selected.selection)
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.selection().and_then(|selection| self.document.annotations().get(selection))
    }

    pub fn text_style(&self) -> &TextDefaults {
        &self.text_style
    }

    pub fn is_loading_files(&self) -> bool {
        self.is_loading_files
    }

    pub fn is_restoring(&self) -> bool {
        self.is_restoring
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    pub fn notices(&self) -> &[Notice] {
        self.notices.peek()
    }

    /// Position of the page the host is showing, tracked by identity.
    pub fn selected_page(&self) -> Option<usize> {
        self.viewed_page.and_then(|id| self.document.position_of(id))
    }

    pub fn select_page(&mut self, index: usize) -> EditorResult<()> {
        let id = self.document.page(index)?.id;
        self.viewed_page = Some(id);
        tracing::debug!(page = index, "viewing page");
        Ok(())
    }

    pub fn zoom(&self) -> f32 {
        self.config.zoom_steps.get(self.zoom_index).copied().unwrap_or(1.0)
    }

    pub fn zoom_in(&mut self) -> f32 {
        if self.zoom_index + 1 < self.config.zoom_steps.len() {
            self.zoom_index += 1;
        }
        self.zoom()
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.zoom_index = self.zoom_index.saturating_sub(1);
        self.zoom()
    }

    /// Replaces the font used to draw text onto composited rasters.
    pub fn set_glyph_font(&mut self, bytes: Vec<u8>) -> EditorResult<()> {
        let font = RasterSurface::load_font(bytes).ok_or_else(|| {
            EditorError::InvalidOperation("glyph font is not a TrueType/OpenType font".to_owned())
        })?;
        self.glyph_font = Some(font);
        Ok(())
    }

    pub fn has_glyph_font(&self) -> bool {
        self.glyph_font.is_some()
    }

    /// Drops every source, page, annotation, image and history entry.
    pub fn reset(&mut self) {
        for source in self.document.sources() {
            if let crate::document::SourceKind::Pdf { handle } = source.kind {
                if let Err(err) = self.engine.close(handle) {
                    tracing::warn!(source = source.id, error = %err, "failed to close source");
                }
            }
        }
        self.document.clear();
        self.images.clear();
        self.history.clear();
        self.selected = None;
        self.viewed_page = None;
        self.interaction = InteractionState::Idle;
        self.gestures = GestureTracker::default();
        self.locked_notified.clear();
        self.extract_selection = None;
        self.zoom_index = default_zoom_index(&self.config.zoom_steps);
        tracing::info!("session reset");
    }

    // ---------------------------------------------------------------
    // Ingest
    // ---------------------------------------------------------------

    /// Appends the pages of every file in `files`.
    pub fn add_files(&mut self, files: Vec<IncomingFile>) -> EditorResult<IngestReport> {
        let at = self.document.page_count();
        self.insert_files_at(at, files)
    }

    /// Inserts the pages of every file at position `at` (clamped to the end).
    pub fn insert_files_at(
        &mut self,
        at: usize,
        files: Vec<IncomingFile>,
    ) -> EditorResult<IngestReport> {
        let pending = self.begin_loading(at, files)?;
        Ok(self.finish_loading(pending))
    }

    /// Claims the loading guard. Fails with a notice while another batch is
    /// still loading.
    pub fn begin_loading(
        &mut self,
        at: usize,
        files: Vec<IncomingFile>,
    ) -> EditorResult<PendingIngest> {
        if self.is_loading_files {
            self.notices.push(Notice::warning("Files are still loading"));
            return Err(EditorError::Busy("loading files"));
        }
        self.is_loading_files = true;
        Ok(PendingIngest { at, files })
    }

    /// Opens and renders the pending files, then releases the guard.
    pub fn finish_loading(&mut self, pending: PendingIngest) -> IngestReport {
        let mut report = IngestReport::default();
        let mut entries: Vec<PageEntry> = Vec::new();

        for file in pending.files {
            let name = file.name.clone();
            match self.load_file(file) {
                Ok(mut pages) => {
                    report.pages_added += pages.len();
                    report.files_loaded.push(name);
                    entries.append(&mut pages);
                }
                Err(err) => {
                    tracing::warn!(file = %name, error = %err, "failed to load file");
                    self.notices.push(Notice::error(format!("Could not load {name}: {err}")));
                    report.files_failed.push(name);
                }
            }
        }

        if !entries.is_empty() {
            self.push_structure_snapshot();
            let at = pending.at.min(self.document.page_count());
            let first_new = entries[0].id;
            self.document.insert_pages(at, entries);
            if self.viewed_page.is_none() {
                self.viewed_page = Some(first_new);
            }
            self.revalidate_selection();
            self.notices.push(Notice::success(format!("Added {} page(s)", report.pages_added)));
            tracing::info!(at, pages = report.pages_added, "inserted pages");
        }

        self.is_loading_files = false;
        report
    }

    fn load_file(&mut self, file: IncomingFile) -> EditorResult<Vec<PageEntry>> {
        let id = self.document.allocate_source_id();
        let source = open_source(self.engine.as_mut(), &self.config, id, file)?;
        let rasterizer = PageRasterizer { engine: self.engine.as_ref(), config: &self.config };
        let entries = (0..source.page_count())
            .map(|index| rasterizer.entry(&source, index, 0))
            .collect::<EditorResult<Vec<_>>>();
        match entries {
            Ok(entries) => {
                self.document.add_source(source);
                Ok(entries)
            }
            Err(err) => {
                if let crate::document::SourceKind::Pdf { handle } = source.kind {
                    if let Err(close_err) = self.engine.close(handle) {
                        tracing::warn!(source = id, error = %close_err, "failed to close source");
                    }
                }
                Err(err)
            }
        }
    }

    // ---------------------------------------------------------------
    // History
    // ---------------------------------------------------------------

    /// Records the current annotations before an edit.
    pub(crate) fn push_annotation_snapshot(&mut self) {
        let snapshot =
            AnnotationSnapshot::capture(self.document.pages(), self.document.annotations());
        self.history.annotations.push(snapshot);
        tracing::debug!(depth = self.history.annotations.undo_count(), "annotation snapshot");
    }

    /// Records the current page structure before a structural operation.
    pub(crate) fn push_structure_snapshot(&mut self) {
        let snapshot =
            StructuralSnapshot::capture(self.document.pages(), self.document.annotations());
        self.history.structure.push(snapshot);
        tracing::debug!(depth = self.history.structure.undo_count(), "structural snapshot");
    }

    pub fn can_undo(&self, stack: HistoryStack) -> bool {
        match stack {
            HistoryStack::Annotations => self.history.annotations.can_undo(),
            HistoryStack::Structure => self.history.structure.can_undo(),
        }
    }

    pub fn can_redo(&self, stack: HistoryStack) -> bool {
        match stack {
            HistoryStack::Annotations => self.history.annotations.can_redo(),
            HistoryStack::Structure => self.history.structure.can_redo(),
        }
    }

    /// Returns `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self, stack: HistoryStack) -> EditorResult<bool> {
        match stack {
            HistoryStack::Annotations => Ok(self.restore_annotations(RestoreDirection::Undo)),
            HistoryStack::Structure => self.restore_structure(RestoreDirection::Undo),
        }
    }

    pub fn redo(&mut self, stack: HistoryStack) -> EditorResult<bool> {
        match stack {
            HistoryStack::Annotations => Ok(self.restore_annotations(RestoreDirection::Redo)),
            HistoryStack::Structure => self.restore_structure(RestoreDirection::Redo),
        }
    }

    fn restore_annotations(&mut self, direction: RestoreDirection) -> bool {
        let popped = match direction {
            RestoreDirection::Undo => self.history.annotations.pop_undo(),
            RestoreDirection::Redo => self.history.annotations.pop_redo(),
        };
        let Some(snapshot) = popped else {
            return false;
        };

        let current =
            AnnotationSnapshot::capture(self.document.pages(), self.document.annotations());
        match direction {
            RestoreDirection::Undo => self.history.annotations.push_redo(current),
            RestoreDirection::Redo => self.history.annotations.push_undo(current),
        }

        let restored = snapshot.restore(self.document.pages(), self.document.annotations());
        self.document.set_annotations(restored);
        self.clear_transient_state();
        tracing::info!(
            ?direction,
            annotations = snapshot.annotation_count(),
            "restored annotations"
        );
        true
    }

    fn restore_structure(&mut self, direction: RestoreDirection) -> EditorResult<bool> {
        match self.begin_structure_restore(direction)? {
            Some(pending) => {
                self.finish_structure_restore(pending)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Pops the next structural snapshot and raises the restoring guard.
    pub fn begin_structure_restore(
        &mut self,
        direction: RestoreDirection,
    ) -> EditorResult<Option<PendingRestore>> {
        if self.is_restoring {
            self.notices.push(Notice::warning("A restore is already in progress"));
            return Err(EditorError::Busy("restoring"));
        }
        let popped = match direction {
            RestoreDirection::Undo => self.history.structure.pop_undo(),
            RestoreDirection::Redo => self.history.structure.pop_redo(),
        };
        Ok(popped.map(|snapshot| {
            self.is_restoring = true;
            PendingRestore { direction, snapshot }
        }))
    }

    /// Re-renders every page of the snapshot and swaps the result in. On
    /// failure the snapshot goes back on its stack and the model is untouched.
    pub fn finish_structure_restore(&mut self, pending: PendingRestore) -> EditorResult<()> {
        let PendingRestore { direction, snapshot } = pending;
        let result = self.rebuild_structure(&snapshot);
        self.is_restoring = false;

        let (pages, annotations) = match result {
            Ok(rebuilt) => rebuilt,
            Err(err) => {
                tracing::warn!(?direction, error = %err, "structural restore failed");
                match direction {
                    RestoreDirection::Undo => self.history.structure.push_undo(snapshot),
                    RestoreDirection::Redo => self.history.structure.push_redo(snapshot),
                }
                self.notices.push(Notice::error(format!("Could not restore pages: {err}")));
                return Err(err);
            }
        };

        let current =
            StructuralSnapshot::capture(self.document.pages(), self.document.annotations());
        match direction {
            RestoreDirection::Undo => self.history.structure.push_redo(current),
            RestoreDirection::Redo => self.history.structure.push_undo(current),
        }

        self.document.replace_structure(pages, annotations);
        if let Some(extract) = &mut self.extract_selection {
            let live: HashSet<PageId> = self.document.pages().iter().map(|page| page.id).collect();
            extract.retain(|id| live.contains(id));
        }
        if self.selected_page().is_none() {
            self.viewed_page = self.document.pages().first().map(|page| page.id);
        }
        self.clear_transient_state();
        tracing::info!(?direction, pages = snapshot.page_count(), "restored page structure");
        Ok(())
    }

    /// Builds the page list and annotation map a structural snapshot describes.
    ///
    /// Pages still alive keep their current annotations, turned to follow
    /// any rotation difference; pages that no longer exist come back with
    /// the annotations they had when captured.
    fn rebuild_structure(
        &self,
        snapshot: &StructuralSnapshot,
    ) -> EditorResult<(Vec<PageEntry>, AnnotationMap)> {
        let rasterizer = PageRasterizer { engine: self.engine.as_ref(), config: &self.config };
        let mut pages = Vec::with_capacity(snapshot.page_count());
        let mut lists = Vec::with_capacity(snapshot.page_count());

        for (descriptor, captured) in snapshot.pages.iter().zip(&snapshot.annotations) {
            let source = self.document.source(descriptor.source_id)?;
            let entry = rasterizer.entry_with_id(
                descriptor.page_id,
                source,
                descriptor.source_page_index,
                descriptor.rotation,
            )?;

            let annotations = match self.document.position_of(descriptor.page_id) {
                Some(position) => {
                    let live = self.document.page(position)?;
                    let mut list = self.document.annotations().page(position).to_vec();
                    let turns = quarter_turns(live.rotation, descriptor.rotation);
                    let (width, height) = live.raster_size();
                    let frame = (width as f32, height as f32);
                    rotate_annotations(&mut list, turns, frame, &self.metrics);
                    list
                }
                None => captured.clone(),
            };

            pages.push(entry);
            lists.push(annotations);
        }

        Ok((pages, AnnotationMap::from_lists(lists)))
    }

    // ---------------------------------------------------------------
    // Selection and rendering
    // ---------------------------------------------------------------

    pub(crate) fn set_selection(&mut self, selection: Option<Selection>) {
        self.selected = selection.and_then(|selection| {
            self.document
                .annotations()
                .get(selection)
                .map(|annotation| SelectedAnnotation { selection, id: annotation.id })
        });
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Re-finds the selected annotation by id after page positions changed.
    pub(crate) fn revalidate_selection(&mut self) {
        if let Some(selected) = self.selected {
            self.selected = self
                .document
                .annotations()
                .find(selected.id)
                .map(|selection| SelectedAnnotation { selection, id: selected.id });
        }
    }

    pub(crate) fn clear_transient_state(&mut self) {
        self.selected = None;
        self.interaction = InteractionState::Idle;
    }

    pub fn hit_test(&self, page_index: usize, point: Point) -> Option<Selection> {
        renderer::hit_test(self.document.annotations().page(page_index), point, &self.metrics)
            .map(|annotation_index| Selection::new(page_index, annotation_index))
    }

    pub(crate) fn render_context(&self) -> RenderContext<'_> {
        RenderContext { metrics: &self.metrics, images: &self.images, config: &self.config }
    }

    fn overlay_for(&self, page_index: usize) -> Option<Overlay> {
        match &self.interaction {
            InteractionState::Drawing { page_index: page, origin, current }
                if *page == page_index =>
            {
                Some(Overlay::WhiteoutDraft(Rect::from_corners(*origin, *current)))
            }
            InteractionState::PlacingSignature { pending, hover: Some((page, point)) }
                if *page == page_index =>
            {
                let rect = self.signature_rect(page_index, *point, pending.aspect_ratio).ok()?;
                Some(Overlay::SignatureGhost { rect, image: pending.image })
            }
            _ => None,
        }
    }

    /// Repaints one page onto `surface`: pristine raster, annotations in
    /// order, selection chrome and any in-progress overlay.
    pub fn redraw_page(&self, page_index: usize, surface: &mut dyn Surface) -> EditorResult<()> {
        let page = self.document.page(page_index)?;
        let selected = self
            .selection()
            .filter(|selection| selection.page_index == page_index)
            .map(|selection| selection.annotation_index);
        let overlay = self.overlay_for(page_index);
        renderer::redraw_page(
            surface,
            &page.raster,
            self.document.annotations().page(page_index),
            selected,
            overlay.as_ref(),
            &self.render_context(),
        );
        Ok(())
    }

    /// The page raster with every annotation painted on it.
    pub fn composite_page(&self, page_index: usize) -> EditorResult<RgbaImage> {
        let page = self.document.page(page_index)?;
        let mut surface = RasterSurface::from_image(page.raster.as_ref().clone());
        if let Some(font) = &self.glyph_font {
            surface = surface.with_font(font.clone());
        }
        self.redraw_page(page_index, &mut surface)?;
        Ok(surface.into_image())
    }

    /// Raster pixels per displayed document unit for a page.
    pub fn page_scale(&self, page_index: usize) -> EditorResult<f32> {
        let page = self.document.page(page_index)?;
        let (raster_width, _) = page.raster_size();
        let (display_width, _) = page.displayed_size();
        Ok(raster_width as f32 / display_width.max(f32::EPSILON))
    }

    /// Adds an annotation to a page as one undoable edit and selects it.
    pub fn add_annotation(
        &mut self,
        page_index: usize,
        annotation: Annotation,
    ) -> EditorResult<Selection> {
        self.document.page(page_index)?;
        self.push_annotation_snapshot();
        let selection = self.document.annotations_mut().push(page_index, annotation).ok_or(
            EditorError::PageOutOfRange { index: page_index, page_count: self.page_count() },
        )?;
        self.set_selection(Some(selection));
        Ok(selection)
    }
}

fn default_zoom_index(steps: &[f32]) -> usize {
    steps
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - 1.0).abs().total_cmp(&(*b - 1.0).abs()))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

/// Clockwise quarter turns that take rotation `from` to rotation `to`.
fn read_glyph_font(path: &Path) -> Option<FontArc> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "glyph font unreadable");
            return None;
        }
    };
    let font = RasterSurface::load_font(bytes);
    if font.is_none() {
        tracing::warn!(path = %path.display(), "glyph font could not be parsed");
    }
    font
}

pub(crate) fn quarter_turns(from: u16, to: u16) -> u8 {
    ((to as i32 - from as i32).rem_euclid(360) / 90) as u8
}

/// Turns annotations clockwise within a `width x height` frame, one quarter
/// at a time, swapping the frame after each turn.
pub(crate) fn rotate_annotations(
    annotations: &mut [Annotation],
    turns: u8,
    frame: (f32, f32),
    metrics: &dyn crate::fonts::FontMetrics,
) {
    let (mut width, mut height) = frame;
    for _ in 0..turns {
        for annotation in annotations.iter_mut() {
            annotation.rotate_quarter_clockwise(width, height, metrics);
        }
        std::mem::swap(&mut width, &mut height);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::annotation::{
        AnnotationKind, Color, SignatureAnnotation, SignatureRole, TextAnnotation,
    };
    use crate::images::tests::png_bytes;
    use crate::surface::tests::{glyph_font_bytes, ink_center};

    pub(crate) fn pdf_file(name: &str, pages: usize) -> IncomingFile {
        let sizes = vec![(200.0, 300.0); pages];
        IncomingFile::new(name, pdf_engine::blank_pdf(&sizes).expect("fixture should build"))
    }

    pub(crate) fn session_with_pages(pages: usize) -> EditorSession {
        let config = EditorConfig { render_scale: 1.0, ..EditorConfig::default() };
        let mut session = EditorSession::new(config);
        session.add_files(vec![pdf_file("doc.pdf", pages)]).expect("ingest should succeed");
        session.drain_notices();
        session
    }

    #[test]
    fn ingest_appends_pages_and_views_the_first() {
        let mut session = EditorSession::default();
        let report = session
            .add_files(vec![
                pdf_file("a.pdf", 2),
                IncomingFile::new("notes.txt", b"hello".to_vec()),
                IncomingFile::new("photo.png", png_bytes(20, 10)),
            ])
            .expect("ingest should succeed");

        assert_eq!(report.pages_added, 3);
        assert_eq!(report.files_failed, vec!["notes.txt".to_owned()]);
        assert_eq!(session.page_count(), 3);
        assert_eq!(session.selected_page(), Some(0));
        assert!(session.document().pages()[2].is_single_image_page);
        assert!(session.document().is_consistent());
        assert!(!session.is_loading_files());

        let notices = session.drain_notices();
        assert!(notices.iter().any(|notice| notice.message.contains("notes.txt")));
    }

    #[test]
    fn overlapping_ingest_is_rejected() {
        let mut session = EditorSession::default();
        let pending = session.begin_loading(0, vec![pdf_file("a.pdf", 1)]).expect("first batch");

        let second = session.begin_loading(0, vec![pdf_file("b.pdf", 1)]);
        assert!(matches!(second, Err(EditorError::Busy(_))));
        assert!(session.is_loading_files());

        session.finish_loading(pending);
        assert!(!session.is_loading_files());
        assert_eq!(session.page_count(), 1);
    }

    #[test]
    fn insert_files_shifts_existing_annotations() {
        let mut session = session_with_pages(2);
        session
            .add_annotation(1, Annotation::whiteout(Rect::new(1.0, 1.0, 10.0, 10.0)))
            .expect("add should succeed");

        session.insert_files_at(1, vec![pdf_file("b.pdf", 2)]).expect("insert should succeed");

        assert_eq!(session.page_count(), 4);
        assert!(session.annotations(1).is_empty());
        assert!(session.annotations(2).is_empty());
        assert_eq!(session.annotations(3).len(), 1);
        assert_eq!(session.selection(), Some(Selection::new(3, 0)));
    }

    #[test]
    fn whiteout_undo_redo_scenario() {
        let mut session = session_with_pages(3);
        let rect = Rect::new(10.0, 10.0, 50.0, 20.0);
        session.add_annotation(1, Annotation::whiteout(rect)).expect("add should succeed");
        let added = session.annotations(1).to_vec();

        assert!(session.undo(HistoryStack::Annotations).expect("undo should run"));
        assert!(session.annotations(1).is_empty());
        assert_eq!(session.selection(), None);

        assert!(session.redo(HistoryStack::Annotations).expect("redo should run"));
        assert_eq!(session.annotations(1), added.as_slice());
        assert!(!session.redo(HistoryStack::Annotations).expect("empty redo is not an error"));
    }

    #[test]
    fn signature_survives_undo_redo_by_image_id() {
        let mut session = session_with_pages(1);
        let image = session.images.register(&png_bytes(40, 20)).expect("image should decode");
        session
            .add_annotation(
                0,
                Annotation::signature(SignatureAnnotation {
                    rect: Rect::new(5.0, 5.0, 40.0, 20.0),
                    image,
                    locked: false,
                    role: SignatureRole::Signature,
                }),
            )
            .expect("add should succeed");
        let before = session.annotations(0).to_vec();

        session.undo(HistoryStack::Annotations).expect("undo should run");
        session.redo(HistoryStack::Annotations).expect("redo should run");

        assert_eq!(session.annotations(0), before.as_slice());
        let AnnotationKind::Signature(signature) = &session.annotations(0)[0].kind else {
            panic!("expected a signature");
        };
        assert!(session.images().get(signature.image).is_some());
    }

    #[test]
    fn structural_undo_restores_page_order_and_redo_reapplies() {
        let mut session = session_with_pages(3);
        let original: Vec<PageId> = session.document().pages().iter().map(|p| p.id).collect();
        session.move_page(0, 2).expect("move should succeed");
        let moved: Vec<PageId> = session.document().pages().iter().map(|p| p.id).collect();

        assert!(session.undo(HistoryStack::Structure).expect("undo should run"));
        let restored: Vec<PageId> = session.document().pages().iter().map(|p| p.id).collect();
        assert_eq!(restored, original);
        assert!(!session.is_restoring());

        assert!(session.redo(HistoryStack::Structure).expect("redo should run"));
        let redone: Vec<PageId> = session.document().pages().iter().map(|p| p.id).collect();
        assert_eq!(redone, moved);
    }

    #[test]
    fn second_structural_restore_while_pending_is_rejected() {
        let mut session = session_with_pages(2);
        session.move_page(0, 1).expect("move should succeed");
        session.move_page(0, 1).expect("move should succeed");

        let pending = session
            .begin_structure_restore(RestoreDirection::Undo)
            .expect("first restore should start")
            .expect("a snapshot should exist");
        assert!(session.is_restoring());
        assert!(matches!(session.undo(HistoryStack::Structure), Err(EditorError::Busy(_))));

        session.finish_structure_restore(pending).expect("restore should finish");
        assert!(!session.is_restoring());
        assert_eq!(session.history().structure.undo_count(), 1);
    }

    #[test]
    fn failed_restore_keeps_state_and_snapshot() {
        let mut session = session_with_pages(2);
        session.move_page(0, 1).expect("move should succeed");
        let pending = session
            .begin_structure_restore(RestoreDirection::Undo)
            .expect("restore should start")
            .expect("a snapshot should exist");
        let order: Vec<PageId> = session.document().pages().iter().map(|p| p.id).collect();

        // Dropping the sources makes every descriptor unresolvable.
        let pages = session.document.pages().to_vec();
        let annotations = session.document.annotations().clone();
        session.document.clear();
        session.document.replace_structure(pages, annotations);

        let result = session.finish_structure_restore(pending);
        assert!(matches!(result, Err(EditorError::MissingSource(_))));
        assert!(!session.is_restoring());
        assert!(session.can_undo(HistoryStack::Structure));
        let after: Vec<PageId> = session.document().pages().iter().map(|p| p.id).collect();
        assert_eq!(after, order);
        assert!(!session.drain_notices().is_empty());
    }

    #[test]
    fn undoing_rotation_turns_annotations_back() {
        let mut session = session_with_pages(1);
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
        session.add_annotation(0, Annotation::whiteout(rect)).expect("add should succeed");

        session.rotate_page(0, 90).expect("rotate should succeed");
        assert_ne!(session.annotations(0)[0].anchor(), Point::new(10.0, 20.0));

        session.undo(HistoryStack::Structure).expect("undo should run");
        let AnnotationKind::Whiteout(whiteout) = &session.annotations(0)[0].kind else {
            panic!("expected a whiteout");
        };
        assert!((whiteout.rect.x - rect.x).abs() < 1e-3);
        assert!((whiteout.rect.y - rect.y).abs() < 1e-3);
        assert!((whiteout.rect.width - rect.width).abs() < 1e-3);
        assert_eq!(session.document().pages()[0].rotation, 0);
    }

    #[test]
    fn zoom_steps_clamp_at_both_ends() {
        let mut session = EditorSession::default();
        assert_eq!(session.zoom(), 1.0);
        for _ in 0..20 {
            session.zoom_in();
        }
        assert_eq!(session.zoom(), 3.0);
        for _ in 0..20 {
            session.zoom_out();
        }
        assert_eq!(session.zoom(), 0.5);
    }

    #[test]
    fn reset_drops_everything() {
        let mut session = session_with_pages(2);
        session
            .add_annotation(0, Annotation::whiteout(Rect::new(0.0, 0.0, 10.0, 10.0)))
            .expect("add should succeed");

        session.reset();
        assert_eq!(session.page_count(), 0);
        assert!(!session.can_undo(HistoryStack::Annotations));
        assert!(!session.can_undo(HistoryStack::Structure));
        assert_eq!(session.selected_page(), None);
    }

    #[test]
    fn composite_page_paints_whiteouts() {
        let mut session = session_with_pages(1);
        session
            .add_annotation(0, Annotation::whiteout(Rect::new(0.0, 0.0, 10.0, 10.0)))
            .expect("add should succeed");
        session.clear_selection();

        let bare = session.document().page(0).expect("page should exist").raster.clone();
        assert_ne!(bare.get_pixel(0, 0).0, [255, 255, 255, 255]);
        let image = session.composite_page(0).expect("composite should render");
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(image.get_pixel(12, 0).0, bare.get_pixel(12, 0).0);
    }

    fn add_letter_o(session: &mut EditorSession) {
        session
            .add_annotation(
                0,
                Annotation::text(TextAnnotation {
                    x: 20.0,
                    y: 100.0,
                    text: "o".to_owned(),
                    font_size: 60.0,
                    font_family: "Courier".to_owned(),
                    bold: false,
                    italic: false,
                    color: Color::BLACK,
                }),
            )
            .expect("add should succeed");
        session.clear_selection();
    }

    #[test]
    fn composite_page_draws_text_with_the_glyph_font() {
        let mut plain = session_with_pages(1);
        add_letter_o(&mut plain);
        let mut outlined = session_with_pages(1);
        outlined.set_glyph_font(glyph_font_bytes()).expect("fixture font should load");
        add_letter_o(&mut outlined);

        let boxed = plain.composite_page(0).expect("composite should render");
        let (x, y) = ink_center(&boxed);
        assert_eq!(boxed.get_pixel(x, y).0, [0, 0, 0, 255]);

        let glyphs = outlined.composite_page(0).expect("composite should render");
        let (x, y) = ink_center(&glyphs);
        assert_eq!(glyphs.get_pixel(x, y).0, [255, 255, 255, 255]);
    }

    #[test]
    fn glyph_font_loads_from_config_path() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("mono.ttf");
        std::fs::write(&path, glyph_font_bytes()).expect("font should be written");

        let config = EditorConfig { glyph_font: Some(path), ..EditorConfig::default() };
        assert!(EditorSession::new(config).has_glyph_font());

        let missing = EditorConfig {
            glyph_font: Some(temp.path().join("missing.ttf")),
            ..EditorConfig::default()
        };
        assert!(!EditorSession::new(missing).has_glyph_font());
    }

    #[test]
    fn invalid_glyph_font_is_rejected() {
        let mut session = session_with_pages(1);
        assert!(session.set_glyph_font(b"garbage".to_vec()).is_err());
        assert!(!session.has_glyph_font());
    }

    /// Renders nothing and refuses to close, counting close attempts.
    struct BrokenRenderEngine {
        inner: LopdfEngine,
        close_attempts: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl PdfEngine for BrokenRenderEngine {
        fn open(
            &mut self,
            source: pdf_engine::OpenSource,
        ) -> Result<pdf_engine::DocumentHandle, pdf_engine::PdfEngineError> {
            self.inner.open(source)
        }

        fn page_count(
            &self,
            handle: pdf_engine::DocumentHandle,
        ) -> Result<u32, pdf_engine::PdfEngineError> {
            self.inner.page_count(handle)
        }

        fn page_size(
            &self,
            handle: pdf_engine::DocumentHandle,
            page_index: u32,
        ) -> Result<pdf_engine::PageSize, pdf_engine::PdfEngineError> {
            self.inner.page_size(handle, page_index)
        }

        fn render_page(
            &self,
            _: pdf_engine::DocumentHandle,
            _: pdf_engine::RenderRequest,
        ) -> Result<RgbaImage, pdf_engine::PdfEngineError> {
            Err(pdf_engine::PdfEngineError::Backend("renderer offline".to_owned()))
        }

        fn render_thumbnail(
            &self,
            _: pdf_engine::DocumentHandle,
            _: u32,
            _: u16,
            _: pdf_engine::ThumbnailSize,
        ) -> Result<RgbaImage, pdf_engine::PdfEngineError> {
            Err(pdf_engine::PdfEngineError::Backend("renderer offline".to_owned()))
        }

        fn close(
            &mut self,
            _: pdf_engine::DocumentHandle,
        ) -> Result<(), pdf_engine::PdfEngineError> {
            self.close_attempts.set(self.close_attempts.get() + 1);
            Err(pdf_engine::PdfEngineError::Backend("close refused".to_owned()))
        }
    }

    #[test]
    fn unrenderable_file_is_closed_and_reported() {
        let close_attempts = std::rc::Rc::new(std::cell::Cell::new(0));
        let engine = BrokenRenderEngine {
            inner: LopdfEngine::new(),
            close_attempts: close_attempts.clone(),
        };
        let mut session = EditorSession::with_engine(EditorConfig::default(), Box::new(engine));

        let report = session.add_files(vec![pdf_file("doc.pdf", 2)]).expect("batch should finish");
        assert_eq!(report.pages_added, 0);
        assert_eq!(report.files_failed, vec!["doc.pdf".to_owned()]);
        assert_eq!(close_attempts.get(), 1);
        assert_eq!(session.page_count(), 0);
    }
}
