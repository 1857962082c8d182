//! Pointer interaction state machine
//!
//! Pointer, touch and double-click input arrive per page surface and drive
//! the selected tool. Touch input additionally feeds a gesture tracker:
//! two fingers form a pinch that zooms in discrete steps and suppresses all
//! single-pointer handling until every finger is lifted.

use crate::annotation::{
    Annotation, AnnotationKind, Color, Selection, SignatureAnnotation, SignatureRole,
    TextAnnotation,
};
use crate::error::{EditorError, EditorResult};
use crate::fonts::FontFamily;
use crate::geometry::{
    to_surface_coords, Corner, Point, PointerEvent, PointerKind, Rect, SurfaceLayout,
};
use crate::history::AnnotationSnapshot;
use crate::images::ImageId;
use crate::manipulation::{resize_handle_at, ResizeLimits, ResizeState};
use crate::notice::Notice;
use crate::session::EditorSession;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    #[default]
    Select,
    Whiteout,
    Text,
    Signature,
    Paraf,
}

/// A decoded signature image waiting for its placement click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSignature {
    pub image: ImageId,
    pub role: SignatureRole,
    pub aspect_ratio: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Drawing {
        page_index: usize,
        origin: Point,
        current: Point,
    },
    Dragging {
        selection: Selection,
        /// Pointer offset from the annotation anchor at grab time.
        grab: Point,
        original: Point,
        before: AnnotationSnapshot,
    },
    Resizing {
        selection: Selection,
        resize: ResizeState,
        before: AnnotationSnapshot,
    },
    PlacingSignature {
        pending: PendingSignature,
        hover: Option<(usize, Point)>,
    },
    EditingText {
        page_index: usize,
        /// Index of the text being edited; `None` while composing a new one.
        target: Option<usize>,
        /// Baseline start of the text.
        anchor: Point,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Crosshair,
    Text,
    Move,
    Copy,
    NotAllowed,
    Resize(Corner),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Redraw {
    #[default]
    None,
    Page(usize),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomStep {
    In,
    Out,
}

/// What the host should do after an input event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Response {
    pub redraw: Redraw,
    pub cursor: Cursor,
    /// Set when a pinch crossed the zoom threshold; the session zoom has
    /// already been updated.
    pub zoom: Option<ZoomStep>,
}

impl Response {
    fn page(page_index: usize) -> Self {
        Self { redraw: Redraw::Page(page_index), ..Self::default() }
    }

    fn all() -> Self {
        Self { redraw: Redraw::All, ..Self::default() }
    }

    fn with_cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = cursor;
        self
    }
}

/// Style changes for new text and for the selected text annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyleUpdate {
    pub font_size: Option<f32>,
    pub font_family: Option<FontFamily>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub color: Option<Color>,
}

/// Tracks touch pointers for pinch zoom and double taps.
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    touches: BTreeMap<u32, Point>,
    pinch_distance: Option<f32>,
    suppressed: bool,
    last_tap: Option<(Point, u64)>,
}

impl GestureTracker {
    /// True from the start of a pinch until the last of its fingers lifts.
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Registers a touch; returns true when it starts a pinch.
    pub fn touch_down(&mut self, event: &PointerEvent) -> bool {
        self.touches.insert(event.pointer_id, event.client_point());
        if self.touches.len() == 2 && self.pinch_distance.is_none() {
            self.pinch_distance = self.current_distance();
            self.suppressed = true;
            self.last_tap = None;
            return true;
        }
        false
    }

    /// Updates a touch; yields a zoom step each time the finger spread moves
    /// more than `threshold` away from the last step.
    pub fn touch_move(&mut self, event: &PointerEvent, threshold: f32) -> Option<ZoomStep> {
        let tracked = self.touches.get_mut(&event.pointer_id)?;
        *tracked = event.client_point();

        let base = self.pinch_distance?;
        let distance = self.current_distance()?;
        let delta = distance - base;
        if delta.abs() <= threshold {
            return None;
        }
        self.pinch_distance = Some(distance);
        Some(if delta > 0.0 { ZoomStep::In } else { ZoomStep::Out })
    }

    /// Releases a touch; returns true when it belonged to a suppressed gesture.
    pub fn touch_up(&mut self, event: &PointerEvent) -> bool {
        self.touches.remove(&event.pointer_id);
        if self.touches.len() < 2 {
            self.pinch_distance = None;
        }
        let suppressed = self.suppressed;
        if self.touches.is_empty() {
            self.suppressed = false;
        }
        suppressed
    }

    /// Returns true when this tap completes a double tap.
    pub fn register_tap(
        &mut self,
        event: &PointerEvent,
        window_ms: u64,
        max_distance: f32,
    ) -> bool {
        let point = event.client_point();
        if let Some((last, at)) = self.last_tap.take() {
            let elapsed = event.timestamp_ms.saturating_sub(at);
            if elapsed <= window_ms && last.distance_to(&point) <= max_distance {
                return true;
            }
        }
        self.last_tap = Some((point, event.timestamp_ms));
        false
    }

    fn current_distance(&self) -> Option<f32> {
        let mut points = self.touches.values();
        let first = points.next()?;
        let second = points.next()?;
        Some(first.distance_to(second))
    }
}

impl EditorSession {
    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    /// Switches tools, abandoning whatever the previous tool was doing.
    pub fn set_tool(&mut self, tool: Tool) -> Response {
        let mut response = self.revert_pointer_interaction();
        if !matches!(self.interaction, InteractionState::Idle) {
            self.interaction = InteractionState::Idle;
            response = Response::all();
        }
        self.tool = tool;
        tracing::debug!(?tool, "tool selected");
        response
    }

    pub fn pointer_down(
        &mut self,
        page_index: usize,
        event: &PointerEvent,
        layout: &SurfaceLayout,
    ) -> EditorResult<Response> {
        self.document.page(page_index)?;
        let point = to_surface_coords(event, layout);

        if event.kind == PointerKind::Touch {
            if self.gestures.touch_down(event) {
                tracing::debug!("pinch started");
                return Ok(self.revert_pointer_interaction());
            }
            if self.gestures.is_suppressed() {
                return Ok(Response::default());
            }
            let window = self.config.double_tap_window_ms;
            let distance = self.config.double_tap_distance;
            if self.gestures.register_tap(event, window, distance) {
                return self.double_click_at(page_index, point);
            }
        }

        self.press(page_index, point)
    }

    pub fn pointer_move(
        &mut self,
        page_index: usize,
        event: &PointerEvent,
        layout: &SurfaceLayout,
    ) -> EditorResult<Response> {
        if event.kind == PointerKind::Touch {
            if let Some(step) = self.gestures.touch_move(event, self.config.pinch_threshold) {
                let zoom = match step {
                    ZoomStep::In => self.zoom_in(),
                    ZoomStep::Out => self.zoom_out(),
                };
                tracing::debug!(?step, zoom, "pinch zoom");
                return Ok(Response { zoom: Some(step), ..Response::default() });
            }
            if self.gestures.is_suppressed() {
                return Ok(Response::default());
            }
        }

        let point = to_surface_coords(event, layout);
        if matches!(self.interaction, InteractionState::Idle) {
            let cursor = self.hover_cursor(page_index, point);
            return Ok(Response::default().with_cursor(cursor));
        }

        let limits = ResizeLimits::from(&self.config);
        let response = match &mut self.interaction {
            InteractionState::Drawing { page_index: page, current, .. } => {
                if *page == page_index {
                    *current = point;
                }
                Response::page(*page).with_cursor(Cursor::Crosshair)
            }
            InteractionState::Dragging { selection, grab, .. } => {
                if selection.page_index == page_index {
                    let target = Point::new(point.x - grab.x, point.y - grab.y);
                    if let Some(annotation) = self.document.annotations_mut().get_mut(*selection) {
                        annotation.set_anchor(target);
                    }
                }
                Response::page(selection.page_index).with_cursor(Cursor::Move)
            }
            InteractionState::Resizing { selection, resize, .. } => {
                if selection.page_index == page_index {
                    let next = resize.resized(point, &limits, &self.metrics);
                    if let Some(annotation) = self.document.annotations_mut().get_mut(*selection) {
                        *annotation = next;
                    }
                }
                Response::page(selection.page_index).with_cursor(Cursor::Resize(resize.corner))
            }
            InteractionState::PlacingSignature { hover, .. } => {
                let previous = hover.replace((page_index, point));
                let response = match previous {
                    Some((old_page, _)) if old_page != page_index => Response::all(),
                    _ => Response::page(page_index),
                };
                response.with_cursor(Cursor::Copy)
            }
            InteractionState::EditingText { .. } => Response::default().with_cursor(Cursor::Text),
            InteractionState::Idle => Response::default(),
        };
        Ok(response)
    }

    pub fn pointer_up(
        &mut self,
        page_index: usize,
        event: &PointerEvent,
        layout: &SurfaceLayout,
    ) -> EditorResult<Response> {
        if event.kind == PointerKind::Touch && self.gestures.touch_up(event) {
            return Ok(Response::default());
        }
        let point = to_surface_coords(event, layout);

        match std::mem::take(&mut self.interaction) {
            InteractionState::Drawing { page_index: page, origin, current } => {
                let end = if page == page_index { point } else { current };
                let rect = Rect::from_corners(origin, end);
                let min = self.config.min_whiteout_size;
                if rect.width < min || rect.height < min {
                    tracing::debug!(width = rect.width, height = rect.height, "whiteout too small");
                    return Ok(Response::page(page));
                }
                self.add_annotation(page, Annotation::whiteout(rect))?;
                tracing::info!(page, "whiteout added");
                Ok(Response::page(page))
            }
            InteractionState::Dragging { selection, original, before, .. } => {
                let moved = self
                    .document
                    .annotations()
                    .get(selection)
                    .is_some_and(|annotation| annotation.anchor() != original);
                if moved {
                    self.history.annotations.push(before);
                    tracing::info!(page = selection.page_index, "annotation moved");
                }
                Ok(Response::page(selection.page_index))
            }
            InteractionState::Resizing { selection, resize, before } => {
                let changed = self
                    .document
                    .annotations()
                    .get(selection)
                    .is_some_and(|annotation| *annotation != resize.original);
                if changed {
                    self.history.annotations.push(before);
                    tracing::info!(page = selection.page_index, "annotation resized");
                }
                Ok(Response::page(selection.page_index))
            }
            other => {
                self.interaction = other;
                Ok(Response::default())
            }
        }
    }

    /// A pointer stream was interrupted by the platform.
    pub fn pointer_cancel(&mut self, event: &PointerEvent) -> Response {
        if event.kind == PointerKind::Touch {
            self.gestures.touch_up(event);
        }
        self.revert_pointer_interaction()
    }

    pub fn double_click(
        &mut self,
        page_index: usize,
        event: &PointerEvent,
        layout: &SurfaceLayout,
    ) -> EditorResult<Response> {
        self.document.page(page_index)?;
        self.double_click_at(page_index, to_surface_coords(event, layout))
    }

    /// Locked signatures unlock; unlocked text enters the inline editor.
    pub fn double_click_at(&mut self, page_index: usize, point: Point) -> EditorResult<Response> {
        let Some(selection) = self.hit_test(page_index, point) else {
            return Ok(Response::default());
        };
        let Some(annotation) = self.document.annotations().get(selection) else {
            return Ok(Response::default());
        };

        match &annotation.kind {
            AnnotationKind::Signature(signature) if signature.locked => {
                let id = annotation.id;
                self.push_annotation_snapshot();
                if let Some(AnnotationKind::Signature(signature)) = self
                    .document
                    .annotations_mut()
                    .get_mut(selection)
                    .map(|annotation| &mut annotation.kind)
                {
                    signature.locked = false;
                }
                self.locked_notified.remove(&id);
                self.set_selection(Some(selection));
                self.interaction = InteractionState::Idle;
                self.notices.push(Notice::info("Signature unlocked"));
                tracing::info!(page = page_index, "signature unlocked");
                Ok(Response::page(page_index))
            }
            AnnotationKind::Text(_) if !annotation.is_locked() => {
                Ok(self.begin_text_edit(selection))
            }
            _ => Ok(Response::default()),
        }
    }

    fn press(&mut self, page_index: usize, point: Point) -> EditorResult<Response> {
        if let InteractionState::PlacingSignature { pending, .. } = &self.interaction {
            let pending = *pending;
            return self.place_signature(page_index, point, pending);
        }
        if matches!(self.interaction, InteractionState::EditingText { .. }) {
            tracing::debug!("pointer down abandoned text edit");
            self.interaction = InteractionState::Idle;
        }

        match self.tool {
            Tool::Whiteout => {
                self.clear_selection();
                self.interaction =
                    InteractionState::Drawing { page_index, origin: point, current: point };
                Ok(Response::page(page_index).with_cursor(Cursor::Crosshair))
            }
            Tool::Text => {
                let existing = self.hit_test(page_index, point).filter(|selection| {
                    self.document.annotations().get(*selection).is_some_and(|annotation| {
                        matches!(annotation.kind, AnnotationKind::Text(_))
                            && !annotation.is_locked()
                    })
                });
                match existing {
                    Some(selection) => Ok(self.begin_text_edit(selection)),
                    None => {
                        self.clear_selection();
                        let size = self.config.clamp_font_size(self.text_style.font_size);
                        self.interaction = InteractionState::EditingText {
                            page_index,
                            target: None,
                            anchor: Point::new(point.x, point.y + size),
                        };
                        Ok(Response::page(page_index).with_cursor(Cursor::Text))
                    }
                }
            }
            Tool::Select | Tool::Signature | Tool::Paraf => self.press_select(page_index, point),
        }
    }

    fn press_select(&mut self, page_index: usize, point: Point) -> EditorResult<Response> {
        if let Some(selection) =
            self.selection().filter(|selection| selection.page_index == page_index)
        {
            let handle = self.document.annotations().get(selection).and_then(|annotation| {
                resize_handle_at(annotation, point, &self.metrics, self.config.handle_tolerance)
                    .map(|corner| ResizeState::new(annotation, corner, point, &self.metrics))
            });
            if let Some(resize) = handle {
                let corner = resize.corner;
                let before = self.capture_annotations();
                self.interaction = InteractionState::Resizing { selection, resize, before };
                tracing::debug!(?corner, "resize started");
                return Ok(Response::page(page_index).with_cursor(Cursor::Resize(corner)));
            }
        }

        let Some(selection) = self.hit_test(page_index, point) else {
            self.clear_selection();
            self.interaction = InteractionState::Idle;
            return Ok(Response::page(page_index));
        };
        let Some(annotation) = self.document.annotations().get(selection) else {
            return Err(EditorError::MissingAnnotation {
                page_index,
                annotation_index: selection.annotation_index,
            });
        };
        let (id, locked, anchor) = (annotation.id, annotation.is_locked(), annotation.anchor());
        self.set_selection(Some(selection));

        if locked {
            if self.locked_notified.insert(id) {
                self.notices
                    .push(Notice::info("This signature is locked. Double-click to unlock it."));
            }
            self.interaction = InteractionState::Idle;
            return Ok(Response::page(page_index).with_cursor(Cursor::NotAllowed));
        }

        let before = self.capture_annotations();
        self.interaction = InteractionState::Dragging {
            selection,
            grab: Point::new(point.x - anchor.x, point.y - anchor.y),
            original: anchor,
            before,
        };
        Ok(Response::page(page_index).with_cursor(Cursor::Move))
    }

    fn hover_cursor(&self, page_index: usize, point: Point) -> Cursor {
        match self.tool {
            Tool::Whiteout => return Cursor::Crosshair,
            Tool::Text => return Cursor::Text,
            Tool::Select | Tool::Signature | Tool::Paraf => {}
        }
        let handle = self
            .selection()
            .filter(|selection| selection.page_index == page_index)
            .and_then(|selection| self.document.annotations().get(selection))
            .and_then(|annotation| {
                resize_handle_at(annotation, point, &self.metrics, self.config.handle_tolerance)
            });
        if let Some(corner) = handle {
            return Cursor::Resize(corner);
        }
        match self.hit_test(page_index, point).and_then(|s| self.document.annotations().get(s)) {
            Some(annotation) if annotation.is_locked() => Cursor::NotAllowed,
            Some(_) => Cursor::Move,
            None => Cursor::Default,
        }
    }

    fn capture_annotations(&self) -> AnnotationSnapshot {
        AnnotationSnapshot::capture(self.document.pages(), self.document.annotations())
    }

    /// Abandons a drag, resize or draft, putting moved annotations back.
    pub(crate) fn revert_pointer_interaction(&mut self) -> Response {
        match std::mem::take(&mut self.interaction) {
            InteractionState::Dragging { before, .. }
            | InteractionState::Resizing { before, .. } => {
                let restored = before.restore(self.document.pages(), self.document.annotations());
                self.document.set_annotations(restored);
                tracing::debug!("pointer interaction reverted");
                Response::all()
            }
            InteractionState::Drawing { page_index, .. } => Response::page(page_index),
            other => {
                self.interaction = other;
                Response::default()
            }
        }
    }

    // ---------------------------------------------------------------
    // Text editing
    // ---------------------------------------------------------------

    fn begin_text_edit(&mut self, selection: Selection) -> Response {
        let anchor = self
            .document
            .annotations()
            .get(selection)
            .map(|annotation| annotation.anchor())
            .unwrap_or_default();
        self.set_selection(Some(selection));
        self.interaction = InteractionState::EditingText {
            page_index: selection.page_index,
            target: Some(selection.annotation_index),
            anchor,
        };
        tracing::debug!(page = selection.page_index, "text edit started");
        Response::page(selection.page_index).with_cursor(Cursor::Text)
    }

    /// The text annotation being edited, if the editor targets an existing one.
    pub fn text_edit_target(&self) -> Option<&TextAnnotation> {
        let InteractionState::EditingText { page_index, target: Some(index), .. } =
            &self.interaction
        else {
            return None;
        };
        match &self.document.annotations().get(Selection::new(*page_index, *index))?.kind {
            AnnotationKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Commits the inline editor. Blank text deletes an edited annotation and
    /// discards a new one.
    pub fn confirm_text(&mut self, text: &str) -> EditorResult<Option<Selection>> {
        let InteractionState::EditingText { page_index, target, anchor } = self.interaction else {
            return Err(EditorError::InvalidOperation("no text edit in progress".to_owned()));
        };
        self.interaction = InteractionState::Idle;
        let blank = text.trim().is_empty();

        let Some(index) = target else {
            if blank {
                return Ok(None);
            }
            let style = self.text_style.clone();
            let annotation = Annotation::text(TextAnnotation {
                x: anchor.x,
                y: anchor.y,
                text: text.to_owned(),
                font_size: self.config.clamp_font_size(style.font_size),
                font_family: style.font_family.name().to_owned(),
                bold: style.bold,
                italic: style.italic,
                color: style.color,
            });
            let selection = self.add_annotation(page_index, annotation)?;
            tracing::info!(page = page_index, "text added");
            return Ok(Some(selection));
        };

        let selection = Selection::new(page_index, index);
        let current = match self.document.annotations().get(selection).map(|a| &a.kind) {
            Some(AnnotationKind::Text(existing)) => existing.text.clone(),
            _ => {
                return Err(EditorError::MissingAnnotation { page_index, annotation_index: index })
            }
        };

        if blank {
            self.push_annotation_snapshot();
            self.document.annotations_mut().remove(selection);
            self.clear_selection();
            tracing::info!(page = page_index, "empty text removed");
            return Ok(None);
        }
        if current != text {
            self.push_annotation_snapshot();
            if let Some(AnnotationKind::Text(existing)) =
                self.document.annotations_mut().get_mut(selection).map(|a| &mut a.kind)
            {
                existing.text = text.to_owned();
            }
        }
        self.set_selection(Some(selection));
        Ok(Some(selection))
    }

    pub fn cancel_text_edit(&mut self) {
        if matches!(self.interaction, InteractionState::EditingText { .. }) {
            self.interaction = InteractionState::Idle;
        }
    }

    /// Updates the style for new text and applies it to the selected text.
    pub fn set_text_style(&mut self, update: TextStyleUpdate) -> EditorResult<()> {
        let font_size = update.font_size.map(|size| self.config.clamp_font_size(size));
        if let Some(size) = font_size {
            self.text_style.font_size = size;
        }
        if let Some(family) = update.font_family {
            self.text_style.font_family = family;
        }
        if let Some(bold) = update.bold {
            self.text_style.bold = bold;
        }
        if let Some(italic) = update.italic {
            self.text_style.italic = italic;
        }
        if let Some(color) = update.color {
            self.text_style.color = color;
        }

        let Some(selection) = self.selection() else {
            return Ok(());
        };
        let Some(AnnotationKind::Text(text)) =
            self.document.annotations().get(selection).map(|a| &a.kind)
        else {
            return Ok(());
        };

        let mut next = text.clone();
        if let Some(size) = font_size {
            next.font_size = size;
        }
        if let Some(family) = update.font_family {
            next.font_family = family.name().to_owned();
        }
        next.bold = update.bold.unwrap_or(next.bold);
        next.italic = update.italic.unwrap_or(next.italic);
        next.color = update.color.unwrap_or(next.color);
        if next == *text {
            return Ok(());
        }

        self.push_annotation_snapshot();
        if let Some(annotation) = self.document.annotations_mut().get_mut(selection) {
            annotation.kind = AnnotationKind::Text(next);
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Selected annotation
    // ---------------------------------------------------------------

    pub fn delete_selected(&mut self) -> EditorResult<Annotation> {
        let selection = self
            .selection()
            .ok_or_else(|| EditorError::InvalidOperation("nothing is selected".to_owned()))?;
        self.push_annotation_snapshot();
        let removed = self.document.annotations_mut().remove(selection).ok_or(
            EditorError::MissingAnnotation {
                page_index: selection.page_index,
                annotation_index: selection.annotation_index,
            },
        )?;
        self.clear_selection();
        self.interaction = InteractionState::Idle;
        self.notices.push(Notice::info(format!("Deleted {}", removed.kind_name())));
        tracing::info!(
            page = selection.page_index,
            kind = removed.kind_name(),
            "annotation deleted"
        );
        Ok(removed)
    }

    /// Locks or unlocks the selected signature.
    pub fn set_selected_locked(&mut self, locked: bool) -> EditorResult<()> {
        let selection = self
            .selection()
            .ok_or_else(|| EditorError::InvalidOperation("nothing is selected".to_owned()))?;
        let current = match self.document.annotations().get(selection).map(|a| &a.kind) {
            Some(AnnotationKind::Signature(signature)) => signature.locked,
            Some(_) => {
                return Err(EditorError::InvalidOperation(
                    "only signatures can be locked".to_owned(),
                ))
            }
            None => {
                return Err(EditorError::MissingAnnotation {
                    page_index: selection.page_index,
                    annotation_index: selection.annotation_index,
                })
            }
        };
        if current == locked {
            return Ok(());
        }

        self.push_annotation_snapshot();
        if let Some(annotation) = self.document.annotations_mut().get_mut(selection) {
            if let AnnotationKind::Signature(signature) = &mut annotation.kind {
                signature.locked = locked;
            }
            if !locked {
                let id = annotation.id;
                self.locked_notified.remove(&id);
            }
        }
        let message = if locked { "Signature locked" } else { "Signature unlocked" };
        self.notices.push(Notice::info(message));
        Ok(())
    }

    pub fn toggle_lock_selected(&mut self) -> EditorResult<bool> {
        let locked = self.selected_annotation().is_some_and(Annotation::is_locked);
        self.set_selected_locked(!locked)?;
        Ok(!locked)
    }

    // ---------------------------------------------------------------
    // Signature placement
    // ---------------------------------------------------------------

    /// Decodes a signature image and waits for the placement click.
    pub fn begin_signature_placement(
        &mut self,
        bytes: &[u8],
        role: SignatureRole,
    ) -> EditorResult<ImageId> {
        let image = match self.images.register(bytes) {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!(error = %err, "signature image rejected");
                self.notices.push(Notice::error("Could not read the signature image"));
                return Err(err);
            }
        };
        let aspect_ratio = self.images.require(image)?.aspect_ratio();

        self.revert_pointer_interaction();
        self.tool = match role {
            SignatureRole::Signature => Tool::Signature,
            SignatureRole::Paraf => Tool::Paraf,
        };
        self.interaction = InteractionState::PlacingSignature {
            pending: PendingSignature { image, role, aspect_ratio },
            hover: None,
        };
        self.notices.push(Notice::info("Click on a page to place the signature"));
        Ok(image)
    }

    pub fn cancel_signature_placement(&mut self) -> Response {
        if matches!(self.interaction, InteractionState::PlacingSignature { .. }) {
            self.interaction = InteractionState::Idle;
            return Response::all();
        }
        Response::default()
    }

    /// Rectangle of a signature centered on `center`, sized relative to the
    /// page raster.
    pub(crate) fn signature_rect(
        &self,
        page_index: usize,
        center: Point,
        aspect_ratio: f32,
    ) -> EditorResult<Rect> {
        let (raster_width, _) = self.document.page(page_index)?.raster_size();
        let width = (raster_width as f32 * self.config.signature_width_ratio)
            .max(self.config.min_signature_width);
        let height = width / aspect_ratio.max(f32::EPSILON);
        Ok(Rect::new(center.x - width / 2.0, center.y - height / 2.0, width, height))
    }

    pub(crate) fn place_signature(
        &mut self,
        page_index: usize,
        point: Point,
        pending: PendingSignature,
    ) -> EditorResult<Response> {
        let rect = self.signature_rect(page_index, point, pending.aspect_ratio)?;
        self.interaction = InteractionState::Idle;

        match pending.role {
            SignatureRole::Signature => {
                self.add_annotation(
                    page_index,
                    Annotation::signature(SignatureAnnotation {
                        rect,
                        image: pending.image,
                        locked: false,
                        role: SignatureRole::Signature,
                    }),
                )?;
                self.notices.push(Notice::success("Signature placed"));
                tracing::info!(page = page_index, "signature placed");
                Ok(Response::page(page_index))
            }
            SignatureRole::Paraf => {
                let count = self.propagate_paraf(page_index, rect, pending.image)?;
                self.notices.push(Notice::success(format!("Paraf placed on {count} page(s)")));
                Ok(Response::all())
            }
        }
    }
}
